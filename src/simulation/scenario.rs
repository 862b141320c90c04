//! Initial conditions.
//!
//! Each rank seeds its own slice of the system from a rank-derived RNG
//! stream, so a run is reproducible for a given base seed and process
//! count. Ranks mirror their coordinates so the four spatial quadrants of
//! the root region start populated, and rank 0 anchors the system with a
//! central massive object in place of its first random body.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::configuration::config::SimConfig;
use crate::simulation::body::{Body, NVec2};

/// Mass of every randomly placed body.
pub const BODY_MASS: f64 = 6.4e21;
/// Mass of the central anchor on rank 0.
pub const CENTRAL_MASS: f64 = 6.4e26;

const BODY_COLOR: [u8; 3] = [255, 255, 0];
const CENTRAL_COLOR: [u8; 3] = [255, 0, 0];

/// Generate the `n / size` bodies owned by `rank`.
///
/// Positions are uniform in [0, radius] per axis; velocities are a product
/// of three uniform draws scaled by -0.1 * radius, giving a mild inward
/// drift. Even ranks negate x (and vx), ranks in the upper half negate y
/// (and vy). Body ids are `rank * portion + index`, globally unique.
pub fn seed_bodies(config: &SimConfig, rank: usize, size: usize) -> Vec<Body> {
    let portion = config.portion(size);
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(rank as u64 * 7919));
    let mut bodies = Vec::with_capacity(portion);

    for i in 0..portion {
        let mut px = rng.gen::<f64>() * config.radius;
        let mut py = rng.gen::<f64>() * config.radius;
        let mut vx =
            -rng.gen::<f64>() * rng.gen::<f64>() * rng.gen::<f64>() * config.radius * 0.1;
        let mut vy =
            -rng.gen::<f64>() * rng.gen::<f64>() * rng.gen::<f64>() * config.radius * 0.1;

        if rank % 2 == 0 {
            px = -px;
            vx = -vx;
        }
        if rank >= size / 2 {
            py = -py;
            vy = -vy;
        }

        let id = (rank * portion + i) as u64;
        bodies.push(Body::new(
            id,
            NVec2::new(px, py),
            NVec2::new(vx, vy),
            BODY_MASS,
            BODY_COLOR,
        ));
    }

    // The anchor replaces a random body rather than adding one, keeping the
    // global count at exactly n.
    if rank == 0 && !bodies.is_empty() {
        bodies[0] = Body::new(0, NVec2::zeros(), NVec2::zeros(), CENTRAL_MASS, CENTRAL_COLOR);
    }

    bodies
}
