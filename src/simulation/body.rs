//! Body state and point-mass kinematics.
//!
//! A `Body` is a point mass with position, velocity, and a bookkeeping force
//! accumulator, all over `NVec2`. The force accumulator is zeroed at the
//! start of each force pass and integrated out at the end of the step.

use nalgebra::Vector2;

use crate::simulation::quadrant::Quadrant;

pub type NVec2 = Vector2<f64>;

/// Newtonian gravitational constant.
pub const G: f64 = 6.67e-11;

/// Softening length added (squared) to the denominator of the force law so
/// that near-coincident bodies produce finite forces.
pub const EPS: f64 = 3.0e4;

#[derive(Debug, Clone)]
pub struct Body {
    /// Identity used for the self-interaction test during tree traversal.
    /// Globally unique across ranks (`rank * portion + index`).
    pub id: u64,
    pub r: NVec2, // position
    pub v: NVec2, // velocity
    pub f: NVec2, // accumulated force over the current step
    pub m: f64,   // mass, constant over the run
    pub color: [u8; 3], // tag consumed only by the renderer
}

impl Body {
    pub fn new(id: u64, r: NVec2, v: NVec2, m: f64, color: [u8; 3]) -> Self {
        Self {
            id,
            r,
            v,
            f: NVec2::zeros(),
            m,
            color,
        }
    }

    /// A probe stands in for a remote body during the ring exchange: same
    /// position and mass, zero velocity, discarded within the step.
    pub fn probe(id: u64, x: f64, y: f64, m: f64) -> Self {
        Self::new(id, NVec2::new(x, y), NVec2::zeros(), m, [0, 0, 0])
    }

    /// True if this body lies inside `quad`.
    pub fn inside(&self, quad: &Quadrant) -> bool {
        quad.contains(self.r.x, self.r.y)
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: &Body) -> f64 {
        (other.r - self.r).norm()
    }

    pub fn reset_force(&mut self) {
        self.f = NVec2::zeros();
    }

    pub fn add_force(&mut self, dfx: f64, dfy: f64) {
        self.f.x += dfx;
        self.f.y += dfy;
    }

    /// Replace the accumulated force with the contribution from `other`.
    pub fn compute_force_from(&mut self, other: &Body) {
        self.reset_force();
        self.accumulate_force_from(other);
    }

    /// Add the gravitational pull of `other` to the accumulated force:
    /// F = G m1 m2 / (d^2 + eps^2), directed from self toward other.
    /// Coincident bodies contribute nothing.
    pub fn accumulate_force_from(&mut self, other: &Body) {
        let d = other.r - self.r;
        let dist = d.norm();
        if dist == 0.0 {
            return;
        }
        let mag = G * self.m * other.m / (dist * dist + EPS * EPS);
        self.f += (mag / dist) * d;
    }

    /// Advance by one step of semi-implicit Euler: the velocity picks up the
    /// full-step kick first, then the position drifts with the new velocity.
    pub fn update(&mut self, dt: f64) {
        self.v += (dt / self.m) * self.f;
        self.r += dt * self.v;
    }

    /// Aggregate pseudo-body at the mass-weighted midpoint with summed mass.
    /// Used only when building tree aggregates; the id carried over is the
    /// receiver's and is never compared against a real body.
    pub fn plus(&self, other: &Body) -> Body {
        let m = self.m + other.m;
        let r = (self.r * self.m + other.r * other.m) / m;
        Body::new(self.id, r, NVec2::zeros(), m, self.color)
    }
}
