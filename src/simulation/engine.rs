//! Per-step simulation driver.
//!
//! Every process runs the same loop: build a fresh local tree, take the
//! local force pass, close the cross-process contributions with the ring
//! exchange, integrate, and optionally gather the whole system for a frame.
//! The end-of-frame barrier keeps ranks in lockstep across steps.

use std::time::Instant;

use log::{debug, info};

use crate::communication::exchange::{exchange_forces, ExchangeBuffers};
use crate::communication::transport::Transport;
use crate::configuration::config::SimConfig;
use crate::errors::SimError;
use crate::simulation::bhtree::BHTree;
use crate::simulation::body::Body;
use crate::simulation::quadrant::Quadrant;
use crate::simulation::scenario::seed_bodies;

/// Where gathered frames go. Addressed in simulation coordinates; mapping
/// to pixel space is the sink's concern.
pub trait Renderer {
    fn clear(&mut self, background: [u8; 3]);
    fn draw_point(&mut self, x: f64, y: f64, color: [u8; 3]);
    fn present(&mut self) -> std::io::Result<()>;
}

pub struct Simulator<T: Transport> {
    config: SimConfig,
    comm: T,
    bodies: Vec<Body>,
    bufs: ExchangeBuffers,
    sink: Option<Box<dyn Renderer + Send>>,
    // Gather staging, reused every frame.
    send_x: Vec<f64>,
    send_y: Vec<f64>,
    all_x: Vec<f64>,
    all_y: Vec<f64>,
    t: f64,
}

impl<T: Transport> Simulator<T> {
    /// Build a simulator over `comm` with the rank's slice of randomly
    /// seeded bodies.
    pub fn new(
        config: SimConfig,
        comm: T,
        sink: Option<Box<dyn Renderer + Send>>,
    ) -> Result<Self, SimError> {
        let bodies = seed_bodies(&config, comm.rank(), comm.size());
        Self::with_bodies(config, comm, bodies, sink)
    }

    /// Build a simulator over an explicit body slice. The slice length must
    /// equal `n / size`; validation runs before any state is built.
    pub fn with_bodies(
        config: SimConfig,
        comm: T,
        bodies: Vec<Body>,
        sink: Option<Box<dyn Renderer + Send>>,
    ) -> Result<Self, SimError> {
        config.validate(comm.size())?;
        let portion = config.portion(comm.size());
        assert_eq!(bodies.len(), portion);
        Ok(Self {
            bufs: ExchangeBuffers::new(portion),
            send_x: vec![0.0; portion],
            send_y: vec![0.0; portion],
            all_x: vec![0.0; config.n],
            all_y: vec![0.0; config.n],
            config,
            comm,
            bodies,
            sink,
            t: 0.0,
        })
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn rank(&self) -> usize {
        self.comm.rank()
    }

    pub fn time(&self) -> f64 {
        self.t
    }

    /// Positions gathered during the latest rendered frame, in rank order.
    pub fn gathered(&self) -> (&[f64], &[f64]) {
        (&self.all_x, &self.all_y)
    }

    /// Advance the system by one time step.
    pub fn step(&mut self) -> Result<(), SimError> {
        let root = Quadrant::new(0.0, 0.0, 2.0 * self.config.radius);
        let mut tree = BHTree::new(root, self.config.theta);

        // Bodies that drifted out of the root region skip the tree this
        // step; they keep integrating and may re-enter later.
        let mut inserted = 0usize;
        for b in &self.bodies {
            if b.inside(&root) {
                tree.insert(b.clone());
                inserted += 1;
            }
        }
        if inserted < self.bodies.len() {
            debug!(
                "rank {}: {} bodies outside root region",
                self.comm.rank(),
                self.bodies.len() - inserted
            );
        }

        for b in &mut self.bodies {
            b.reset_force();
            tree.update_force(b);
        }

        exchange_forces(&mut self.comm, &mut self.bodies, &tree, &mut self.bufs)?;

        for b in &mut self.bodies {
            b.update(self.config.dt);
        }

        if self.config.render {
            self.render_frame()?;
        }

        self.t += self.config.dt;
        Ok(())
    }

    /// Run until the configured step bound, or forever when unbounded.
    pub fn run(&mut self) -> Result<(), SimError> {
        let started = Instant::now();
        let mut step = 0u64;
        loop {
            if let Some(limit) = self.config.steps {
                if step >= limit {
                    break;
                }
            }
            self.step()?;
            step += 1;
            if step % 100 == 0 {
                info!(
                    "rank {}: {} steps, t = {:.1}, elapsed {:.2?}",
                    self.comm.rank(),
                    step,
                    self.t,
                    started.elapsed()
                );
            }
        }
        Ok(())
    }

    /// Gather every rank's positions and hand the full system to the sink.
    /// All ranks take part in the gather and barrier even when only some of
    /// them draw, so frames are identical by construction.
    fn render_frame(&mut self) -> Result<(), SimError> {
        for (i, b) in self.bodies.iter().enumerate() {
            self.send_x[i] = b.r.x;
            self.send_y[i] = b.r.y;
        }
        self.comm.all_gather(&self.send_x, &mut self.all_x)?;
        self.comm.all_gather(&self.send_y, &mut self.all_y)?;

        if let Some(sink) = self.sink.as_mut() {
            sink.clear([0, 0, 0]);
            // Index 0 is rank 0's central anchor; everything else is an
            // ordinary body.
            for i in 0..self.config.n {
                let color = if i == 0 { [255, 0, 0] } else { [255, 255, 0] };
                sink.draw_point(self.all_x[i], self.all_y[i], color);
            }
            sink.present().map_err(SimError::Render)?;
        }

        self.comm.barrier()?;
        Ok(())
    }
}
