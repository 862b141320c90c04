//! Run configuration.
//!
//! A `SimConfig` can be deserialized from a YAML scenario file:
//!
//! ```yaml
//! n: 4000          # total bodies across all processes
//! radius: 2.8e6    # half side of the root quadrant
//! dt: 0.1          # integration time step
//! theta: 0.5       # Barnes-Hut acceptance ratio
//! seed: 42         # per-process RNG seed base
//! steps: 10000     # omit for an unbounded run
//! render: true
//! frames_dir: frames
//! ```
//!
//! Every field has the default shown, so a partial file (or none at all)
//! works. CLI flags override whatever the file provided.

use std::path::PathBuf;

use serde::Deserialize;

use crate::errors::ConfigError;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SimConfig {
    /// Total body count across all processes; must divide evenly.
    pub n: usize,
    /// Simulation radius: the root quadrant has side `2 * radius`.
    pub radius: f64,
    /// Fixed integration time step.
    pub dt: f64,
    /// Acceptance ratio for the Barnes-Hut cutoff, in (0, 1].
    pub theta: f64,
    /// Base RNG seed; each rank derives its own stream from it.
    pub seed: u64,
    /// Step bound; `None` runs until the job is terminated.
    pub steps: Option<u64>,
    /// Gather positions and emit a frame every step.
    pub render: bool,
    /// Where the frame sink writes its output.
    pub frames_dir: PathBuf,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            n: 4000,
            radius: 2.8e6,
            dt: 0.1,
            theta: 0.5,
            seed: 42,
            steps: None,
            render: true,
            frames_dir: PathBuf::from("frames"),
        }
    }
}

impl SimConfig {
    /// Reject configurations the simulation loop cannot run with. Called
    /// once per process before any state is built.
    pub fn validate(&self, procs: usize) -> Result<(), ConfigError> {
        if procs == 0 || self.n % procs != 0 {
            return Err(ConfigError::NotDivisible { n: self.n, procs });
        }
        if !(self.radius > 0.0) {
            return Err(ConfigError::NonPositive {
                name: "radius",
                value: self.radius,
            });
        }
        if !(self.dt > 0.0) {
            return Err(ConfigError::NonPositive {
                name: "dt",
                value: self.dt,
            });
        }
        if !(self.theta > 0.0 && self.theta <= 1.0) {
            return Err(ConfigError::InvalidTheta(self.theta));
        }
        Ok(())
    }

    /// Bodies owned by each of `procs` processes.
    pub fn portion(&self, procs: usize) -> usize {
        self.n / procs
    }
}
