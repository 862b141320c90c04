pub mod communication;
pub mod configuration;
pub mod errors;
pub mod simulation;
pub mod visualization;

pub use simulation::bhtree::BHTree;
pub use simulation::body::{Body, NVec2, EPS, G};
pub use simulation::engine::{Renderer, Simulator};
pub use simulation::quadrant::Quadrant;
pub use simulation::scenario::{seed_bodies, BODY_MASS, CENTRAL_MASS};

pub use communication::exchange::{exchange_forces, ExchangeBuffers};
pub use communication::transport::{local_cluster, LocalTransport, SingleProcess, Transport};

pub use configuration::config::SimConfig;
pub use errors::{CommError, ConfigError, SimError};
pub use visualization::frame::FrameSink;
