//! Error types for configuration and messaging failures.

use std::error::Error;
use std::fmt;

/// Rejected configuration, detected before the simulation loop starts.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The total body count does not divide evenly across processes.
    NotDivisible { n: usize, procs: usize },
    /// A parameter that must be strictly positive was not.
    NonPositive { name: &'static str, value: f64 },
    /// Acceptance ratio outside the usable range.
    InvalidTheta(f64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::NotDivisible { n, procs } => {
                write!(f, "body count {} is not a multiple of process count {}", n, procs)
            }
            ConfigError::NonPositive { name, value } => {
                write!(f, "{} must be positive, got {}", name, value)
            }
            ConfigError::InvalidTheta(theta) => {
                write!(f, "acceptance ratio must lie in (0, 1], got {}", theta)
            }
        }
    }
}

impl Error for ConfigError {}

/// Transport failure. Always fatal to the step: the caller finalizes the
/// messaging layer and exits nonzero.
#[derive(Debug, Clone)]
pub enum CommError {
    /// A peer hung up or the underlying channel failed.
    PeerLost { peer: usize },
    /// The substrate reported a failure it could not attribute to a peer.
    Transport(String),
}

impl fmt::Display for CommError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CommError::PeerLost { peer } => write!(f, "lost contact with rank {}", peer),
            CommError::Transport(msg) => write!(f, "transport failure: {}", msg),
        }
    }
}

impl Error for CommError {}

/// Anything that can stop a simulation before its step bound.
#[derive(Debug)]
pub enum SimError {
    Config(ConfigError),
    Comm(CommError),
    Render(std::io::Error),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SimError::Config(e) => write!(f, "configuration: {}", e),
            SimError::Comm(e) => write!(f, "messaging: {}", e),
            SimError::Render(e) => write!(f, "frame sink: {}", e),
        }
    }
}

impl Error for SimError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SimError::Config(e) => Some(e),
            SimError::Comm(e) => Some(e),
            SimError::Render(e) => Some(e),
        }
    }
}

impl From<ConfigError> for SimError {
    fn from(e: ConfigError) -> Self {
        SimError::Config(e)
    }
}

impl From<CommError> for SimError {
    fn from(e: CommError) -> Self {
        SimError::Comm(e)
    }
}
