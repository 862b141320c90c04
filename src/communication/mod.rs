pub mod exchange;
#[cfg(feature = "mpi")]
pub mod mpi;
pub mod transport;
