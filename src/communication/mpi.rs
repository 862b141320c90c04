//! MPI-backed transport (cargo feature `mpi`).
//!
//! Wraps an `mpi::environment::Universe` so the same simulation binary can
//! run as a real parallel job under `mpirun -n P`. Initialization failure
//! surfaces before the loop; the universe finalizes MPI on drop.

use mpi::environment::Universe;
use mpi::point_to_point as p2p;
use mpi::topology::SystemCommunicator;
use mpi::traits::{Communicator, CommunicatorCollectives};

use crate::communication::transport::Transport;
use crate::errors::CommError;

pub struct MpiTransport {
    // Kept alive for the lifetime of the run; dropping it finalizes MPI.
    _universe: Universe,
    world: SystemCommunicator,
}

impl MpiTransport {
    pub fn init() -> Result<Self, CommError> {
        let universe = mpi::initialize()
            .ok_or_else(|| CommError::Transport("MPI initialization failed".into()))?;
        let world = universe.world();
        Ok(Self {
            _universe: universe,
            world,
        })
    }
}

impl Transport for MpiTransport {
    fn rank(&self) -> usize {
        self.world.rank() as usize
    }

    fn size(&self) -> usize {
        self.world.size() as usize
    }

    fn send_recv_replace(&mut self, buf: &mut [f64], to: usize, from: usize)
        -> Result<(), CommError>
    {
        p2p::send_receive_replace_into(
            buf,
            &self.world.process_at_rank(to as i32),
            &self.world.process_at_rank(from as i32),
        );
        Ok(())
    }

    fn all_gather(&mut self, send: &[f64], recv: &mut [f64]) -> Result<(), CommError> {
        self.world.all_gather_into(send, recv);
        Ok(())
    }

    fn barrier(&mut self) -> Result<(), CommError> {
        self.world.barrier();
        Ok(())
    }
}
