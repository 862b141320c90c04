//! Ring-rotation force exchange.
//!
//! After the local force pass, every pairwise contribution that crosses a
//! process boundary is still missing. The ring schedule closes the gap in
//! P − 1 rounds: in round r each rank ships its bodies' positions and
//! masses to the peer at offset +r, evaluates the probes it receives from
//! the peer at offset −r against its own tree, and returns the partial
//! forces to their owner. Each ordered pair of ranks meets in exactly one
//! round, so every body ends the protocol with one contribution from every
//! other process's tree and none counted twice.

use log::trace;

use crate::communication::transport::Transport;
use crate::errors::CommError;
use crate::simulation::bhtree::BHTree;
use crate::simulation::body::Body;

/// Outbound/inbound staging for one rank, sized once and reused every round.
/// Never touched while an exchange is in flight; the primitives block.
pub struct ExchangeBuffers {
    x: Vec<f64>,
    y: Vec<f64>,
    m: Vec<f64>,
}

impl ExchangeBuffers {
    pub fn new(portion: usize) -> Self {
        Self {
            x: vec![0.0; portion],
            y: vec![0.0; portion],
            m: vec![0.0; portion],
        }
    }
}

/// Run the full ring schedule for one step. `bodies` are the rank's owned
/// bodies with the local force pass already applied; `tree` is the local
/// tree those bodies were built into.
pub fn exchange_forces<T: Transport>(
    comm: &mut T,
    bodies: &mut [Body],
    tree: &BHTree,
    bufs: &mut ExchangeBuffers,
) -> Result<(), CommError> {
    let rank = comm.rank();
    let size = comm.size();
    let portion = bodies.len();

    for r in 1..size {
        let to = (rank + r) % size;
        // Normalized so the offset stays in [0, size) for every rank.
        let from = (rank + size - r) % size;

        for (i, b) in bodies.iter().enumerate() {
            bufs.x[i] = b.r.x;
            bufs.y[i] = b.r.y;
            bufs.m[i] = b.m;
        }

        comm.send_recv_replace(&mut bufs.m, to, from)?;
        comm.send_recv_replace(&mut bufs.x, to, from)?;
        comm.send_recv_replace(&mut bufs.y, to, from)?;

        // The buffers now hold `from`'s bodies. Evaluate them against the
        // local tree and overwrite positions with the resulting forces.
        for i in 0..portion {
            let id = (from * portion + i) as u64;
            let mut probe = Body::probe(id, bufs.x[i], bufs.y[i], bufs.m[i]);
            tree.update_force(&mut probe);
            bufs.x[i] = probe.f.x;
            bufs.y[i] = probe.f.y;
        }

        // Return the partial forces to their owner; receive in the same
        // motion the forces `to` computed on our bodies.
        comm.send_recv_replace(&mut bufs.x, from, to)?;
        comm.send_recv_replace(&mut bufs.y, from, to)?;

        for (i, b) in bodies.iter_mut().enumerate() {
            b.add_force(bufs.x[i], bufs.y[i]);
        }

        trace!("rank {} round {}: exchanged with +{} / -{}", rank, r, to, from);
    }

    Ok(())
}
