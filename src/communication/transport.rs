//! Message-passing substrates.
//!
//! The simulation talks to its peers through three primitives: a paired
//! send-and-receive-in-place exchange, an all-gather, and a barrier. Any
//! substrate providing those suffices; this module carries a no-op
//! single-process substrate and an in-process cluster of channel-connected
//! peers. The MPI-backed substrate lives in `communication::mpi` behind the
//! `mpi` cargo feature.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Barrier};

use crate::errors::CommError;

pub trait Transport {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Send the contents of `buf` to `to` and overwrite `buf` with the
    /// payload received from `from`. Blocks until both halves complete.
    fn send_recv_replace(&mut self, buf: &mut [f64], to: usize, from: usize)
        -> Result<(), CommError>;

    /// Concatenate every rank's `send` slice into `recv` in rank order.
    /// `recv.len()` must equal `size() * send.len()`.
    fn all_gather(&mut self, send: &[f64], recv: &mut [f64]) -> Result<(), CommError>;

    /// Return once every rank has entered.
    fn barrier(&mut self) -> Result<(), CommError>;
}

/// Degenerate substrate for a lone process. The ring loop never issues an
/// exchange when there are no peers, the gather is a copy, and the barrier
/// is immediate.
pub struct SingleProcess;

impl Transport for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn send_recv_replace(
        &mut self,
        _buf: &mut [f64],
        to: usize,
        _from: usize,
    ) -> Result<(), CommError> {
        Err(CommError::PeerLost { peer: to })
    }

    fn all_gather(&mut self, send: &[f64], recv: &mut [f64]) -> Result<(), CommError> {
        recv.copy_from_slice(send);
        Ok(())
    }

    fn barrier(&mut self) -> Result<(), CommError> {
        Ok(())
    }
}

/// One endpoint of an in-process cluster. Every pair of peers is joined by
/// a dedicated channel in each direction, so paired exchanges never have to
/// disambiguate senders and cannot deadlock: the send half is buffered, the
/// receive half blocks until the peer's send lands.
pub struct LocalTransport {
    rank: usize,
    /// `senders[j]` feeds rank j's receiver for this rank.
    senders: Vec<Sender<Vec<f64>>>,
    /// `receivers[i]` yields payloads sent by rank i.
    receivers: Vec<Receiver<Vec<f64>>>,
    barrier: Arc<Barrier>,
}

/// Wire up `size` connected endpoints. Hand one to each worker thread.
pub fn local_cluster(size: usize) -> Vec<LocalTransport> {
    assert!(size > 0);
    let barrier = Arc::new(Barrier::new(size));

    // One channel per ordered pair (i, j): senders[i][j] feeds
    // receivers[j][i].
    let mut senders: Vec<Vec<Sender<Vec<f64>>>> =
        (0..size).map(|_| Vec::with_capacity(size)).collect();
    let mut receivers: Vec<Vec<Receiver<Vec<f64>>>> =
        (0..size).map(|_| Vec::with_capacity(size)).collect();
    for i in 0..size {
        for j in 0..size {
            let (tx, rx) = channel();
            senders[i].push(tx);
            receivers[j].push(rx);
        }
    }

    senders
        .into_iter()
        .zip(receivers)
        .enumerate()
        .map(|(rank, (senders, receivers))| LocalTransport {
            rank,
            senders,
            receivers,
            barrier: Arc::clone(&barrier),
        })
        .collect()
}

impl Transport for LocalTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.senders.len()
    }

    fn send_recv_replace(&mut self, buf: &mut [f64], to: usize, from: usize)
        -> Result<(), CommError>
    {
        self.senders[to]
            .send(buf.to_vec())
            .map_err(|_| CommError::PeerLost { peer: to })?;
        let incoming = self.receivers[from]
            .recv()
            .map_err(|_| CommError::PeerLost { peer: from })?;
        buf.copy_from_slice(&incoming);
        Ok(())
    }

    fn all_gather(&mut self, send: &[f64], recv: &mut [f64]) -> Result<(), CommError> {
        let count = send.len();
        debug_assert_eq!(recv.len(), count * self.size());
        for j in 0..self.size() {
            if j != self.rank {
                self.senders[j]
                    .send(send.to_vec())
                    .map_err(|_| CommError::PeerLost { peer: j })?;
            }
        }
        for i in 0..self.size() {
            let slot = &mut recv[i * count..(i + 1) * count];
            if i == self.rank {
                slot.copy_from_slice(send);
            } else {
                let incoming = self.receivers[i]
                    .recv()
                    .map_err(|_| CommError::PeerLost { peer: i })?;
                slot.copy_from_slice(&incoming);
            }
        }
        Ok(())
    }

    fn barrier(&mut self) -> Result<(), CommError> {
        self.barrier.wait();
        Ok(())
    }
}
