//! MPI communication backend for the slab solver.
//!
//! Requires the `distributed` feature flag and an MPI installation.
//! Implements `Communicator` using `mpi::traits::*` for inter-process
//! communication (non-blocking halo exchange, max all-reduce, gather).
//!
//! # Usage
//!
//! The caller must initialize MPI before constructing `MpiComm` and keep
//! the universe alive for as long as the communicator is used:
//!
//! ```ignore
//! let universe = mpi::initialize().expect("MPI init failed");
//! let comm = MpiComm::new();
//! ```
//!
//! # Halo exchange
//!
//! Sends and receives are posted with `immediate_send_with_tag` /
//! `immediate_receive_into_with_tag` inside a request scope. Every request
//! is waited on before the scope closes.

use mpi::collective::SystemOperation;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

use crate::error::{JacobiError, Result};

use super::comm::Communicator;
use super::halo::{HaloPlanes, PendingHalo, HALO_TAG};

/// MPI-based communication backend over the world communicator.
pub struct MpiComm;

impl MpiComm {
    /// Create a new MPI communication backend.
    ///
    /// MPI must already be initialized via `mpi::initialize()`.
    pub fn new() -> Self {
        Self
    }
}

impl Default for MpiComm {
    fn default() -> Self {
        Self::new()
    }
}

fn peer_rank(rank: usize) -> Result<i32> {
    i32::try_from(rank).map_err(|_| JacobiError::Comm(format!("rank {rank} exceeds MPI range")))
}

impl Communicator for MpiComm {
    fn rank(&self) -> usize {
        let world = SimpleCommunicator::world();
        world.rank() as usize
    }

    fn num_ranks(&self) -> usize {
        let world = SimpleCommunicator::world();
        world.size() as usize
    }

    fn exchange_halos(&self, planes: HaloPlanes<'_>, overlap: &mut dyn FnMut()) -> Result<()> {
        let world = SimpleCommunicator::world();
        let HaloPlanes {
            predecessor,
            successor,
        } = planes;
        let predecessor = predecessor
            .map(|p| peer_rank(p.rank).map(|r| (r, p)))
            .transpose()?;
        let successor = successor
            .map(|s| peer_rank(s.rank).map(|r| (r, s)))
            .transpose()?;

        mpi::request::scope(|scope| {
            let mut pending = PendingHalo {
                send_to_predecessor: None,
                recv_from_predecessor: None,
                send_to_successor: None,
                recv_from_successor: None,
            };

            if let Some((rank, p)) = predecessor {
                let peer = world.process_at_rank(rank);
                pending.send_to_predecessor =
                    Some(peer.immediate_send_with_tag(scope, p.send, HALO_TAG));
                pending.recv_from_predecessor =
                    Some(peer.immediate_receive_into_with_tag(scope, p.recv, HALO_TAG));
            }
            if let Some((rank, s)) = successor {
                let peer = world.process_at_rank(rank);
                pending.send_to_successor =
                    Some(peer.immediate_send_with_tag(scope, s.send, HALO_TAG));
                pending.recv_from_successor =
                    Some(peer.immediate_receive_into_with_tag(scope, s.recv, HALO_TAG));
            }

            overlap();

            pending.complete(
                |send| {
                    send.wait();
                    Ok(())
                },
                |recv| {
                    recv.wait();
                    Ok(())
                },
            )
        })
    }

    fn all_reduce_max(&self, local: f64) -> Result<f64> {
        let world = SimpleCommunicator::world();
        let mut global = f64::NEG_INFINITY;
        world.all_reduce_into(&local, &mut global, SystemOperation::max());
        Ok(global)
    }

    fn gather_to_root(&self, local: &[f64]) -> Result<Option<Vec<f64>>> {
        let world = SimpleCommunicator::world();
        let root = world.process_at_rank(0);
        if world.rank() == 0 {
            let mut all = vec![0.0f64; local.len() * world.size() as usize];
            root.gather_into_root(local, &mut all[..]);
            Ok(Some(all))
        } else {
            root.gather_into(local);
            Ok(None)
        }
    }

    fn barrier(&self) -> Result<()> {
        let world = SimpleCommunicator::world();
        world.barrier();
        Ok(())
    }
}
