//! Communication backend abstraction for the distributed solver.
//!
//! Provides a trait for rank-to-rank coordination (halo exchange, max
//! reduction, gather) and a no-op single-process implementation.

use crate::error::Result;

use super::halo::HaloPlanes;

/// Abstraction over inter-process communication for the slab solver.
///
/// Implementations: `SingleProcessComm` (no-op), `ThreadComm` (ranks as
/// threads), `MpiComm` (via mpi crate, `distributed` feature).
pub trait Communicator {
    /// This process's rank.
    fn rank(&self) -> usize;

    /// Total number of ranks.
    fn num_ranks(&self) -> usize;

    /// Exchange ghost layers with the neighbors described by `planes`.
    ///
    /// All sends and receives are posted before `overlap` runs; every one of
    /// them has completed, and the ghost layers hold the neighbors' planes,
    /// when this returns.
    fn exchange_halos(&self, planes: HaloPlanes<'_>, overlap: &mut dyn FnMut()) -> Result<()>;

    /// Max of a local scalar across all ranks, visible on every rank.
    fn all_reduce_max(&self, local: f64) -> Result<f64>;

    /// Concatenate every rank's `local` in rank order on rank 0.
    ///
    /// Returns `Some(all)` on rank 0 and `None` elsewhere.
    fn gather_to_root(&self, local: &[f64]) -> Result<Option<Vec<f64>>>;

    /// Synchronization barrier.
    fn barrier(&self) -> Result<()>;

    fn is_root(&self) -> bool {
        self.rank() == 0
    }
}

/// No-op communication backend for a single rank.
///
/// All collectives pass values through unchanged. Halo exchange only runs
/// the overlapped work, since there are no neighbor ranks.
pub struct SingleProcessComm;

impl Communicator for SingleProcessComm {
    fn rank(&self) -> usize {
        0
    }

    fn num_ranks(&self) -> usize {
        1
    }

    fn exchange_halos(&self, planes: HaloPlanes<'_>, overlap: &mut dyn FnMut()) -> Result<()> {
        debug_assert!(planes.is_empty(), "single process has no neighbors");
        overlap();
        Ok(())
    }

    fn all_reduce_max(&self, local: f64) -> Result<f64> {
        Ok(local)
    }

    fn gather_to_root(&self, local: &[f64]) -> Result<Option<Vec<f64>>> {
        Ok(Some(local.to_vec()))
    }

    fn barrier(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_process_all_reduce_max() {
        let comm = SingleProcessComm;
        assert_eq!(comm.all_reduce_max(42.0).unwrap(), 42.0);
        assert_eq!(
            comm.all_reduce_max(f64::NEG_INFINITY).unwrap(),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn single_process_rank_and_size() {
        let comm = SingleProcessComm;
        assert_eq!(comm.rank(), 0);
        assert_eq!(comm.num_ranks(), 1);
        assert!(comm.is_root());
    }

    #[test]
    fn single_process_exchange_runs_overlap() {
        let comm = SingleProcessComm;
        let mut ran = false;
        let planes = HaloPlanes {
            predecessor: None,
            successor: None,
        };
        comm.exchange_halos(planes, &mut || ran = true).unwrap();
        assert!(ran);
    }

    #[test]
    fn single_process_gather_is_identity() {
        let comm = SingleProcessComm;
        let got = comm.gather_to_root(&[1.0, 2.0]).unwrap();
        assert_eq!(got, Some(vec![1.0, 2.0]));
    }
}
