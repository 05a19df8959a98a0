//! In-process communication backend: every rank is an OS thread.
//!
//! Point-to-point transfers use one `mpsc` channel per directed neighbor
//! pair, so sends never block and messages between two ranks arrive in
//! order. Collectives write into shared per-rank slots and synchronize on a
//! `Barrier`.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Barrier, Mutex, MutexGuard};
use std::thread;

use crate::error::{JacobiError, Result};

use super::comm::Communicator;
use super::halo::{HaloPlanes, PendingHalo};

struct Shared {
    barrier: Barrier,
    reduce_slots: Mutex<Vec<f64>>,
    gather_slots: Mutex<Vec<Vec<f64>>>,
}

impl Shared {
    fn lock<'a, T>(slots: &'a Mutex<T>) -> Result<MutexGuard<'a, T>> {
        slots
            .lock()
            .map_err(|_| JacobiError::Comm("a peer rank panicked".into()))
    }
}

/// One rank of an in-process group.
pub struct ThreadComm {
    rank: usize,
    num_ranks: usize,
    to_predecessor: Option<Sender<Vec<f64>>>,
    from_predecessor: Option<Receiver<Vec<f64>>>,
    to_successor: Option<Sender<Vec<f64>>>,
    from_successor: Option<Receiver<Vec<f64>>>,
    shared: Arc<Shared>,
}

impl ThreadComm {
    /// Build a linear chain of `num_ranks` communicators, indexed by rank.
    pub fn group(num_ranks: usize) -> Vec<ThreadComm> {
        let shared = Arc::new(Shared {
            barrier: Barrier::new(num_ranks),
            reduce_slots: Mutex::new(vec![f64::NEG_INFINITY; num_ranks]),
            gather_slots: Mutex::new(vec![Vec::new(); num_ranks]),
        });

        let mut comms: Vec<ThreadComm> = (0..num_ranks)
            .map(|rank| ThreadComm {
                rank,
                num_ranks,
                to_predecessor: None,
                from_predecessor: None,
                to_successor: None,
                from_successor: None,
                shared: Arc::clone(&shared),
            })
            .collect();

        for upper in 1..num_ranks {
            let lower = upper - 1;
            let (up_tx, up_rx) = channel();
            let (down_tx, down_rx) = channel();
            comms[lower].to_successor = Some(up_tx);
            comms[upper].from_predecessor = Some(up_rx);
            comms[upper].to_predecessor = Some(down_tx);
            comms[lower].from_successor = Some(down_rx);
        }
        comms
    }

    /// Run `f` on `num_ranks` threads, one communicator each, and return the
    /// results in rank order. A panic on any rank is re-raised here.
    pub fn run<T, F>(num_ranks: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(ThreadComm) -> T + Sync,
    {
        let f = &f;
        thread::scope(|scope| {
            let handles: Vec<_> = Self::group(num_ranks)
                .into_iter()
                .map(|comm| {
                    thread::Builder::new()
                        .name(format!("rank-{}", comm.rank))
                        .spawn_scoped(scope, move || f(comm))
                        .unwrap_or_else(|e| panic!("failed to spawn rank thread: {e}"))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        })
    }

    fn post_send(tx: &Option<Sender<Vec<f64>>>, plane: &[f64], peer: usize) -> Result<()> {
        let tx = tx
            .as_ref()
            .ok_or_else(|| JacobiError::Comm(format!("no channel to rank {peer}")))?;
        tx.send(plane.to_vec())
            .map_err(|_| JacobiError::Comm(format!("rank {peer} hung up")))
    }

    fn wait_recv(
        rx: &Option<Receiver<Vec<f64>>>,
        ghost: &mut [f64],
        peer: usize,
    ) -> Result<()> {
        let rx = rx
            .as_ref()
            .ok_or_else(|| JacobiError::Comm(format!("no channel from rank {peer}")))?;
        let plane = rx
            .recv()
            .map_err(|_| JacobiError::Comm(format!("rank {peer} hung up")))?;
        if plane.len() != ghost.len() {
            return Err(JacobiError::Comm(format!(
                "halo from rank {peer} has {} values, expected {}",
                plane.len(),
                ghost.len()
            )));
        }
        ghost.copy_from_slice(&plane);
        Ok(())
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn num_ranks(&self) -> usize {
        self.num_ranks
    }

    fn exchange_halos(&self, planes: HaloPlanes<'_>, overlap: &mut dyn FnMut()) -> Result<()> {
        let HaloPlanes {
            predecessor,
            successor,
        } = planes;

        // Channel sends are buffered, so a posted send is already complete.
        let mut pending: PendingHalo<(), (usize, &mut [f64], &Option<Receiver<Vec<f64>>>)> =
            PendingHalo {
                send_to_predecessor: None,
                recv_from_predecessor: None,
                send_to_successor: None,
                recv_from_successor: None,
            };
        if let Some(p) = predecessor {
            Self::post_send(&self.to_predecessor, p.send, p.rank)?;
            pending.send_to_predecessor = Some(());
            pending.recv_from_predecessor = Some((p.rank, p.recv, &self.from_predecessor));
        }
        if let Some(s) = successor {
            Self::post_send(&self.to_successor, s.send, s.rank)?;
            pending.send_to_successor = Some(());
            pending.recv_from_successor = Some((s.rank, s.recv, &self.from_successor));
        }

        overlap();

        pending.complete(
            |()| Ok(()),
            |(peer, ghost, rx)| Self::wait_recv(rx, ghost, peer),
        )
    }

    fn all_reduce_max(&self, local: f64) -> Result<f64> {
        Shared::lock(&self.shared.reduce_slots)?[self.rank] = local;
        self.shared.barrier.wait();
        let global = Shared::lock(&self.shared.reduce_slots)?
            .iter()
            .fold(f64::NEG_INFINITY, |acc, &v| {
                if acc.is_nan() || v.is_nan() {
                    f64::NAN
                } else {
                    acc.max(v)
                }
            });
        // Nobody may overwrite a slot before every rank has read them all.
        self.shared.barrier.wait();
        Ok(global)
    }

    fn gather_to_root(&self, local: &[f64]) -> Result<Option<Vec<f64>>> {
        Shared::lock(&self.shared.gather_slots)?[self.rank] = local.to_vec();
        self.shared.barrier.wait();
        let gathered = if self.is_root() {
            let mut slots = Shared::lock(&self.shared.gather_slots)?;
            let total = slots.iter().map(Vec::len).sum();
            let mut all = Vec::with_capacity(total);
            for part in slots.iter_mut() {
                all.append(part);
            }
            Some(all)
        } else {
            None
        };
        self.shared.barrier.wait();
        Ok(gathered)
    }

    fn barrier(&self) -> Result<()> {
        self.shared.barrier.wait();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_links_neighbors_only() {
        let comms = ThreadComm::group(3);
        assert!(comms[0].to_predecessor.is_none());
        assert!(comms[0].to_successor.is_some());
        assert!(comms[1].to_predecessor.is_some());
        assert!(comms[1].to_successor.is_some());
        assert!(comms[2].to_successor.is_none());
        assert!(comms[2].from_predecessor.is_some());
    }

    #[test]
    fn all_reduce_max_agrees_on_every_rank() {
        let results = ThreadComm::run(4, |comm| {
            comm.all_reduce_max(comm.rank() as f64 * 1.5).unwrap()
        });
        assert_eq!(results, vec![4.5; 4]);
    }

    #[test]
    fn all_reduce_max_repeats_without_stale_slots() {
        let results = ThreadComm::run(3, |comm| {
            let first = comm.all_reduce_max(10.0 + comm.rank() as f64).unwrap();
            let second = comm.all_reduce_max(-(comm.rank() as f64)).unwrap();
            (first, second)
        });
        assert!(results.iter().all(|&r| r == (12.0, 0.0)));
    }

    #[test]
    fn gather_concatenates_in_rank_order() {
        let results = ThreadComm::run(3, |comm| {
            let r = comm.rank() as f64;
            comm.gather_to_root(&[r, r + 0.5]).unwrap()
        });
        assert_eq!(results[0], Some(vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5]));
        assert_eq!(results[1], None);
        assert_eq!(results[2], None);
    }

    #[test]
    fn exchange_fills_ghosts_from_neighbors() {
        use crate::solver::halo::NeighborPlanes;

        let results = ThreadComm::run(3, |comm| {
            let r = comm.rank();
            let mine = [r as f64; 2];
            let mut lower = [f64::NAN; 2];
            let mut upper = [f64::NAN; 2];
            let planes = HaloPlanes {
                predecessor: r.checked_sub(1).map(|rank| NeighborPlanes {
                    rank,
                    send: &mine,
                    recv: &mut lower,
                }),
                successor: (r + 1 < 3).then(|| NeighborPlanes {
                    rank: r + 1,
                    send: &mine,
                    recv: &mut upper,
                }),
            };
            let mut overlapped = false;
            comm.exchange_halos(planes, &mut || overlapped = true).unwrap();
            (overlapped, lower[0], upper[0])
        });

        assert!(results.iter().all(|r| r.0));
        assert!(results[0].1.is_nan());
        assert_eq!(results[0].2, 1.0);
        assert_eq!((results[1].1, results[1].2), (0.0, 2.0));
        assert_eq!(results[2].1, 1.0);
        assert!(results[2].2.is_nan());
    }
}
