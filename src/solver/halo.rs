//! Ghost-layer exchange between neighboring slabs.
//!
//! Each iteration a rank sends its first owned layer to its predecessor and
//! its last owned layer to its successor, and receives the matching planes
//! into its two ghost layers. Backends post all four transfers, run the
//! interior update while they are in flight, then complete every handle.

use crate::error::Result;

use super::partition::SlabPartition;
use super::slab::Slab;

/// Message tag used for halo planes.
pub const HALO_TAG: i32 = 888;

/// Planes exchanged with one neighbor.
pub struct NeighborPlanes<'a> {
    pub rank: usize,
    /// Our owned layer adjacent to this neighbor.
    pub send: &'a [f64],
    /// Our ghost layer on this neighbor's side.
    pub recv: &'a mut [f64],
}

/// Everything a backend needs for one exchange. `None` on the ends of the
/// chain.
pub struct HaloPlanes<'a> {
    pub predecessor: Option<NeighborPlanes<'a>>,
    pub successor: Option<NeighborPlanes<'a>>,
}

impl HaloPlanes<'_> {
    pub fn is_empty(&self) -> bool {
        self.predecessor.is_none() && self.successor.is_none()
    }
}

/// Split `slab` into the exchange planes and the shared owned block.
///
/// The owned block stays readable while the ghost layers are borrowed as
/// receive targets, which is what lets interior layers be updated during
/// the exchange.
pub fn split_for_exchange<'a>(
    slab: &'a mut Slab,
    partition: &SlabPartition,
) -> (HaloPlanes<'a>, &'a [f64]) {
    let plane = slab.shape().plane_len();
    let height = partition.local_height;
    let (lower, owned, upper) = slab.split_ghosts_mut();
    let owned: &'a [f64] = owned;

    let planes = HaloPlanes {
        predecessor: partition.predecessor().map(|rank| NeighborPlanes {
            rank,
            send: &owned[..plane],
            recv: lower,
        }),
        successor: partition.successor().map(|rank| NeighborPlanes {
            rank,
            send: &owned[(height - 1) * plane..],
            recv: upper,
        }),
    };
    (planes, owned)
}

/// Outstanding transfers of one exchange, one slot per role.
pub struct PendingHalo<S, R> {
    pub send_to_predecessor: Option<S>,
    pub recv_from_predecessor: Option<R>,
    pub send_to_successor: Option<S>,
    pub recv_from_successor: Option<R>,
}

impl<S, R> PendingHalo<S, R> {
    /// Block until every posted transfer has completed.
    pub fn complete(
        self,
        mut wait_send: impl FnMut(S) -> Result<()>,
        mut wait_recv: impl FnMut(R) -> Result<()>,
    ) -> Result<()> {
        if let Some(recv) = self.recv_from_successor {
            wait_recv(recv)?;
        }
        if let Some(send) = self.send_to_successor {
            wait_send(send)?;
        }
        if let Some(recv) = self.recv_from_predecessor {
            wait_recv(recv)?;
        }
        if let Some(send) = self.send_to_predecessor {
            wait_send(send)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_slab(partition: &SlabPartition) -> Slab {
        let mut slab = Slab::zeros(partition.shape());
        for layer in 0..partition.shape().layers {
            slab.plane_mut(layer).fill(layer as f64);
        }
        slab
    }

    #[test]
    fn first_rank_has_no_predecessor() {
        let partition = SlabPartition::new(8, 2, 0).unwrap();
        let mut slab = numbered_slab(&partition);
        let (planes, owned) = split_for_exchange(&mut slab, &partition);
        assert!(planes.predecessor.is_none());
        let succ = planes.successor.unwrap();
        assert_eq!(succ.rank, 1);
        assert!(succ.send.iter().all(|&v| v == 4.0));
        assert!(succ.recv.iter().all(|&v| v == 5.0));
        assert_eq!(owned.len(), 4 * 64);
    }

    #[test]
    fn last_rank_has_no_successor() {
        let partition = SlabPartition::new(8, 2, 1).unwrap();
        let mut slab = numbered_slab(&partition);
        let (planes, _) = split_for_exchange(&mut slab, &partition);
        assert!(planes.successor.is_none());
        let pred = planes.predecessor.unwrap();
        assert_eq!(pred.rank, 0);
        assert!(pred.send.iter().all(|&v| v == 1.0));
        assert!(pred.recv.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn single_rank_exchanges_nothing() {
        let partition = SlabPartition::new(4, 1, 0).unwrap();
        let mut slab = numbered_slab(&partition);
        let (planes, _) = split_for_exchange(&mut slab, &partition);
        assert!(planes.is_empty());
    }

    #[test]
    fn complete_waits_every_posted_role() {
        let pending: PendingHalo<&str, &str> = PendingHalo {
            send_to_predecessor: Some("sp"),
            recv_from_predecessor: Some("rp"),
            send_to_successor: None,
            recv_from_successor: Some("rs"),
        };
        let mut seen = Vec::new();
        let mut recvs = Vec::new();
        pending
            .complete(
                |s| {
                    seen.push(s);
                    Ok(())
                },
                |r| {
                    recvs.push(r);
                    Ok(())
                },
            )
            .unwrap();
        assert_eq!(seen, vec!["sp"]);
        assert_eq!(recvs, vec!["rs", "rp"]);
    }
}
