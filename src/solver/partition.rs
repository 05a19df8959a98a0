//! Slab decomposition of the grid along Z.
//!
//! Every rank owns `n / num_ranks` consecutive Z layers. Ranks form a linear
//! chain: rank `r` exchanges ghost layers with `r - 1` and `r + 1`.

use crate::error::{JacobiError, Result};

use super::slab::SlabShape;

/// One rank's share of the global grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlabPartition {
    pub n: usize,
    pub num_ranks: usize,
    pub rank: usize,
    /// Owned Z layers on this rank.
    pub local_height: usize,
    /// Global Z index of the first owned layer.
    pub z_offset: usize,
}

impl SlabPartition {
    /// Partition an `n`-layer grid over `num_ranks` ranks.
    ///
    /// Pure function of its arguments, so every rank reaches the same verdict
    /// before any communication is attempted.
    pub fn new(n: usize, num_ranks: usize, rank: usize) -> Result<Self> {
        if num_ranks == 0 {
            return Err(JacobiError::Partition("process count must be positive".into()));
        }
        if rank >= num_ranks {
            return Err(JacobiError::Partition(format!(
                "rank {rank} out of range for {num_ranks} processes"
            )));
        }
        if n % num_ranks != 0 {
            return Err(JacobiError::Partition(format!(
                "grid size {n} should be a multiple of the process count {num_ranks}"
            )));
        }
        let local_height = n / num_ranks;
        Ok(Self {
            n,
            num_ranks,
            rank,
            local_height,
            z_offset: rank * local_height,
        })
    }

    pub fn predecessor(&self) -> Option<usize> {
        self.rank.checked_sub(1)
    }

    pub fn successor(&self) -> Option<usize> {
        (self.rank + 1 < self.num_ranks).then_some(self.rank + 1)
    }

    /// Global Z index of local layer `layer` (layer 0 is the lower ghost).
    pub fn global_z(&self, layer: usize) -> isize {
        self.z_offset as isize + layer as isize - 1
    }

    /// Shape of the local slab including both ghost layers.
    pub fn shape(&self) -> SlabShape {
        SlabShape::new(self.n, self.local_height + 2)
    }

    /// Owned layers that read only owned data, updatable while halos are in
    /// flight.
    pub fn interior_layers(&self) -> std::ops::Range<usize> {
        2..self.local_height
    }

    /// Owned layers that read a ghost layer. A single layer when
    /// `local_height == 1`.
    pub fn boundary_adjacent_layers(&self) -> Vec<usize> {
        if self.local_height == 1 {
            vec![1]
        } else {
            vec![1, self.local_height]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_split_heights_and_offsets() {
        let parts: Vec<_> = (0..4)
            .map(|r| SlabPartition::new(16, 4, r).unwrap())
            .collect();
        for (r, p) in parts.iter().enumerate() {
            assert_eq!(p.local_height, 4);
            assert_eq!(p.z_offset, 4 * r);
        }
    }

    #[test]
    fn two_ranks_chain_ends() {
        let p0 = SlabPartition::new(8, 2, 0).unwrap();
        let p1 = SlabPartition::new(8, 2, 1).unwrap();
        assert_eq!(p0.local_height, 4);
        assert_eq!(p0.predecessor(), None);
        assert_eq!(p0.successor(), Some(1));
        assert_eq!(p1.predecessor(), Some(0));
        assert_eq!(p1.successor(), None);
    }

    #[test]
    fn indivisible_grid_is_rejected_on_every_rank() {
        for rank in 0..3 {
            let err = SlabPartition::new(10, 3, rank).unwrap_err();
            assert!(matches!(err, JacobiError::Partition(_)));
            assert!(err.to_string().contains("multiple"));
        }
    }

    #[test]
    fn rank_out_of_range_is_rejected() {
        assert!(SlabPartition::new(8, 2, 2).is_err());
        assert!(SlabPartition::new(8, 0, 0).is_err());
    }

    #[test]
    fn global_z_accounts_for_ghost_layer() {
        let p = SlabPartition::new(8, 2, 1).unwrap();
        assert_eq!(p.global_z(0), 3);
        assert_eq!(p.global_z(1), 4);
        assert_eq!(p.global_z(4), 7);
        assert_eq!(p.global_z(5), 8);
    }

    #[test]
    fn layer_classes_cover_owned_layers_once() {
        for height in 1..6 {
            let p = SlabPartition::new(height * 2, 2, 0).unwrap();
            let mut layers: Vec<usize> = p.interior_layers().collect();
            layers.extend(p.boundary_adjacent_layers());
            layers.sort();
            assert_eq!(layers, (1..=height).collect::<Vec<_>>());
        }
    }
}
