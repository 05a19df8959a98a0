//! 7-point Jacobi update of one Z layer.
//!
//! Every update reads only the current buffer and writes only the next one,
//! so the sweep order within an iteration does not affect the result.

use crate::config::SolverConfig;

use super::boundary::rho;
use super::convergence::max_delta;
use super::partition::SlabPartition;
use super::slab::{Slab, SlabShape};

/// Precomputed stencil coefficients for one config.
#[derive(Debug, Clone)]
pub struct StencilContext<'c> {
    config: &'c SolverConfig,
    plane: SlabShape,
    xs: Vec<f64>,
    ys: Vec<f64>,
    inv_hx2: f64,
    inv_hy2: f64,
    inv_hz2: f64,
    denominator: f64,
}

impl<'c> StencilContext<'c> {
    pub fn new(config: &'c SolverConfig) -> Self {
        let steps = config.steps();
        let inv_hx2 = 1.0 / steps.hx2();
        let inv_hy2 = 1.0 / steps.hy2();
        let inv_hz2 = 1.0 / steps.hz2();
        Self {
            config,
            plane: SlabShape::new(config.n, 1),
            xs: (0..config.n).map(|i| config.x(i)).collect(),
            ys: (0..config.n).map(|j| config.y(j)).collect(),
            inv_hx2,
            inv_hy2,
            inv_hz2,
            denominator: 2.0 * inv_hx2 + 2.0 * inv_hy2 + 2.0 * inv_hz2 + config.penalty,
        }
    }

    /// Update one plane at global Z index `gz` from its current value
    /// `center` and its Z neighbors `below`/`above`, writing into `out`.
    ///
    /// Returns the largest `|new - old|` over the plane: `0` for a Z face,
    /// negative infinity if the plane has no interior point.
    pub fn update_plane(
        &self,
        gz: isize,
        below: &[f64],
        center: &[f64],
        above: &[f64],
        out: &mut [f64],
    ) -> f64 {
        let n = self.config.n;
        if gz == 0 || gz == n as isize - 1 {
            out.copy_from_slice(center);
            return 0.0;
        }

        let shape = self.plane;
        let z = self.config.z(gz);
        let mut delta = f64::NEG_INFINITY;

        for i in 0..n {
            let x = self.xs[i];
            for j in 0..n {
                let idx = shape.plane_index(i, j);
                if i == 0 || i == n - 1 || j == 0 || j == n - 1 {
                    out[idx] = center[idx];
                    continue;
                }
                let y = self.ys[j];

                let updown = (above[idx] + below[idx]) * self.inv_hz2;
                let eastwest = (center[shape.plane_index(i + 1, j)]
                    + center[shape.plane_index(i - 1, j)])
                    * self.inv_hx2;
                let northsouth = (center[shape.plane_index(i, j + 1)]
                    + center[shape.plane_index(i, j - 1)])
                    * self.inv_hy2;

                let value = (updown + eastwest + northsouth - rho(self.config.penalty, x, y, z))
                    / self.denominator;
                out[idx] = value;
                delta = max_delta(delta, (value - center[idx]).abs());
            }
        }
        delta
    }

    /// Update owned layer `layer` of `current` into `next`, reading ghost
    /// layers where the neighbor sits on another rank.
    pub fn update_layer(
        &self,
        partition: &SlabPartition,
        layer: usize,
        current: &Slab,
        next: &mut Slab,
    ) -> f64 {
        self.update_plane(
            partition.global_z(layer),
            current.plane(layer - 1),
            current.plane(layer),
            current.plane(layer + 1),
            next.plane_mut(layer),
        )
    }

    /// Update owned layer `layer` using only the owned block, which starts
    /// at layer 1. Valid for layers in `partition.interior_layers()`.
    pub fn update_interior_layer(
        &self,
        partition: &SlabPartition,
        layer: usize,
        owned: &[f64],
        next: &mut Slab,
    ) -> f64 {
        let plane = self.plane.plane_len();
        let offset = |l: usize| (l - 1) * plane..l * plane;
        self.update_plane(
            partition.global_z(layer),
            &owned[offset(layer - 1)],
            &owned[offset(layer)],
            &owned[offset(layer + 1)],
            next.plane_mut(layer),
        )
    }
}
