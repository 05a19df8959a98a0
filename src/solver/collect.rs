//! Assembly of the converged field on rank 0 and its error against the
//! exact solution.

use crate::config::SolverConfig;
use crate::error::{JacobiError, Result};

use super::boundary::phi;
use super::comm::Communicator;
use super::slab::{Slab, SlabShape};

/// Gather every rank's owned layers onto rank 0 in rank order.
///
/// Collective. Returns the `n³` field (Z outermost) on rank 0 and `None`
/// elsewhere.
pub fn gather_field(
    comm: &dyn Communicator,
    config: &SolverConfig,
    slab: &Slab,
) -> Result<Option<Vec<f64>>> {
    let gathered = comm.gather_to_root(slab.owned())?;
    if let Some(field) = &gathered {
        let expected = SlabShape::new(config.n, config.n).len();
        if field.len() != expected {
            return Err(JacobiError::Comm(format!(
                "gathered {} values, expected {expected}",
                field.len()
            )));
        }
    }
    Ok(gathered)
}

/// Largest `|field - phi|` over every grid point.
pub fn max_error(config: &SolverConfig, field: &[f64]) -> f64 {
    let n = config.n;
    let shape = SlabShape::new(n, n);
    let mut worst = 0.0f64;
    for k in 0..n {
        let z = config.z(k as isize);
        for i in 0..n {
            let x = config.x(i);
            for j in 0..n {
                let exact = phi(x, config.y(j), z);
                worst = worst.max((field[shape.index(k, i, j)] - exact).abs());
            }
        }
    }
    worst
}
