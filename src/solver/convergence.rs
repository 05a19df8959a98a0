//! Global convergence test over all ranks.

use crate::error::{JacobiError, Result};

use super::comm::Communicator;

/// Max of two deltas that keeps a NaN once one appears.
#[inline]
pub fn max_delta(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}

/// Reduces each iteration's local max delta to a global one and decides
/// whether to keep iterating.
#[derive(Debug, Clone)]
pub struct ConvergenceMonitor {
    epsilon: f64,
    history: Vec<f64>,
}

impl ConvergenceMonitor {
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            history: Vec::new(),
        }
    }

    /// Starting value for a local max-delta accumulation. Negative infinity
    /// rather than a finite sentinel, so it never reads as a measurement.
    pub fn seed() -> f64 {
        f64::NEG_INFINITY
    }

    /// Group-wide max of `local`; returns `(global, keep_iterating)`.
    ///
    /// Collective: every rank must call this once per iteration. A NaN on any
    /// rank is sent as `+inf` so every rank sees it and fails together.
    pub fn reduce_and_check(
        &mut self,
        comm: &dyn Communicator,
        local: f64,
    ) -> Result<(f64, bool)> {
        let local = if local.is_nan() { f64::INFINITY } else { local };
        let global = comm.all_reduce_max(local)?;
        if global.is_nan() || global == f64::INFINITY {
            return Err(JacobiError::Diverged(format!(
                "non-finite global delta after {} iterations",
                self.history.len() + 1
            )));
        }
        self.history.push(global);
        Ok((global, global > self.epsilon))
    }

    /// Completed reductions so far.
    pub fn iterations(&self) -> usize {
        self.history.len()
    }

    /// Global delta of every completed iteration, oldest first.
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    pub fn into_history(self) -> Vec<f64> {
        self.history
    }
}
