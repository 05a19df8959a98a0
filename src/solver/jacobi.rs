//! Distributed Jacobi relaxation driver.
//!
//! One call to `solve` runs a whole job on one rank:
//! partition, seed boundaries, iterate until the global max delta drops to
//! `epsilon`, then gather the field on rank 0.
//!
//! Each iteration:
//!
//! 1. post the halo exchange with both neighbors,
//! 2. update interior layers while the exchange is in flight,
//! 3. await the halos,
//! 4. update the two ghost-adjacent layers,
//! 5. swap the current and next buffers,
//! 6. reduce the local max delta across ranks.

use std::time::{Duration, Instant};

use crate::config::SolverConfig;
use crate::error::{JacobiError, Result};
use crate::stats::Stats;

use super::boundary::init_slab;
use super::collect::{gather_field, max_error};
use super::comm::Communicator;
use super::convergence::{max_delta, ConvergenceMonitor};
use super::halo::split_for_exchange;
use super::partition::SlabPartition;
use super::slab::Slab;
use super::stencil::StencilContext;

/// What a rank knows once the job is done.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub rank: usize,
    pub iterations: usize,
    /// Global max delta of the last iteration.
    pub global_delta: f64,
    /// Global max delta of every iteration, oldest first.
    pub delta_history: Vec<f64>,
    /// Wall time of the iteration loop.
    pub elapsed: Duration,
    /// Assembled `n³` field, rank 0 only.
    pub field: Option<Vec<f64>>,
    /// Max error of `field` against the exact solution, rank 0 only.
    pub max_error: Option<f64>,
}

/// Run the solver on this rank. Every rank of `comm` must call this with the
/// same config.
pub fn solve(
    config: &SolverConfig,
    comm: &dyn Communicator,
    mut stats: Option<&mut Stats>,
) -> Result<SolveOutcome> {
    let rank = comm.rank();
    let _span = tracing::info_span!("jacobi_solve", rank, n = config.n).entered();

    // Both checks are local and deterministic: on failure every rank returns
    // here and nobody reaches a collective.
    let partition = config
        .validate()
        .and_then(|()| SlabPartition::new(config.n, comm.num_ranks(), rank))
        .inspect_err(|e| {
            if comm.is_root() {
                tracing::error!("{e}");
            }
        })?;

    let init_start = Instant::now();
    let ctx = StencilContext::new(config);
    let mut current = init_slab(config, &partition);
    let mut next = current.clone();
    let mut monitor = ConvergenceMonitor::new(config.epsilon);
    if let Some(s) = stats.as_deref_mut() {
        s.rank = rank;
        s.add_phase("init", init_start.elapsed());
    }
    tracing::debug!(
        local_height = partition.local_height,
        z_offset = partition.z_offset,
        "slab initialized"
    );

    let start = Instant::now();
    let global_delta = loop {
        let local = relax(
            &ctx,
            comm,
            &partition,
            &mut current,
            &mut next,
            stats.as_deref_mut(),
        )?;
        std::mem::swap(&mut current, &mut next);

        let reduce_start = stats.is_some().then(Instant::now);
        let (global, keep_going) = monitor.reduce_and_check(comm, local)?;
        if let (Some(s), Some(t)) = (stats.as_deref_mut(), reduce_start) {
            s.reduction += t.elapsed();
        }
        tracing::debug!(iteration = monitor.iterations(), local, global, "sweep");

        if !keep_going {
            break global;
        }
        if let Some(cap) = config.max_iterations {
            if monitor.iterations() >= cap {
                return Err(JacobiError::NotConverged {
                    iterations: cap,
                    delta: global,
                });
            }
        }
    };
    let elapsed = start.elapsed();
    let iterations = monitor.iterations();
    tracing::info!(iterations, global_delta, elapsed_s = elapsed.as_secs_f64(), "converged");

    let gather_start = Instant::now();
    let field = gather_field(comm, config, &current)?;
    let max_error = field.as_deref().map(|f| max_error(config, f));

    if let Some(s) = stats.as_deref_mut() {
        s.add_phase("iterate", elapsed);
        s.add_phase("gather", gather_start.elapsed());
        s.iterations = iterations;
        s.final_delta = Some(global_delta);
    }

    Ok(SolveOutcome {
        rank,
        iterations,
        global_delta,
        delta_history: monitor.into_history(),
        elapsed,
        field,
        max_error,
    })
}

/// One Jacobi sweep from `current` into `next`; returns the local max delta.
fn relax(
    ctx: &StencilContext<'_>,
    comm: &dyn Communicator,
    partition: &SlabPartition,
    current: &mut Slab,
    next: &mut Slab,
    mut stats: Option<&mut Stats>,
) -> Result<f64> {
    let mut local = ConvergenceMonitor::seed();

    let exchange_start = stats.is_some().then(Instant::now);
    {
        let (planes, owned) = split_for_exchange(current, partition);
        comm.exchange_halos(planes, &mut || {
            for layer in partition.interior_layers() {
                let delta = ctx.update_interior_layer(partition, layer, owned, next);
                local = max_delta(local, delta);
            }
        })?;
    }
    if let (Some(s), Some(t)) = (stats.as_deref_mut(), exchange_start) {
        s.exchange_and_interior += t.elapsed();
    }

    let boundary_start = stats.is_some().then(Instant::now);
    for layer in partition.boundary_adjacent_layers() {
        let delta = ctx.update_layer(partition, layer, current, next);
        local = max_delta(local, delta);
    }
    if let (Some(s), Some(t)) = (stats, boundary_start) {
        s.boundary_update += t.elapsed();
    }

    Ok(local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::comm::SingleProcessComm;

    #[test]
    fn single_rank_converges_to_exact_solution() {
        let config = SolverConfig {
            epsilon: 1e-9,
            ..SolverConfig::with_grid_size(8)
        };
        let outcome = solve(&config, &SingleProcessComm, None).unwrap();
        assert!(outcome.iterations > 0);
        assert!(outcome.global_delta <= 1e-9);
        assert!(outcome.max_error.unwrap() < 1e-6);
        assert_eq!(outcome.field.unwrap().len(), 512);
    }

    #[test]
    fn stats_are_filled_when_requested() {
        let config = SolverConfig::with_grid_size(6);
        let mut stats = Stats::new();
        let outcome = solve(&config, &SingleProcessComm, Some(&mut stats)).unwrap();
        assert_eq!(stats.iterations, outcome.iterations);
        let names: Vec<_> = stats.phases().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["init", "iterate", "gather"]);
        assert_eq!(stats.final_delta, Some(outcome.global_delta));
    }

    #[test]
    fn iteration_cap_reports_not_converged() {
        let config = SolverConfig {
            penalty: 0.0,
            epsilon: 1e-12,
            max_iterations: Some(2),
            ..SolverConfig::with_grid_size(12)
        };
        let err = solve(&config, &SingleProcessComm, None).unwrap_err();
        assert!(matches!(err, JacobiError::NotConverged { iterations: 2, .. }));
    }

    #[test]
    fn invalid_config_fails_before_iterating() {
        let config = SolverConfig::with_grid_size(2);
        assert!(matches!(
            solve(&config, &SingleProcessComm, None),
            Err(JacobiError::Config(_))
        ));
    }
}
