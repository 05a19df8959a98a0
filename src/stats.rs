//! Performance statistics collection for `--stats` output.

use std::time::{Duration, Instant};

/// Collects performance counters and phase timings for one rank.
///
/// Created when `--stats` is passed, threaded as `Option<&mut Stats>`.
/// Zero cost when `None`: no timing calls, no counter increments.
pub struct Stats {
    total_start: Instant,
    phases: Vec<(&'static str, Duration)>,
    pub rank: usize,
    pub iterations: usize,
    // Per-iteration accumulators
    pub exchange_and_interior: Duration,
    pub boundary_update: Duration,
    pub reduction: Duration,
    pub final_delta: Option<f64>,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Self {
            total_start: Instant::now(),
            phases: Vec::new(),
            rank: 0,
            iterations: 0,
            exchange_and_interior: Duration::ZERO,
            boundary_update: Duration::ZERO,
            reduction: Duration::ZERO,
            final_delta: None,
        }
    }

    /// Record a completed phase with its duration.
    pub fn add_phase(&mut self, name: &'static str, duration: Duration) {
        self.phases.push((name, duration));
    }

    pub fn phases(&self) -> &[(&'static str, Duration)] {
        &self.phases
    }

    /// Print the stats table to stderr.
    pub fn display(&self) {
        let total = self.total_start.elapsed();
        eprintln!();
        eprintln!("=== Jacobi3d Performance Stats (rank {}) ===", self.rank);

        for (name, dur) in &self.phases {
            eprintln!("  {:<24} {:>8.3}s", name, dur.as_secs_f64());
        }

        if self.iterations > 0 {
            eprintln!("  Iterations:             {}", self.iterations);
            eprintln!("    Halo + interior:      {:>8.3}s", self.exchange_and_interior.as_secs_f64());
            eprintln!("    Boundary layers:      {:>8.3}s", self.boundary_update.as_secs_f64());
            eprintln!("    Max reduction:        {:>8.3}s", self.reduction.as_secs_f64());
            let per_iter = self.exchange_and_interior + self.boundary_update + self.reduction;
            eprintln!(
                "    Per iteration:        {:>8.3}ms",
                per_iter.as_secs_f64() * 1e3 / self.iterations as f64
            );
        }

        if let Some(delta) = self.final_delta {
            eprintln!("  Final global delta:     {:e}", delta);
        }

        eprintln!("  ─────────────────────────────────");
        eprintln!("  Total:                  {:>8.3}s", total.as_secs_f64());
    }
}
