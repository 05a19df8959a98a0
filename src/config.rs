//! Solver configuration.
//!
//! One immutable `SolverConfig` is built at startup (defaults, optionally a
//! TOML file, then CLI overrides) and passed by reference to every component.

use std::path::Path;

use serde_derive::Deserialize;

use crate::error::{JacobiError, Result};

/// Default grid points per axis.
pub const DEFAULT_GRID_SIZE: usize = 320;
/// Penalty constant `a` of the reaction term.
pub const DEFAULT_PENALTY: f64 = 1.0e6;
/// Global max-delta threshold below which the iteration stops.
pub const DEFAULT_EPSILON: f64 = 1.0e-7;

/// Physical problem and stopping criterion.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Points per axis (N).
    pub n: usize,
    /// Domain extents `[Dx, Dy, Dz]`.
    pub extent: [f64; 3],
    /// Domain origin `[x0, y0, z0]`.
    pub origin: [f64; 3],
    /// Penalty constant `a`.
    pub penalty: f64,
    /// Convergence threshold on the global max delta.
    pub epsilon: f64,
    /// Optional iteration cap; `None` iterates until convergence.
    pub max_iterations: Option<usize>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            n: DEFAULT_GRID_SIZE,
            extent: [2.0, 2.0, 2.0],
            origin: [-1.0, -1.0, -1.0],
            penalty: DEFAULT_PENALTY,
            epsilon: DEFAULT_EPSILON,
            max_iterations: None,
        }
    }
}

/// Grid steps derived from a config: `H = D / (N - 1)` per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Steps {
    pub hx: f64,
    pub hy: f64,
    pub hz: f64,
}

impl Steps {
    pub fn hx2(&self) -> f64 {
        self.hx * self.hx
    }

    pub fn hy2(&self) -> f64 {
        self.hy * self.hy
    }

    pub fn hz2(&self) -> f64 {
        self.hz * self.hz
    }
}

/// On-disk form of the config. Every field is optional; missing fields
/// keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub n: Option<usize>,
    pub extent: Option<[f64; 3]>,
    pub origin: Option<[f64; 3]>,
    pub penalty: Option<f64>,
    pub epsilon: Option<f64>,
    pub max_iterations: Option<usize>,
}

impl ConfigFile {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| JacobiError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Overlay the values present in this file onto `base`.
    pub fn apply(self, mut base: SolverConfig) -> SolverConfig {
        if let Some(n) = self.n {
            base.n = n;
        }
        if let Some(extent) = self.extent {
            base.extent = extent;
        }
        if let Some(origin) = self.origin {
            base.origin = origin;
        }
        if let Some(penalty) = self.penalty {
            base.penalty = penalty;
        }
        if let Some(epsilon) = self.epsilon {
            base.epsilon = epsilon;
        }
        if self.max_iterations.is_some() {
            base.max_iterations = self.max_iterations;
        }
        base
    }
}

impl SolverConfig {
    /// Config with the given grid size and default physics.
    pub fn with_grid_size(n: usize) -> Self {
        Self {
            n,
            ..Self::default()
        }
    }

    /// Reject values the solver cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.n < 3 {
            return Err(JacobiError::Config(format!(
                "grid size must be at least 3, got {}",
                self.n
            )));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(JacobiError::Config(format!(
                "epsilon must be a positive finite number, got {}",
                self.epsilon
            )));
        }
        if !(self.penalty.is_finite() && self.penalty >= 0.0) {
            return Err(JacobiError::Config(format!(
                "penalty must be a non-negative finite number, got {}",
                self.penalty
            )));
        }
        if self.extent.iter().any(|d| !(d.is_finite() && *d > 0.0)) {
            return Err(JacobiError::Config(format!(
                "domain extents must be positive, got {:?}",
                self.extent
            )));
        }
        if self.max_iterations == Some(0) {
            return Err(JacobiError::Config("max_iterations must be positive".into()));
        }
        if self.origin.iter().any(|o| !o.is_finite()) {
            return Err(JacobiError::Config(format!(
                "domain origin must be finite, got {:?}",
                self.origin
            )));
        }
        Ok(())
    }

    pub fn steps(&self) -> Steps {
        let cells = (self.n - 1) as f64;
        Steps {
            hx: self.extent[0] / cells,
            hy: self.extent[1] / cells,
            hz: self.extent[2] / cells,
        }
    }

    /// Physical X coordinate of grid index `i`.
    pub fn x(&self, i: usize) -> f64 {
        self.origin[0] + i as f64 * self.steps().hx
    }

    /// Physical Y coordinate of grid index `j`.
    pub fn y(&self, j: usize) -> f64 {
        self.origin[1] + j as f64 * self.steps().hy
    }

    /// Physical Z coordinate of global layer index `z`. Ghost layers outside
    /// the domain have `z == -1` or `z == n`.
    pub fn z(&self, z: isize) -> f64 {
        self.origin[2] + z as f64 * self.steps().hz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_lab_constants() {
        let cfg = SolverConfig::default();
        assert_eq!(cfg.n, 320);
        assert_eq!(cfg.penalty, 1.0e6);
        assert_eq!(cfg.epsilon, 1.0e-7);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn steps_span_the_domain() {
        let cfg = SolverConfig::with_grid_size(5);
        let steps = cfg.steps();
        assert_eq!(steps.hx, 0.5);
        assert_eq!(cfg.x(0), -1.0);
        assert_eq!(cfg.x(4), 1.0);
        assert_eq!(cfg.z(-1), -1.5);
    }

    #[test]
    fn validate_rejects_tiny_grid() {
        let cfg = SolverConfig::with_grid_size(2);
        assert!(matches!(cfg.validate(), Err(JacobiError::Config(_))));
    }

    #[test]
    fn validate_rejects_non_positive_epsilon() {
        let cfg = SolverConfig {
            epsilon: 0.0,
            ..SolverConfig::with_grid_size(8)
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn config_file_overrides_present_fields_only() {
        let file = ConfigFile::parse("n = 16\nepsilon = 1e-6\n").unwrap();
        let cfg = file.apply(SolverConfig::default());
        assert_eq!(cfg.n, 16);
        assert_eq!(cfg.epsilon, 1e-6);
        assert_eq!(cfg.penalty, DEFAULT_PENALTY);
        assert_eq!(cfg.max_iterations, None);
    }

    #[test]
    fn config_file_rejects_unknown_keys() {
        assert!(ConfigFile::parse("grid = 16\n").is_err());
    }
}
