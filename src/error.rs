use thiserror::Error;

#[derive(Debug, Error)]
pub enum JacobiError {
    #[error("Partition error: {0}")]
    Partition(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Solve diverged: {0}")]
    Diverged(String),

    #[error("No convergence after {iterations} iterations (delta = {delta:e})")]
    NotConverged { iterations: usize, delta: f64 },

    #[error("Communication error: {0}")]
    Comm(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, JacobiError>;
