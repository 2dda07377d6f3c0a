use thiserror::Error;

// Unified error type for picard

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PicardError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("assembly failed: {0}")]
    AssemblyFailed(String),
    #[error("linear solve failed: {0}")]
    LinearSolveFailed(String),
    #[error("maximum allowed number of Picard iterations exceeded ({iterations} iterations, last error {rel_error:e})")]
    MaxIterationsExceeded { iterations: usize, rel_error: f64 },
    #[error("dimension mismatch: expected {expected} entries, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("factorization error: {0}")]
    FactorError(String),
}
