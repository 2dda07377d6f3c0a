//! Utilities: convergence checks and the iterate history buffer.

pub mod convergence;
pub mod history;

pub use convergence::{Convergence, IncrementError, SolveStats, Verdict, relative_error};
pub use history::History;
