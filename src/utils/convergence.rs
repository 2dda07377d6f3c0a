//! Convergence tracking & tolerance checks for the fixed-point iteration.

use crate::core::traits::Scalar;
use crate::core::wrappers::{distance, norm};
use num_traits::Float;

/// Below this norm the previous iterate is treated as the zero vector.
pub const ZERO_NORM_EPS: f64 = 1e-12;

/// Size of the change between two consecutive iterates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IncrementError {
    /// `‖candidate - previous‖ / ‖previous‖`.
    Relative(f64),
    /// The previous iterate was numerically zero, so no relative error exists;
    /// carries the absolute change `‖candidate - previous‖`.
    FromZero { abs_error: f64 },
}

impl IncrementError {
    /// Reported error: the relative error, or the absolute one from a zero start.
    pub fn value(&self) -> f64 {
        match *self {
            IncrementError::Relative(e) => e,
            IncrementError::FromZero { abs_error } => abs_error,
        }
    }

    /// A step from the zero vector only counts as converged if it is itself zero.
    pub fn is_below(&self, tol: f64) -> bool {
        match *self {
            IncrementError::Relative(e) => e < tol,
            IncrementError::FromZero { abs_error } => abs_error < ZERO_NORM_EPS,
        }
    }
}

/// Relative error between the previous iterate and the candidate.
pub fn relative_error<T: Scalar>(previous: &[T], candidate: &[T]) -> IncrementError {
    let norm_prev = norm(previous);
    let abs_error = distance(candidate, previous);
    if norm_prev < ZERO_NORM_EPS {
        IncrementError::FromZero { abs_error }
    } else {
        IncrementError::Relative(abs_error / norm_prev)
    }
}

/// Stopping criteria.
#[derive(Clone, Copy, Debug)]
pub struct Convergence<T> {
    pub tol: T,
    pub max_iters: usize,
}

/// Outcome of one convergence check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Converged,
    MaxIterationsExceeded,
}

/// Stats reported by a linear solve.
#[derive(Clone, Debug)]
pub struct SolveStats<T> {
    pub iterations: usize,
    pub final_residual: T,
    pub converged: bool,
}

impl<T: Copy + Float> Convergence<T> {
    /// Verdict for iteration `i` (1-based). Convergence wins over the iteration limit.
    pub fn check(&self, err: &IncrementError, i: usize) -> Verdict {
        let tol = self.tol.to_f64().unwrap_or(0.0);
        if err.is_below(tol) {
            Verdict::Converged
        } else if i >= self.max_iters {
            Verdict::MaxIterationsExceeded
        } else {
            Verdict::Continue
        }
    }
}
