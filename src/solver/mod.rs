//! Picard driver, Anderson mixer, observer hooks & linear solver interface.

use crate::core::traits::FactorizationHint;
use crate::utils::convergence::SolveStats;

/// Common interface for the linear solver used inside each Picard step.
pub trait LinearSolver<M, T> {
    type Error: std::fmt::Display;

    /// Factorization reuse hint for the next `solve`. Purely an optimization:
    /// solvers that cannot exploit it may ignore it.
    fn set_factorization_hint(&mut self, hint: FactorizationHint) {
        let _ = hint;
    }

    /// Solve A·x = b, writing result into `x`.
    fn solve(&mut self, a: &M, b: &[T], x: &mut [T]) -> Result<SolveStats<f64>, Self::Error>;
}

pub mod anderson;
pub use anderson::{AndersonMixer, CoeffKind};

pub mod direct_lu;
pub use direct_lu::DenseLuSolver;

pub mod observer;
pub use observer::PicardObserver;

pub mod picard;
pub use picard::{PicardSolution, PicardSolver, StopReason, TerminationReason};
