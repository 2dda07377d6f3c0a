//! Per-iteration hooks into the Picard driver.
//!
//! Every method has a no-op default, so an observer only implements the events
//! it cares about. Typical uses are progress reporting, dumping the assembled
//! matrix and residual of selected iterations, or collecting iterates for
//! post-processing. Observers see the iteration but cannot change it.

use crate::solver::picard::StopReason;

/// Callbacks invoked by [`PicardSolver`](crate::solver::picard::PicardSolver).
///
/// Order per solve: `on_initialization`, then per iteration `on_step_begin`,
/// `on_system_assembled`, `on_step_end`, and finally `on_finish`. A failed
/// assembly or linear solve skips the rest of its iteration and goes straight
/// to `on_finish`.
pub trait PicardObserver<T, M> {
    /// Called once the workspace is set up, with the initial iterate.
    fn on_initialization(&mut self, initial: &[T]) {
        let _ = initial;
    }

    fn on_step_begin(&mut self, iteration: usize) {
        let _ = iteration;
    }

    /// The linearized system of `iteration`, before it is solved. Under full
    /// factorization reuse `jacobian` is the matrix assembled in iteration 1.
    fn on_system_assembled(&mut self, iteration: usize, jacobian: &M, residual: &[T]) {
        let _ = (iteration, jacobian, residual);
    }

    /// The accepted iterate of `iteration` (after mixing) and its error.
    fn on_step_end(&mut self, iteration: usize, x: &[T], error: f64) {
        let _ = (iteration, x, error);
    }

    fn on_finish(&mut self, reason: StopReason) {
        let _ = reason;
    }
}
