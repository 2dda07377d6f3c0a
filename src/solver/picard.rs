//! Picard (fixed-point) iteration driver with optional Anderson acceleration.
//!
//! Each iteration assembles the linearized system `A(x_k) x = b(x_k)` at the
//! current iterate, solves it, and takes the solution as the next iterate
//! (the solve output replaces the iterate; it is not a correction). With
//! Anderson acceleration on, the new iterate is pushed into a bounded history
//! and, once `M` vectors are stored, replaced by their Anderson mix.
//!
//! The iteration stops when the relative change between consecutive iterates
//! drops below `tol`, or after `max_iter` iterations. The latter is not an
//! error: the solve returns the last iterate tagged with
//! [`TerminationReason::MaxIterationsExceeded`]. A failed linear solve aborts
//! with [`PicardError::LinearSolveFailed`], and so does an inner solver that
//! reports it did not converge. A failed assembly aborts with the assembler's
//! error. Either way the iterate the failed step started from stays available
//! through [`PicardSolver::last_solution`].
//!
//! A [`PicardObserver`] attached with [`PicardSolver::with_observer`] is called
//! at initialization, around every step, with every assembled system, and
//! when the solve stops.
//!
//! # Factorization reuse
//! The first iteration always factorizes from scratch. Later iterations reuse
//! the complete factorization when the Jacobian is declared constant (only the
//! residual is reassembled) and otherwise reuse ordering and scaling. The hint
//! never changes the iterates, only the work done to compute them.

use crate::config::PicardOptions;
use crate::core::traits::{Assembler, FactorizationHint, Scalar};
use crate::error::PicardError;
use crate::solver::LinearSolver;
use crate::solver::anderson::AndersonMixer;
use crate::solver::observer::PicardObserver;
use crate::utils::convergence::{Convergence, IncrementError, Verdict, relative_error};
use crate::utils::history::History;
use std::time::{Duration, Instant};

/// Why a solve that ran to a regular stop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    Converged,
    MaxIterationsExceeded,
}

/// Why the last solve stopped, including the stops reported as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Converged,
    MaxIterationsExceeded,
    LinearSolveFailed,
    AssemblyFailed,
}

impl From<TerminationReason> for StopReason {
    fn from(reason: TerminationReason) -> Self {
        match reason {
            TerminationReason::Converged => StopReason::Converged,
            TerminationReason::MaxIterationsExceeded => StopReason::MaxIterationsExceeded,
        }
    }
}

/// Progress of the current (or last) solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceState {
    /// Current iteration index (1-based; 0 before the first iteration)
    pub iteration: usize,
    /// Error reported by the last completed iteration
    pub rel_error: f64,
    /// Set once the solve has stopped
    pub reason: Option<StopReason>,
}

impl Default for ConvergenceState {
    fn default() -> Self {
        Self { iteration: 0, rel_error: f64::INFINITY, reason: None }
    }
}

/// Result of a Picard solve that ran to a regular stop.
#[derive(Debug, Clone)]
pub struct PicardSolution<T> {
    /// Last computed iterate
    pub x: Vec<T>,
    /// Number of iterations performed
    pub iterations: usize,
    /// Error of the last iteration (absolute if it started from the zero vector)
    pub rel_error: f64,
    pub reason: TerminationReason,
    /// Error of every iteration, in order
    pub error_history: Vec<f64>,
    /// Wall-clock duration of the solve
    pub elapsed: Duration,
}

impl<T> PicardSolution<T> {
    pub fn converged(&self) -> bool {
        self.reason == TerminationReason::Converged
    }

    /// The converged iterate, or the termination reason as an error.
    pub fn into_result(self) -> Result<Vec<T>, PicardError> {
        match self.reason {
            TerminationReason::Converged => Ok(self.x),
            TerminationReason::MaxIterationsExceeded => Err(PicardError::MaxIterationsExceeded {
                iterations: self.iterations,
                rel_error: self.rel_error,
            }),
        }
    }
}

/// Hint for iteration `it` (1-based).
pub fn factorization_hint(it: usize, constant_jacobian: bool) -> FactorizationHint {
    if it <= 1 {
        FactorizationHint::FromScratch
    } else if constant_jacobian {
        FactorizationHint::ReuseFull
    } else {
        FactorizationHint::ReuseOrderingAndScaling
    }
}

struct Acceleration<T: Scalar> {
    history: History<T>,
    mixer: AndersonMixer<T>,
}

// Everything one solve allocates. Dropped on every exit path of `solve`.
struct Workspace<T: Scalar, M> {
    previous: Vec<T>,
    candidate: Vec<T>,
    jacobian: M,
    residual: Vec<T>,
    acceleration: Option<Acceleration<T>>,
}

/// Fixed-point solver over an [`Assembler`] and a [`LinearSolver`].
pub struct PicardSolver<T, A, S>
where
    T: Scalar,
    A: Assembler<T>,
    S: LinearSolver<A::Matrix, T>,
{
    assembler: A,
    linear_solver: S,
    options: PicardOptions,
    sln_vector: Option<Vec<T>>,
    state: ConvergenceState,
    observer: Option<Box<dyn PicardObserver<T, A::Matrix>>>,
}

impl<T, A, S> PicardSolver<T, A, S>
where
    T: Scalar,
    A: Assembler<T>,
    S: LinearSolver<A::Matrix, T>,
{
    /// Create a solver; fails if `options` do not validate.
    pub fn new(assembler: A, linear_solver: S, options: PicardOptions) -> Result<Self, PicardError> {
        options.validate()?;
        Ok(Self {
            assembler,
            linear_solver,
            options,
            sln_vector: None,
            state: ConvergenceState::default(),
            observer: None,
        })
    }

    /// Attach an observer called at initialization, around every step and on finish.
    pub fn with_observer<O>(mut self, observer: O) -> Self
    where
        O: PicardObserver<T, A::Matrix> + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn set_observer(&mut self, observer: Option<Box<dyn PicardObserver<T, A::Matrix>>>) {
        self.observer = observer;
    }

    pub fn options(&self) -> &PicardOptions {
        &self.options
    }

    /// Replace the options used by subsequent solves.
    pub fn set_options(&mut self, options: PicardOptions) -> Result<(), PicardError> {
        options.validate()?;
        self.options = options;
        Ok(())
    }

    pub fn assembler(&self) -> &A {
        &self.assembler
    }

    pub fn assembler_mut(&mut self) -> &mut A {
        &mut self.assembler
    }

    pub fn linear_solver(&self) -> &S {
        &self.linear_solver
    }

    pub fn linear_solver_mut(&mut self) -> &mut S {
        &mut self.linear_solver
    }

    /// Last iterate computed by any solve, including one that hit `max_iter`
    /// or failed in the linear solver.
    pub fn last_solution(&self) -> Option<&[T]> {
        self.sln_vector.as_deref()
    }

    pub fn state(&self) -> &ConvergenceState {
        &self.state
    }

    pub fn into_parts(self) -> (A, S) {
        (self.assembler, self.linear_solver)
    }

    /// Run the Picard iteration from `initial_guess` (zero vector if `None`).
    pub fn solve(&mut self, initial_guess: Option<&[T]>) -> Result<PicardSolution<T>, PicardError> {
        let opts = self.options;
        let ndof = self.assembler.ndof();
        let start = Instant::now();
        self.state = ConvergenceState::default();

        let mut ws = self.init_workspace(&opts, ndof, initial_guess)?;
        if let Some(obs) = self.observer.as_mut() {
            obs.on_initialization(&ws.previous);
        }
        let conv = Convergence { tol: opts.tol, max_iters: opts.max_iter };
        let mut error_history = Vec::new();
        let mut it = 1;

        loop {
            self.state.iteration = it;
            if let Some(obs) = self.observer.as_mut() {
                obs.on_step_begin(it);
            }
            let hint = factorization_hint(it, opts.constant_jacobian);
            if hint == FactorizationHint::ReuseFull {
                log::debug!("Picard: reusing jacobian.");
            }

            if let Err(e) = self
                .assembler
                .assemble(&ws.previous, hint, &mut ws.jacobian, &mut ws.residual)
            {
                log::warn!("Picard: assembly failed in iteration {}: {}", it, e);
                return Err(self.abort(StopReason::AssemblyFailed, ws.previous, e));
            }
            if let Some(obs) = self.observer.as_mut() {
                obs.on_system_assembled(it, &ws.jacobian, &ws.residual);
            }

            self.linear_solver.set_factorization_hint(hint);
            let failure = match self
                .linear_solver
                .solve(&ws.jacobian, &ws.residual, &mut ws.candidate)
            {
                Ok(stats) if stats.converged => None,
                Ok(stats) => Some(format!(
                    "linear solver did not converge ({} iterations, residual {:e})",
                    stats.iterations, stats.final_residual
                )),
                Err(e) => Some(e.to_string()),
            };
            if let Some(msg) = failure {
                log::warn!("Picard: linear solve failed in iteration {}: {}", it, msg);
                let err = PicardError::LinearSolveFailed(msg);
                return Err(self.abort(StopReason::LinearSolveFailed, ws.previous, err));
            }

            if let Some(acc) = ws.acceleration.as_mut() {
                acc.history.push(&ws.candidate);
                if acc.history.is_full() {
                    acc.mixer.apply(&acc.history, &mut ws.candidate);
                }
            }

            let err = relative_error(&ws.previous, &ws.candidate);
            match err {
                IncrementError::FromZero { .. } => {
                    log::info!("Picard: iteration {}, nDOFs {}, starting from zero vector.", it, ndof)
                }
                IncrementError::Relative(e) => {
                    log::info!("Picard: iteration {}, nDOFs {}, relative error {}%", it, ndof, e * 100.0)
                }
            }
            self.state.rel_error = err.value();
            error_history.push(err.value());
            if let Some(obs) = self.observer.as_mut() {
                obs.on_step_end(it, &ws.candidate, err.value());
            }

            let reason = match conv.check(&err, it) {
                Verdict::Continue => {
                    std::mem::swap(&mut ws.previous, &mut ws.candidate);
                    it += 1;
                    continue;
                }
                Verdict::Converged => TerminationReason::Converged,
                Verdict::MaxIterationsExceeded => {
                    log::warn!("Picard: maximum allowed number of Picard iterations exceeded.");
                    TerminationReason::MaxIterationsExceeded
                }
            };

            let elapsed = start.elapsed();
            log::info!("Picard: solution duration: {:.6} s.", elapsed.as_secs_f64());
            self.state.reason = Some(reason.into());
            if let Some(obs) = self.observer.as_mut() {
                obs.on_finish(reason.into());
            }
            let Workspace { candidate, .. } = ws;
            self.sln_vector = Some(candidate.clone());
            return Ok(PicardSolution {
                x: candidate,
                iterations: it,
                rel_error: err.value(),
                reason,
                error_history,
                elapsed,
            });
        }
    }

    // Record a failed stop; `last` is the iterate the failed step started from.
    fn abort(&mut self, reason: StopReason, last: Vec<T>, err: PicardError) -> PicardError {
        self.state.reason = Some(reason);
        self.sln_vector = Some(last);
        if let Some(obs) = self.observer.as_mut() {
            obs.on_finish(reason);
        }
        err
    }

    fn init_workspace(
        &self,
        opts: &PicardOptions,
        ndof: usize,
        initial_guess: Option<&[T]>,
    ) -> Result<Workspace<T, A::Matrix>, PicardError> {
        let previous = match initial_guess {
            Some(x0) if x0.len() != ndof => {
                return Err(PicardError::DimensionMismatch { expected: ndof, found: x0.len() });
            }
            Some(x0) => x0.to_vec(),
            None => vec![T::zero(); ndof],
        };

        let acceleration = if opts.anderson {
            let mut history = History::new(opts.num_last_vectors_used, ndof);
            history.push(&previous);
            Some(Acceleration {
                history,
                mixer: AndersonMixer::new(opts.num_last_vectors_used, opts.anderson_beta, ndof),
            })
        } else {
            None
        };

        Ok(Workspace {
            previous,
            candidate: vec![T::zero(); ndof],
            jacobian: self.assembler.new_jacobian(),
            residual: vec![T::zero(); ndof],
            acceleration,
        })
    }
}
