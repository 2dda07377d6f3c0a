//! picard: fixed-point (Picard) nonlinear solver with Anderson acceleration over Faer
//!
//! This crate drives a sequence of linearized solves `A(x_k) x_{k+1} = b(x_k)` toward
//! a fixed point. Assembly of the linearized system and the linear solve itself are
//! collaborators plugged in through the [`Assembler`] and [`LinearSolver`] traits;
//! a dense LU solver with factorization reuse is bundled for small and medium problems.

pub mod config;
pub mod core;
pub mod error;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use config::*;
pub use crate::core::*;
pub use error::*;
pub use solver::*;
pub use utils::*;

pub use solver::picard::ConvergenceState;
