//! Core traits for picard: scalar abstraction and the assembler seam.

use crate::error::PicardError;
use faer::MatRef;
use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Factorization reuse hint handed to the linear solver (and the assembler)
/// before each linearized solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorizationHint {
    /// Factorize the matrix from scratch.
    FromScratch,
    /// The matrix changed but keeps its structure: ordering and scaling may be reused.
    ReuseOrderingAndScaling,
    /// The matrix is unchanged: the previous factorization may be reused as is.
    ReuseFull,
}

/// Scalar type of the unknowns (real or complex).
///
/// Norms and errors are always measured in `f64`. The dense LU used by the
/// Anderson mixer and by [`crate::solver::DenseLuSolver`] is delegated to Faer
/// through `lu_factor` / `lu_solve_in_place`.
pub trait Scalar:
    Copy
    + Debug
    + PartialEq
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    /// Cached LU factorization with partial pivoting.
    type Lu;

    /// Embed a real number.
    fn from_re(re: f64) -> Self;
    /// Additive identity.
    fn zero() -> Self {
        Self::from_re(0.0)
    }
    /// Complex conjugate (identity for reals).
    fn conjugate(self) -> Self;
    /// Squared modulus |z|².
    fn abs_sqr(self) -> f64;
    /// Real part.
    fn re(self) -> f64;
    /// True when every component is finite.
    fn finite(self) -> bool;

    /// Factorize a square matrix.
    fn lu_factor(a: MatRef<'_, Self>) -> Self::Lu;
    /// Overwrite `rhs` with the solution of `A x = rhs`.
    fn lu_solve_in_place(lu: &Self::Lu, rhs: &mut [Self]);
}

/// Builds the linearized system at the current iterate.
///
/// For a Picard scheme `A(x_k) x_{k+1} = b(x_k)` the "jacobian" is `A(x_k)` and
/// the "residual" is the right-hand side `b(x_k)`; the solution of the linear
/// system is the next iterate.
pub trait Assembler<T: Scalar> {
    /// System matrix type consumed by the linear solver.
    type Matrix;

    /// Number of degrees of freedom.
    fn ndof(&self) -> usize;

    /// Fresh matrix storage, used once per solve before the first assembly.
    fn new_jacobian(&self) -> Self::Matrix;

    /// Assemble at `x`. Under [`FactorizationHint::ReuseFull`] the assembler may
    /// leave `jacobian` untouched and only rebuild `residual`.
    fn assemble(
        &mut self,
        x: &[T],
        hint: FactorizationHint,
        jacobian: &mut Self::Matrix,
        residual: &mut [T],
    ) -> Result<(), PicardError>;
}
