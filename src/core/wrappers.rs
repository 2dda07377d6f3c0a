//! Scalar implementations for `f64` and `faer::c64`, and vector kernels.
//!
//! This module wires the two supported scalar types into Faer's dense
//! partial-pivoting LU and provides the inner products and norms used by the
//! Anderson mixer and the convergence evaluator.
//!
//! # References
//! - [faer crate documentation](https://docs.rs/faer)

use crate::core::traits::Scalar;
use faer::linalg::solvers::{PartialPivLu, SolveCore};
use faer::{Conj, MatMut, MatRef, c64};

impl Scalar for f64 {
    type Lu = PartialPivLu<f64>;

    fn from_re(re: f64) -> Self {
        re
    }
    fn conjugate(self) -> Self {
        self
    }
    fn abs_sqr(self) -> f64 {
        self * self
    }
    fn re(self) -> f64 {
        self
    }
    fn finite(self) -> bool {
        self.is_finite()
    }

    fn lu_factor(a: MatRef<'_, f64>) -> Self::Lu {
        PartialPivLu::new(a)
    }

    fn lu_solve_in_place(lu: &Self::Lu, rhs: &mut [f64]) {
        let n = rhs.len();
        let x_mat = MatMut::from_column_major_slice_mut(rhs, n, 1);
        lu.solve_in_place_with_conj(Conj::No, x_mat);
    }
}

impl Scalar for c64 {
    type Lu = PartialPivLu<c64>;

    fn from_re(re: f64) -> Self {
        c64::new(re, 0.0)
    }
    fn conjugate(self) -> Self {
        c64::new(self.re, -self.im)
    }
    fn abs_sqr(self) -> f64 {
        self.re * self.re + self.im * self.im
    }
    fn re(self) -> f64 {
        self.re
    }
    fn finite(self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }

    fn lu_factor(a: MatRef<'_, c64>) -> Self::Lu {
        PartialPivLu::new(a)
    }

    fn lu_solve_in_place(lu: &Self::Lu, rhs: &mut [c64]) {
        let n = rhs.len();
        let x_mat = MatMut::from_column_major_slice_mut(rhs, n, 1);
        lu.solve_in_place_with_conj(Conj::No, x_mat);
    }
}

/// Hermitian inner product `Σ conj(x_k) y_k`.
pub fn dot<T: Scalar>(x: &[T], y: &[T]) -> T {
    assert_eq!(x.len(), y.len(), "Vectors must have the same length");
    x.iter()
        .zip(y.iter())
        .fold(T::zero(), |acc, (&xi, &yi)| acc + xi.conjugate() * yi)
}

/// Euclidean norm `‖x‖₂`.
pub fn norm<T: Scalar>(x: &[T]) -> f64 {
    x.iter().map(|xi| xi.abs_sqr()).sum::<f64>().sqrt()
}

/// Euclidean distance `‖x - y‖₂`.
pub fn distance<T: Scalar>(x: &[T], y: &[T]) -> f64 {
    assert_eq!(x.len(), y.len(), "Vectors must have the same length");
    x.iter()
        .zip(y.iter())
        .map(|(&xi, &yi)| (xi - yi).abs_sqr())
        .sum::<f64>()
        .sqrt()
}

/// `out ← x - y`.
pub fn sub_into<T: Scalar>(x: &[T], y: &[T], out: &mut [T]) {
    assert_eq!(x.len(), y.len(), "Vectors must have the same length");
    assert_eq!(x.len(), out.len(), "Output vector has incorrect length");
    for ((o, &xi), &yi) in out.iter_mut().zip(x).zip(y) {
        *o = xi - yi;
    }
}
