//! Anderson mixing of the most recent Picard iterates.
//!
//! Given the `M` stored iterates `v_0 … v_{M-1}` (oldest first), the successive
//! differences `r_i = v_{i+1} - v_i` play the role of fixed-point residuals. The
//! mixer looks for coefficients `c_1 … c_{M-1}` summing to one that minimise
//! `‖Σ c_j r_{j-1}‖₂`. Writing `c_i = x_i` for `i < n = M-2` and
//! `c_n = 1 - Σ x_i`, the problem becomes the small least-squares system
//!
//! ```text
//! min ‖ r_n - Σ x_i (r_n - r_i) ‖₂
//! ```
//!
//! whose normal equations `(DᴴD) x = Dᴴ r_n` are solved with Faer's LU with
//! partial pivoting. Inner products are conjugated, so complex problems get a
//! true complex least-squares fit.
//!
//! The differences `d_i = r_n - r_i` are often linearly dependent: near
//! convergence, and always when `n` exceeds the number of unknowns. Before the
//! solve they are orthogonalized newest first (modified Gram-Schmidt), and a
//! difference whose orthogonal part vanishes is dropped with coefficient zero.
//! The normal equations are then solved over the remaining differences only.
//!
//! The mixed iterate combines extrapolation with relaxation by `beta`:
//!
//! ```text
//! mixed = Σ_{j=1}^{M-1} c_j v_j - (1 - beta) c_j (v_j - v_{j-1})
//! ```
//!
//! # References
//! - Walker, H. F. & Ni, P. (2011). Anderson acceleration for fixed-point iterations. SIAM J. Numer. Anal.

use crate::core::traits::Scalar;
use crate::core::wrappers::{dot, norm, sub_into};
use crate::utils::history::History;
use faer::MatRef;

/// Squared norm of a difference, relative to `‖r_n‖²`, below which the
/// difference counts as zero.
const SINGULAR_RTOL: f64 = 1e-14;

/// Squared norm of the part of a difference orthogonal to the kept ones,
/// relative to its own squared norm, below which it counts as dependent.
const DEPENDENCE_RTOL: f64 = 1e-12;

/// How the last set of coefficients was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoeffKind {
    /// `M = 2`: the single coefficient is 1.
    Unit,
    /// Solved from the normal equations.
    LeastSquares,
    /// Some differences were linearly dependent and got coefficient zero; the
    /// normal equations were solved over the others.
    RankDeficient,
    /// No usable difference was left; the newest iterate gets weight 1.
    Degenerate,
}

/// Anderson mixer with scratch space for one solve.
pub struct AndersonMixer<T> {
    depth: usize,
    beta: f64,
    coeffs: Vec<T>,
    residuals: Vec<Vec<T>>,
    diffs: Vec<Vec<T>>,
    // orthonormal basis of the kept differences
    basis: Vec<Vec<T>>,
    // indices of the kept differences, ascending
    active: Vec<usize>,
    // reduced normal equations, column-major
    gram: Vec<T>,
    rhs: Vec<T>,
}

impl<T: Scalar> AndersonMixer<T> {
    /// Mixer over `depth` iterates of length `ndof`, relaxation `beta`.
    ///
    /// # Panics
    /// Panics if `depth < 2`.
    pub fn new(depth: usize, beta: f64, ndof: usize) -> Self {
        assert!(
            depth >= 2,
            "Anderson acceleration makes sense only if at least two last iterations are used"
        );
        let n = depth - 2;
        AndersonMixer {
            depth,
            beta,
            coeffs: vec![T::zero(); depth - 1],
            residuals: (0..=n).map(|_| vec![T::zero(); ndof]).collect(),
            diffs: (0..n).map(|_| vec![T::zero(); ndof]).collect(),
            basis: (0..n).map(|_| vec![T::zero(); ndof]).collect(),
            active: Vec::with_capacity(n),
            gram: vec![T::zero(); n * n],
            rhs: vec![T::zero(); n],
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Coefficients `c_1 … c_{M-1}` from the last call to `compute_coefficients`.
    pub fn coefficients(&self) -> &[T] {
        &self.coeffs
    }

    /// Recompute the coefficients from a full history.
    ///
    /// # Panics
    /// Panics if the history does not hold exactly `depth` vectors.
    pub fn compute_coefficients(&mut self, history: &History<T>) -> CoeffKind {
        assert_eq!(history.len(), self.depth, "Anderson: history is not full");

        if self.depth == 2 {
            self.coeffs[0] = T::from_re(1.0);
            return CoeffKind::Unit;
        }

        let n = self.depth - 2;
        for i in 0..=n {
            sub_into(&history[i + 1], &history[i], &mut self.residuals[i]);
        }
        let (older, newest) = self.residuals.split_at(n);
        let r_n = &newest[0];
        for (d, r_i) in self.diffs.iter_mut().zip(older) {
            sub_into(r_n, r_i, d);
        }

        let r_n_sqr = norm(r_n).powi(2);
        independent_differences(&self.diffs, &mut self.basis, &mut self.active, r_n_sqr);

        let k = self.active.len();
        let mut kind = if k == n { CoeffKind::LeastSquares } else { CoeffKind::RankDeficient };
        self.coeffs.iter_mut().for_each(|c| *c = T::zero());
        if k == 0 {
            kind = CoeffKind::Degenerate;
        } else {
            // Hermitian normal matrix over the kept differences.
            for (col, &j) in self.active.iter().enumerate() {
                for (row, &i) in self.active.iter().enumerate() {
                    self.gram[col * k + row] = dot(&self.diffs[i], &self.diffs[j]);
                }
                self.rhs[col] = dot(&self.diffs[j], r_n);
            }
            let lu = T::lu_factor(MatRef::from_column_major_slice(&self.gram[..k * k], k, k));
            let x = &mut self.rhs[..k];
            T::lu_solve_in_place(&lu, x);
            if x.iter().all(|v| v.finite()) {
                for (&i, &v) in self.active.iter().zip(x.iter()) {
                    self.coeffs[i] = v;
                }
            } else {
                kind = CoeffKind::Degenerate;
            }
        }
        match kind {
            CoeffKind::Degenerate => {
                log::debug!("Anderson: singular normal equations, keeping the newest iterate")
            }
            CoeffKind::RankDeficient => {
                log::debug!("Anderson: {} of {} differences linearly dependent, dropped", n - k, n)
            }
            _ => {}
        }

        let sum = self.coeffs[..n].iter().fold(T::zero(), |s, &c| s + c);
        self.coeffs[n] = T::from_re(1.0) - sum;
        kind
    }

    /// Write the relaxed combination of the history into `out`, using the
    /// current coefficients.
    pub fn mix(&self, history: &History<T>, out: &mut [T]) {
        assert_eq!(history.len(), self.depth, "Anderson: history is not full");
        assert_eq!(out.len(), history.ndof(), "Output vector has incorrect length");
        let damp = T::from_re(1.0 - self.beta);
        out.iter_mut().for_each(|o| *o = T::zero());
        for j in 1..self.depth {
            let c = self.coeffs[j - 1];
            let (older, newer) = (&history[j - 1], &history[j]);
            for ((o, &vj), &vi) in out.iter_mut().zip(newer).zip(older) {
                *o = *o + c * vj - damp * c * (vj - vi);
            }
        }
    }

    /// Compute coefficients and mix in one step.
    pub fn apply(&mut self, history: &History<T>, out: &mut [T]) -> CoeffKind {
        let kind = self.compute_coefficients(history);
        self.mix(history, out);
        kind
    }
}

/// Orthogonalize `diffs` newest first, recording in `active` the indices of
/// those that are not (numerically) in the span of the ones kept before.
fn independent_differences<T: Scalar>(
    diffs: &[Vec<T>],
    basis: &mut [Vec<T>],
    active: &mut Vec<usize>,
    r_n_sqr: f64,
) {
    active.clear();
    for (i, d) in diffs.iter().enumerate().rev() {
        let d_sqr = norm(d).powi(2);
        if d_sqr == 0.0 || d_sqr <= SINGULAR_RTOL * r_n_sqr {
            continue;
        }
        let (kept, rest) = basis.split_at_mut(active.len());
        let w = &mut rest[0];
        w.copy_from_slice(d);
        for q in kept.iter() {
            let p = dot(q, w.as_slice());
            w.iter_mut().zip(q).for_each(|(wk, &qk)| *wk = *wk - p * qk);
        }
        let w_sqr = norm(w.as_slice()).powi(2);
        if w_sqr <= DEPENDENCE_RTOL * d_sqr {
            continue;
        }
        let inv = T::from_re(1.0 / w_sqr.sqrt());
        w.iter_mut().for_each(|wk| *wk = *wk * inv);
        active.push(i);
    }
    active.sort_unstable();
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use faer::c64;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn history_of(vectors: &[Vec<f64>]) -> History<f64> {
        let mut h = History::new(vectors.len(), vectors[0].len());
        for v in vectors {
            h.push(v);
        }
        h
    }

    #[test]
    fn two_vectors_give_unit_coefficient() {
        let h = history_of(&[vec![1.0, 2.0], vec![7.0, -3.0]]);
        let mut mixer = AndersonMixer::new(2, 1.0, 2);
        assert_eq!(mixer.compute_coefficients(&h), CoeffKind::Unit);
        assert_eq!(mixer.coefficients(), &[1.0]);
        let mut out = vec![0.0; 2];
        mixer.mix(&h, &mut out);
        assert_eq!(out, vec![7.0, -3.0]);
    }

    #[test]
    fn scalar_geometric_sequence_is_extrapolated() {
        // iterates of x -> 0.5 x + 3 from 0; the fixed point is 6
        let h = history_of(&[vec![0.0], vec![3.0], vec![4.5]]);
        let mut mixer = AndersonMixer::new(3, 1.0, 1);
        let mut out = vec![0.0];
        assert_eq!(mixer.apply(&h, &mut out), CoeffKind::LeastSquares);
        assert_abs_diff_eq!(mixer.coefficients()[0], -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(mixer.coefficients()[1], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[0], 6.0, epsilon = 1e-12);
    }

    #[test]
    fn coefficients_sum_to_one() {
        let mut rng = StdRng::seed_from_u64(42);
        for depth in 2..7 {
            let ndof = 5;
            let vectors: Vec<Vec<f64>> = (0..depth)
                .map(|_| (0..ndof).map(|_| rng.r#gen::<f64>()).collect())
                .collect();
            let h = history_of(&vectors);
            let mut mixer = AndersonMixer::new(depth, 1.0, ndof);
            mixer.compute_coefficients(&h);
            let sum: f64 = mixer.coefficients().iter().sum();
            assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn unit_beta_is_plain_linear_combination() {
        let mut rng = StdRng::seed_from_u64(7);
        let ndof = 4;
        let vectors: Vec<Vec<f64>> = (0..4)
            .map(|_| (0..ndof).map(|_| rng.r#gen::<f64>()).collect())
            .collect();
        let h = history_of(&vectors);
        let mut mixer = AndersonMixer::new(4, 1.0, ndof);
        let mut out = vec![0.0; ndof];
        mixer.apply(&h, &mut out);
        let c = mixer.coefficients();
        for k in 0..ndof {
            let plain: f64 = (1..4).map(|j| c[j - 1] * vectors[j][k]).sum();
            assert_abs_diff_eq!(out[k], plain, epsilon = 1e-12);
        }
    }

    #[test]
    fn relaxation_pulls_towards_previous_iterates() {
        let vectors = vec![vec![0.0], vec![3.0], vec![4.5]];
        let h = history_of(&vectors);
        let mut mixer = AndersonMixer::new(3, 0.5, 1);
        let mut out = vec![0.0];
        mixer.apply(&h, &mut out);
        // c = [-1, 2]: -1*(3 - 0.5*3) + 2*(4.5 - 0.5*1.5) = -1.5 + 7.5
        assert_abs_diff_eq!(out[0], 6.0, epsilon = 1e-12);

        let h = history_of(&[vec![1.0], vec![2.0], vec![2.0]]);
        let mut mixer = AndersonMixer::new(3, 0.25, 1);
        mixer.apply(&h, &mut out);
        let c = mixer.coefficients().to_vec();
        let expected = c[0] * (2.0 - 0.75 * 1.0) + c[1] * (2.0 - 0.75 * 0.0);
        assert_abs_diff_eq!(out[0], expected, epsilon = 1e-12);
    }

    #[test]
    fn singular_system_keeps_newest_iterate() {
        // equal steps: r_0 == r_1, so the normal matrix vanishes
        let h = history_of(&[vec![3.0], vec![4.5], vec![6.0]]);
        let mut mixer = AndersonMixer::new(3, 1.0, 1);
        let mut out = vec![0.0];
        assert_eq!(mixer.apply(&h, &mut out), CoeffKind::Degenerate);
        assert_eq!(mixer.coefficients(), &[0.0, 1.0]);
        assert_eq!(out, vec![6.0]);
    }

    #[test]
    fn dependent_differences_get_zero_weight() {
        // one unknown, six iterates of x -> 0.5 x + 3: all four differences are parallel
        let h = history_of(&[
            vec![0.0],
            vec![3.0],
            vec![4.5],
            vec![5.25],
            vec![5.625],
            vec![5.8125],
        ]);
        let mut mixer = AndersonMixer::new(6, 1.0, 1);
        let mut out = vec![0.0];
        assert_eq!(mixer.apply(&h, &mut out), CoeffKind::RankDeficient);
        assert_eq!(mixer.coefficients(), &[0.0, 0.0, 0.0, -1.0, 2.0]);
        assert_eq!(out, vec![6.0]);
    }

    #[test]
    fn rank_deficient_vectors_keep_bounded_coefficients() {
        // ndof = 2 spans at most two of the four differences
        let mut rng = StdRng::seed_from_u64(11);
        let vectors: Vec<Vec<f64>> = (0..6)
            .map(|_| (0..2).map(|_| rng.r#gen::<f64>()).collect())
            .collect();
        let h = history_of(&vectors);
        let mut mixer = AndersonMixer::new(6, 1.0, 2);
        assert_eq!(mixer.compute_coefficients(&h), CoeffKind::RankDeficient);
        let c = mixer.coefficients();
        assert_eq!(c[..4].iter().filter(|&&x| x == 0.0).count(), 2);
        assert!(c.iter().all(|x| x.is_finite() && x.abs() < 1e6));
        let sum: f64 = c.iter().sum();
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn complex_least_squares_uses_conjugation() {
        // iterates of z -> a z + b from 0; fixed point b / (1 - a)
        let a = c64::new(0.3, 0.4);
        let b = c64::new(3.0, 1.0);
        let z1 = b;
        let z2 = a * z1 + b;
        let mut h = History::new(3, 1);
        h.push(&[c64::new(0.0, 0.0)]);
        h.push(&[z1]);
        h.push(&[z2]);
        let mut mixer = AndersonMixer::new(3, 1.0, 1);
        let mut out = vec![c64::new(0.0, 0.0)];
        assert_eq!(mixer.apply(&h, &mut out), CoeffKind::LeastSquares);
        let fixed = b / (c64::new(1.0, 0.0) - a);
        assert_abs_diff_eq!(out[0].re, fixed.re, epsilon = 1e-12);
        assert_abs_diff_eq!(out[0].im, fixed.im, epsilon = 1e-12);
        let sum = mixer.coefficients().iter().fold(c64::new(0.0, 0.0), |s, &c| s + c);
        assert_abs_diff_eq!(sum.re, 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(sum.im, 0.0, epsilon = 1e-14);
    }
}
