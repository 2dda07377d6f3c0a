//! API options for the Picard solver.
//!
//! This module provides the `PicardOptions` struct, which holds the stopping
//! criteria of the fixed-point iteration and the Anderson acceleration
//! parameters. Options are validated when they are built or handed to a
//! solver, never in the middle of a solve; a solve works on its own copy.

use crate::error::PicardError;

/// Picard iteration & Anderson acceleration parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PicardOptions {
    /// Relative error between consecutive iterates below which the iteration stops
    pub tol: f64,

    /// Maximum number of Picard iterations
    pub max_iter: usize,

    /// Number of most recent iterates kept for Anderson mixing (M)
    pub num_last_vectors_used: usize,

    /// Relaxation factor β in (0, 1] of the Anderson update
    pub anderson_beta: f64,

    /// Enable Anderson acceleration
    pub anderson: bool,

    /// The Jacobian does not change between iterations, so its factorization can be reused
    pub constant_jacobian: bool,
}

impl Default for PicardOptions {
    fn default() -> Self {
        Self {
            tol: 1e-4,
            max_iter: 50,
            num_last_vectors_used: 3,
            anderson_beta: 1.0,
            anderson: false,
            constant_jacobian: false,
        }
    }
}

impl PicardOptions {
    /// Build and validate a full set of options.
    pub fn configure(
        tol: f64,
        max_iter: usize,
        num_last_vectors_used: usize,
        anderson_beta: f64,
        anderson: bool,
    ) -> Result<Self, PicardError> {
        let opts = Self {
            tol,
            max_iter,
            num_last_vectors_used,
            anderson_beta,
            anderson,
            ..Self::default()
        };
        opts.validate()?;
        Ok(opts)
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_num_last_vectors_used(mut self, num: usize) -> Self {
        self.num_last_vectors_used = num;
        self
    }

    pub fn with_anderson_beta(mut self, beta: f64) -> Self {
        self.anderson_beta = beta;
        self
    }

    /// Turn Anderson acceleration on or off.
    pub fn with_anderson(mut self, on: bool) -> Self {
        self.anderson = on;
        self
    }

    pub fn with_constant_jacobian(mut self, constant: bool) -> Self {
        self.constant_jacobian = constant;
        self
    }

    /// Check the invariants the solver relies on.
    pub fn validate(&self) -> Result<(), PicardError> {
        if self.num_last_vectors_used < 1 {
            return Err(PicardError::InvalidConfiguration(
                "bad number of last iterations to be used (must be at least one)".into(),
            ));
        }
        if self.anderson && self.num_last_vectors_used < 2 {
            return Err(PicardError::InvalidConfiguration(
                "Anderson acceleration makes sense only if at least two last iterations are used".into(),
            ));
        }
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(PicardError::InvalidConfiguration(format!(
                "tolerance must be positive and finite, got {}",
                self.tol
            )));
        }
        if self.max_iter < 1 {
            return Err(PicardError::InvalidConfiguration(
                "maximum number of iterations must be at least one".into(),
            ));
        }
        if !(self.anderson_beta > 0.0 && self.anderson_beta <= 1.0) {
            return Err(PicardError::InvalidConfiguration(format!(
                "Anderson beta must lie in (0, 1], got {}",
                self.anderson_beta
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let o = PicardOptions::default();
        assert_eq!(o.tol, 1e-4);
        assert_eq!(o.max_iter, 50);
        assert_eq!(o.num_last_vectors_used, 3);
        assert_eq!(o.anderson_beta, 1.0);
        assert!(!o.anderson);
        assert!(o.validate().is_ok());
    }

    #[test]
    fn history_depth_rules() {
        assert!(matches!(
            PicardOptions::configure(1e-6, 10, 0, 1.0, false),
            Err(PicardError::InvalidConfiguration(_))
        ));
        assert!(PicardOptions::configure(1e-6, 10, 1, 1.0, false).is_ok());
        assert!(matches!(
            PicardOptions::configure(1e-6, 10, 1, 1.0, true),
            Err(PicardError::InvalidConfiguration(_))
        ));
        assert!(PicardOptions::configure(1e-6, 10, 2, 1.0, true).is_ok());
    }

    #[test]
    fn rejects_bad_numbers() {
        let base = PicardOptions::default();
        assert!(base.with_tol(0.0).validate().is_err());
        assert!(base.with_tol(f64::NAN).validate().is_err());
        assert!(base.with_max_iter(0).validate().is_err());
        assert!(base.with_anderson_beta(0.0).validate().is_err());
        assert!(base.with_anderson_beta(1.5).validate().is_err());
        assert!(base.with_anderson_beta(0.3).validate().is_ok());
    }
}
