//! Lag estimation by Expectation-Maximization.
//!
//! # The Problem
//!
//! Two event streams `a` (N events) and `b` (M events) are believed to be
//! related by a roughly constant delay: each event in `a` triggers one in
//! `b` about μ time units later, with jitter σ. Which event in `b` belongs
//! to which in `a` is unknown.
//!
//! # The Algorithm
//!
//! Every pair (i, j) carries a responsibility `R[i][j]`, the posterior
//! probability that `b[j]` is the response to `a[i]`. Starting from the
//! uniform matrix (every entry `1/M`) and a caller-supplied (μ₀, σ₀²):
//!
//! 1. **E-step**: weight each pair by its Gaussian evidence times its
//!    current responsibility, and row-normalize
//!    ([`normal_matrix`], [`expectation`]).
//! 2. **M-step**: re-estimate μ and σ² as responsibility-weighted moments of
//!    the offsets `b[j] - a[i]` ([`maximization`]).
//! 3. Stop when both |Δμ| and |Δσ²| fall below the tolerance.
//!
//! The previous responsibilities act as the prior of the next E-step, so R
//! sharpens monotonically toward a hard matching.
//!
//! # Terminal States
//!
//! - [`FitStatus::Converged`]: parameter deltas below tolerance.
//! - [`FitStatus::Diverged`]: the M-step produced a NaN μ or σ², or a σ² that
//!   collapsed to 0 before the fit settled. A collapse follows from a σ₀ far
//!   below the spacing of the data: pairs underflow to zero weight, whole
//!   rows of R empty out and the next kernel would evaluate `0/0`.
//! - [`FitStatus::MaxIterationsExceeded`]: the iteration cap was hit first.
//!
//! A model with σ² ≤ 0 is never reported. On every exit the result holds the
//! last valid (μ, σ²) together with the responsibilities that produced it.
//!
//! # Failure Modes
//!
//! - **Local optima**: the fit depends on (μ₀, σ₀²); see
//!   [`MultiStart`](super::MultiStart) for random restarts.
//! - **Exact data**: on a noise-free shift σ² heads for 0. If the step that
//!   reaches 0 is within tolerance of the previous model and leaves no row of
//!   R empty, the fit is converged and keeps that previous, positive σ².
//!
//! [`normal_matrix`]: super::kernel::normal_matrix
//! [`expectation`]: super::steps::expectation
//! [`maximization`]: super::steps::maximization

use ndarray::Array2;

use super::assign::extract_assignments;
use super::kernel::{normal_matrix, normal_matrix_windowed};
use super::likelihood::{likelihood, log_likelihood};
use super::steps::{expectation, expectation_windowed, maximization};
use super::traits::{LagEstimator, SoftAlignment};
use super::window::{column_windows, NeighborSearch};
use crate::error::{Error, Result};

/// Mean offset and variance of the single-Gaussian lag model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagModel {
    /// Mean offset `b - a`.
    pub mu: f64,
    /// Variance of the offset.
    pub var: f64,
}

impl LagModel {
    /// Standard deviation of the offset.
    pub fn std(&self) -> f64 {
        self.var.sqrt()
    }

    /// Finite μ and σ² > 0: the next kernel is well defined.
    fn is_valid(&self) -> bool {
        self.mu.is_finite() && self.var.is_finite() && self.var > 0.0
    }
}

/// How a fit terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStatus {
    /// Parameter deltas fell below tolerance.
    Converged,
    /// μ or σ² became NaN or σ² collapsed; the last valid values were kept.
    Diverged,
    /// The iteration cap was reached before convergence.
    MaxIterationsExceeded,
}

impl FitStatus {
    /// True for [`FitStatus::Converged`].
    pub fn is_converged(&self) -> bool {
        matches!(self, FitStatus::Converged)
    }
}

/// Result of a full lag fit.
#[derive(Debug, Clone, PartialEq)]
pub struct LagFit {
    /// Mean offset.
    pub mu: f64,
    /// Standard deviation of the offset.
    pub std: f64,
    /// Variance of the offset.
    pub variance: f64,
    /// Sum of log column masses under the final model.
    pub log_likelihood: f64,
    /// `(i, j)` best matches, ascending in `i`.
    pub assignments: Vec<(usize, usize)>,
    /// Terminal state of the loop.
    pub status: FitStatus,
    /// E/M cycles whose result was kept. A cycle discarded on divergence or
    /// collapse is not counted.
    pub iterations: usize,
}

/// Result of [`LagEm::score`]: the model and its product-form likelihood.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagScore {
    /// Mean offset.
    pub mu: f64,
    /// Standard deviation of the offset.
    pub std: f64,
    /// Product of column masses under the final model.
    pub likelihood: f64,
    /// Terminal state of the loop.
    pub status: FitStatus,
}

/// Final state of the convergence loop.
#[derive(Debug, Clone)]
pub(crate) struct EmRun {
    pub(crate) model: LagModel,
    pub(crate) responsibilities: Array2<f64>,
    pub(crate) status: FitStatus,
    pub(crate) iterations: usize,
}

/// Single-Gaussian EM lag estimator.
#[derive(Debug, Clone)]
pub struct LagEm {
    /// Initial mean offset.
    init_mu: f64,
    /// Initial variance; must be > 0.
    init_var: f64,
    /// Convergence tolerance on both |Δμ| and |Δσ²|.
    tol: f64,
    /// Maximum E/M cycles.
    max_iter: usize,
    /// Row range strategy for the E-step.
    search: NeighborSearch,
}

impl LagEm {
    /// Create an estimator seeded at (`init_mu`, `init_var`).
    pub fn new(init_mu: f64, init_var: f64) -> Self {
        Self {
            init_mu,
            init_var,
            tol: 1e-2,
            max_iter: 1000,
            search: NeighborSearch::Full,
        }
    }

    /// Set convergence tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set maximum iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Use windowed E-steps leaving about `epsilon` of each column's mass out.
    pub fn with_windowed(mut self, epsilon: f64) -> Self {
        self.search = NeighborSearch::Windowed { epsilon };
        self
    }

    /// Set the E-step row strategy.
    pub fn with_search(mut self, search: NeighborSearch) -> Self {
        self.search = search;
        self
    }

    /// Initial model.
    pub fn init_model(&self) -> LagModel {
        LagModel {
            mu: self.init_mu,
            var: self.init_var,
        }
    }

    /// Same configuration, new starting point.
    pub(crate) fn reseeded(&self, init_mu: f64, init_var: f64) -> Self {
        Self {
            init_mu,
            init_var,
            ..self.clone()
        }
    }

    /// Fit the lag model and extract assignments.
    pub fn fit(&self, a: &[f64], b: &[f64]) -> Result<LagFit> {
        let run = self.run(a, b)?;
        let log_likelihood = log_likelihood(a, b, run.responsibilities.view(), run.model);
        let assignments = extract_assignments(run.responsibilities.view());

        Ok(LagFit {
            mu: run.model.mu,
            std: run.model.std(),
            variance: run.model.var,
            log_likelihood,
            assignments,
            status: run.status,
            iterations: run.iterations,
        })
    }

    /// Fit using only the first `n` elements of `a` and `m` of `b`.
    ///
    /// Fails with [`Error::LengthMismatch`] if a declared size exceeds the
    /// data supplied.
    pub fn fit_declared(&self, a: &[f64], n: usize, b: &[f64], m: usize) -> Result<LagFit> {
        let a = declared_prefix("a", a, n)?;
        let b = declared_prefix("b", b, m)?;
        self.fit(a, b)
    }

    /// Fit the lag model and return the product-form likelihood, without
    /// assignments.
    pub fn score(&self, a: &[f64], b: &[f64]) -> Result<LagScore> {
        let run = self.run(a, b)?;
        Ok(LagScore {
            mu: run.model.mu,
            std: run.model.std(),
            likelihood: likelihood(a, b, run.responsibilities.view(), run.model),
            status: run.status,
        })
    }

    fn validate(&self, a: &[f64], b: &[f64]) -> Result<()> {
        if a.is_empty() || b.is_empty() {
            return Err(Error::EmptyInput);
        }
        check_finite("a", a)?;
        check_finite("b", b)?;

        if !self.init_mu.is_finite() {
            return Err(Error::InvalidParameter {
                name: "init_mu",
                message: "must be finite",
            });
        }
        if !self.init_var.is_finite() || self.init_var <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "init_var",
                message: "must be > 0 and finite",
            });
        }
        if self.tol.is_nan() || self.tol <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "tol",
                message: "must be > 0",
            });
        }
        if self.max_iter == 0 {
            return Err(Error::InvalidParameter {
                name: "max_iter",
                message: "must be > 0",
            });
        }
        if let NeighborSearch::Windowed { epsilon } = self.search {
            if epsilon.is_nan() || epsilon <= 0.0 || epsilon >= 1.0 {
                return Err(Error::InvalidParameter {
                    name: "epsilon",
                    message: "must be in (0, 1)",
                });
            }
        }
        Ok(())
    }

    /// The convergence loop.
    pub(crate) fn run(&self, a: &[f64], b: &[f64]) -> Result<EmRun> {
        self.validate(a, b)?;

        let (n, m) = (a.len(), b.len());
        let _span = tracing::debug_span!("lag_em", n, m).entered();

        let mut r = Array2::from_elem((n, m), 1.0 / m as f64);
        let mut model = self.init_model();
        let mut status = FitStatus::MaxIterationsExceeded;
        let mut iterations = 0;

        for attempt in 1..=self.max_iter {
            let candidate = self.e_step(a, b, &r, model);
            let next = maximization(a, b, candidate.view());
            let delta_mu = (next.mu - model.mu).abs();
            let delta_var = (next.var - model.var).abs();
            let settled = delta_mu < self.tol && delta_var < self.tol;

            if !next.is_valid() {
                // A collapsed σ² makes the next kernel 0/0. Only a fit that
                // had already settled on a full matching counts as converged.
                if settled && !has_empty_row(&candidate) {
                    status = FitStatus::Converged;
                } else {
                    tracing::warn!(
                        iteration = attempt,
                        mu = model.mu,
                        var = model.var,
                        next_mu = next.mu,
                        next_var = next.var,
                        "numerical problems: var collapsed or NaN, aborting"
                    );
                    status = FitStatus::Diverged;
                }
                break;
            }

            r = candidate;
            model = next;
            iterations = attempt;
            tracing::trace!(iteration = iterations, mu = model.mu, var = model.var);

            if settled {
                status = FitStatus::Converged;
                break;
            }
        }

        match status {
            FitStatus::Converged => {
                tracing::debug!(iterations, mu = model.mu, var = model.var, "converged")
            }
            FitStatus::MaxIterationsExceeded => tracing::warn!(
                max_iter = self.max_iter,
                mu = model.mu,
                var = model.var,
                "iteration cap reached before convergence"
            ),
            FitStatus::Diverged => {}
        }

        Ok(EmRun {
            model,
            responsibilities: r,
            status,
            iterations,
        })
    }

    /// One E-step: a fresh responsibility matrix from `r` and `model`.
    fn e_step(&self, a: &[f64], b: &[f64], r: &Array2<f64>, model: LagModel) -> Array2<f64> {
        let mut next = Array2::zeros(r.raw_dim());

        match self.search {
            NeighborSearch::Full => {
                let evidence = normal_matrix(a, b, r.view(), model.mu, model.var);
                expectation(&mut next, evidence.view(), 0..a.len());
            }
            NeighborSearch::Windowed { epsilon } => {
                let windows = column_windows(a, b, r.view(), model.mu, epsilon);
                let evidence =
                    normal_matrix_windowed(a, b, r.view(), model.mu, model.var, &windows);
                expectation_windowed(&mut next, evidence.view(), &windows);
            }
        }

        next
    }
}

impl LagEstimator for LagEm {
    fn estimate(&self, a: &[f64], b: &[f64]) -> Result<LagFit> {
        self.fit(a, b)
    }
}

impl SoftAlignment for LagEm {
    fn fit_responsibilities(&self, a: &[f64], b: &[f64]) -> Result<Array2<f64>> {
        Ok(self.run(a, b)?.responsibilities)
    }
}

fn declared_prefix<'a>(sequence: &'static str, data: &'a [f64], declared: usize) -> Result<&'a [f64]> {
    data.get(..declared).ok_or(Error::LengthMismatch {
        sequence,
        declared,
        actual: data.len(),
    })
}

fn has_empty_row(r: &Array2<f64>) -> bool {
    r.rows().into_iter().any(|row| row.iter().all(|&w| w == 0.0))
}

fn check_finite(sequence: &'static str, data: &[f64]) -> Result<()> {
    match data.iter().position(|x| !x.is_finite()) {
        Some(index) => Err(Error::NonFiniteValue { sequence, index }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lag_em_shifted_sequence() {
        let a = [0.0, 1.0, 2.0];
        let b = [1.0, 2.0, 3.0];

        let fit = LagEm::new(0.0, 1.0).fit(&a, &b).unwrap();

        assert_eq!(fit.status, FitStatus::Converged);
        assert!((fit.mu - 1.0).abs() < 1e-2, "mu = {}", fit.mu);
        assert_eq!(fit.assignments, vec![(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn test_lag_em_divergence_keeps_last_valid_model() {
        // Spacing far beyond sigma: every off-diagonal weight underflows and
        // the first M-step collapses var to 0.
        let a = [0.0, 100.0, 200.0];

        let em = LagEm::new(0.0, 1.0);
        let fit = em.fit(&a, &a).unwrap();

        assert_eq!(fit.status, FitStatus::Diverged);
        assert_eq!(fit.iterations, 0);
        assert_eq!(fit.mu, 0.0);
        assert_eq!(fit.variance, 1.0);
        assert!(fit.log_likelihood.is_finite());

        let r = em.fit_responsibilities(&a, &a).unwrap();
        assert_eq!(r, Array2::from_elem((3, 3), 1.0 / 3.0));
    }

    #[test]
    fn test_lag_em_tiny_init_var_diverges() {
        // sigma0 = 1e-3 against unit spacing: row 0 has no partner at offset 0
        let a = [0.0, 1.0, 2.0];
        let b = [1.0, 2.0, 3.0];

        let fit = LagEm::new(0.0, 1e-6).fit(&a, &b).unwrap();

        assert_eq!(fit.status, FitStatus::Diverged);
        assert_eq!(fit.iterations, 0);
        assert_eq!(fit.variance, 1e-6);
        assert!(fit.std > 0.0);
        assert!(!fit.log_likelihood.is_nan());
    }

    #[test]
    fn test_lag_em_exact_shift_converges_with_positive_variance() {
        // Noise-free data: the step after this one would reach var = 0
        let a = [0.0, 1.0, 2.0];
        let b = [1.0, 2.0, 3.0];

        let fit = LagEm::new(0.0, 1.0).fit(&a, &b).unwrap();

        assert_eq!(fit.status, FitStatus::Converged);
        assert_eq!(fit.iterations, 6);
        assert!(fit.variance > 0.0);
        assert!(fit.log_likelihood.is_finite());
    }

    #[test]
    fn test_lag_em_max_iterations() {
        let a = [0.0, 10.0, 20.0, 30.0];
        let b = [3.1, 12.8, 23.15, 32.9];

        let fit = LagEm::new(0.0, 9.0).with_max_iter(1).fit(&a, &b).unwrap();
        assert_eq!(fit.status, FitStatus::MaxIterationsExceeded);
        assert_eq!(fit.iterations, 1);
        assert!(!fit.status.is_converged());
    }

    #[test]
    fn test_lag_em_rejects_bad_variance() {
        let a = [0.0, 1.0];
        for var in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = LagEm::new(0.0, var).fit(&a, &a).unwrap_err();
            assert!(matches!(err, Error::InvalidParameter { name: "init_var", .. }));
        }
    }

    #[test]
    fn test_lag_em_rejects_bad_config() {
        let a = [0.0, 1.0];
        assert!(LagEm::new(f64::NAN, 1.0).fit(&a, &a).is_err());
        assert!(LagEm::new(0.0, 1.0).with_tol(0.0).fit(&a, &a).is_err());
        assert!(LagEm::new(0.0, 1.0).with_max_iter(0).fit(&a, &a).is_err());
        assert!(LagEm::new(0.0, 1.0).with_windowed(0.0).fit(&a, &a).is_err());
        assert!(LagEm::new(0.0, 1.0).with_windowed(1.0).fit(&a, &a).is_err());
    }

    #[test]
    fn test_lag_em_rejects_empty_and_non_finite() {
        let em = LagEm::new(0.0, 1.0);
        assert_eq!(em.fit(&[], &[1.0]).unwrap_err(), Error::EmptyInput);
        assert_eq!(em.fit(&[1.0], &[]).unwrap_err(), Error::EmptyInput);
        assert_eq!(
            em.fit(&[0.0, 1.0], &[0.0, f64::NAN]).unwrap_err(),
            Error::NonFiniteValue {
                sequence: "b",
                index: 1
            }
        );
    }

    #[test]
    fn test_fit_declared_prefix_and_overrun() {
        let a = [0.0, 10.0, 20.0, 30.0, 40.0, 99.0];
        let b = [3.1, 12.8, 23.15, 32.9, 43.05];
        let em = LagEm::new(0.0, 4.0);

        let declared = em.fit_declared(&a, 5, &b, 5).unwrap();
        let direct = em.fit(&a[..5], &b).unwrap();
        assert_eq!(declared, direct);

        let err = em.fit_declared(&a, 5, &b, 8).unwrap_err();
        assert_eq!(
            err,
            Error::LengthMismatch {
                sequence: "b",
                declared: 8,
                actual: 5
            }
        );
    }

    #[test]
    fn test_score_matches_fit_model() {
        let a = [0.0, 10.0, 20.0, 30.0, 40.0];
        let b = [3.1, 12.8, 23.15, 32.9, 43.05];
        let em = LagEm::new(0.0, 4.0);

        let fit = em.fit(&a, &b).unwrap();
        let score = em.score(&a, &b).unwrap();

        assert_eq!(score.mu, fit.mu);
        assert_eq!(score.std, fit.std);
        assert_eq!(score.status, fit.status);
        assert!((score.likelihood.ln() - fit.log_likelihood).abs() < 1e-9);
    }
}
