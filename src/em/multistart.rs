//! Random restarts of the lag EM fit.
//!
//! EM only finds a local optimum near its starting point. A lag of 3 between
//! streams with a period of 10 is just as consistent, locally, with a lag of
//! 13 that skips one event. `MultiStart` draws many starting points
//!
//! ```text
//! μ₀ ~ U(mu_range),   σ₀ ~ U(std_range),   σ₀² = σ₀ × σ₀
//! ```
//!
//! runs a full fit from each, and keeps the fit with the largest
//! log-likelihood. Runs are sequential.

use rand::prelude::*;
use rand_distr::Uniform;

use super::lag_em::{FitStatus, LagEm, LagFit};
use super::traits::LagEstimator;
use crate::error::{Error, Result};

/// Outcome of a multi-start fit.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiStartFit {
    /// Highest-likelihood fit.
    pub best: LagFit,
    /// Number of fits run.
    pub runs: usize,
    /// Number of fits that diverged.
    pub diverged: usize,
}

/// Multi-start driver around [`LagEm`].
#[derive(Debug, Clone)]
pub struct MultiStart {
    /// Number of random starting points.
    restarts: usize,
    /// Range of initial mean offsets.
    mu_range: (f64, f64),
    /// Range of initial standard deviations.
    std_range: (f64, f64),
    /// Random seed.
    seed: Option<u64>,
    /// Tolerance, iteration cap and search strategy shared by every run.
    template: LagEm,
}

impl MultiStart {
    /// Create a driver with 200 restarts, μ₀ in [0, 100) and σ₀ in [3, 25).
    pub fn new() -> Self {
        Self {
            restarts: 200,
            mu_range: (0.0, 100.0),
            std_range: (3.0, 25.0),
            seed: None,
            template: LagEm::new(0.0, 1.0),
        }
    }

    /// Set number of restarts.
    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts;
        self
    }

    /// Set the range initial mean offsets are drawn from.
    pub fn with_mu_range(mut self, low: f64, high: f64) -> Self {
        self.mu_range = (low, high);
        self
    }

    /// Set the range initial standard deviations are drawn from.
    pub fn with_std_range(mut self, low: f64, high: f64) -> Self {
        self.std_range = (low, high);
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Use `template`'s tolerance, iteration cap and search strategy for
    /// every run. Its initial parameters are ignored.
    pub fn with_template(mut self, template: LagEm) -> Self {
        self.template = template;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.restarts == 0 {
            return Err(Error::InvalidParameter {
                name: "restarts",
                message: "must be > 0",
            });
        }
        let (mu_lo, mu_hi) = self.mu_range;
        if !(mu_lo.is_finite() && mu_hi.is_finite()) || mu_lo >= mu_hi {
            return Err(Error::InvalidParameter {
                name: "mu_range",
                message: "must be a finite, non-empty interval",
            });
        }
        let (std_lo, std_hi) = self.std_range;
        if !(std_lo.is_finite() && std_hi.is_finite()) || std_lo <= 0.0 || std_lo >= std_hi {
            return Err(Error::InvalidParameter {
                name: "std_range",
                message: "must be a finite, non-empty interval above 0",
            });
        }
        Ok(())
    }

    /// Run every restart and keep the best fit.
    pub fn fit(&self, a: &[f64], b: &[f64]) -> Result<MultiStartFit> {
        self.validate()?;

        let invalid_range = |name| Error::InvalidParameter {
            name,
            message: "must be a finite, non-empty interval",
        };
        let mu_dist =
            Uniform::new(self.mu_range.0, self.mu_range.1).map_err(|_| invalid_range("mu_range"))?;
        let std_dist = Uniform::new(self.std_range.0, self.std_range.1)
            .map_err(|_| invalid_range("std_range"))?;

        let mut rng: Box<dyn RngCore> = match self.seed {
            Some(s) => Box::new(StdRng::seed_from_u64(s)),
            None => Box::new(rand::rng()),
        };

        let mut best: Option<LagFit> = None;
        let mut diverged = 0;

        for run in 0..self.restarts {
            let mu0 = rng.sample(&mu_dist);
            let std0 = rng.sample(&std_dist);
            let fit = self.template.reseeded(mu0, std0 * std0).fit(a, b)?;
            tracing::trace!(run, mu0, std0, mu = fit.mu, ll = fit.log_likelihood);

            if fit.status == FitStatus::Diverged {
                diverged += 1;
            }
            best = match best {
                Some(current) if !ranks_above(&fit, &current) => Some(current),
                _ => Some(fit),
            };
        }

        let best = best.ok_or(Error::EmptyInput)?;
        tracing::debug!(
            runs = self.restarts,
            diverged,
            mu = best.mu,
            std = best.std,
            ll = best.log_likelihood,
            "multi-start selected best fit"
        );

        Ok(MultiStartFit {
            best,
            runs: self.restarts,
            diverged,
        })
    }
}

impl Default for MultiStart {
    fn default() -> Self {
        Self::new()
    }
}

impl LagEstimator for MultiStart {
    fn estimate(&self, a: &[f64], b: &[f64]) -> Result<LagFit> {
        Ok(self.fit(a, b)?.best)
    }
}

/// Non-diverged fits first, then larger log-likelihood; NaN ranks last.
fn ranks_above(candidate: &LagFit, current: &LagFit) -> bool {
    let c_ok = candidate.status != FitStatus::Diverged;
    let cur_ok = current.status != FitStatus::Diverged;
    if c_ok != cur_ok {
        return c_ok;
    }
    match (
        candidate.log_likelihood.is_nan(),
        current.log_likelihood.is_nan(),
    ) {
        (false, true) => true,
        (true, _) => false,
        (false, false) => candidate.log_likelihood > current.log_likelihood,
    }
}
