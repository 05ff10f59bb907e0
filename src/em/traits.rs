//! Lag estimator traits.

use ndarray::Array2;

use super::lag_em::LagFit;
use crate::error::Result;

/// Trait for lag estimators.
pub trait LagEstimator {
    /// Fit the lag between `a` and `b` and return the model with its
    /// best-match assignments.
    fn estimate(&self, a: &[f64], b: &[f64]) -> Result<LagFit>;
}

/// Trait for estimators that expose soft correspondences.
pub trait SoftAlignment: LagEstimator {
    /// Fit and return the final responsibility matrix.
    ///
    /// Entry \[i\]\[j\] is the probability that `b[j]` corresponds to
    /// `a[i]`. Every row sums to 1, or to 0 when the row carries no evidence.
    fn fit_responsibilities(&self, a: &[f64], b: &[f64]) -> Result<Array2<f64>>;
}
