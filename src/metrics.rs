//! Fit quality metrics.
//!
//! Two families:
//!
//! - **Sharpness** of the matched lag samples `b[j] - a[i]`
//!   (see [`matched_lags`](crate::em::matched_lags)). A good fit yields a
//!   tight cloud of lags; the scores below are smaller for sharper fits.
//! - **Recovery** of known correspondences, for synthetic streams where the
//!   true pairs are available.
//!
//! # Metrics Overview
//!
//! | Metric | Range | Best | Measures |
//! |--------|-------|------|----------|
//! | [`lag_range`] | [0, ∞) | 0 | max - min of the lags |
//! | [`lag_variance`] | [0, ∞) | 0 | population variance of the lags |
//! | [`lag_std`] | [0, ∞) | 0 | square root of the above |
//! | [`pair_precision`] | [0, 1] | 1 | predicted pairs that are true |
//! | [`pair_recall`] | [0, 1] | 1 | true pairs that were predicted |
//! | [`pair_f1`] | [0, 1] | 1 | harmonic mean of the two |
//!
//! # Example
//!
//! ```rust
//! use lagem::metrics::{lag_std, pair_recall};
//!
//! let lags = [3.1, 2.8, 3.15, 2.9];
//! assert!(lag_std(&lags) < 0.2);
//!
//! let pred = [(0, 0), (1, 1), (2, 3)];
//! let truth = [(0, 0), (1, 1), (2, 2)];
//! assert!((pair_recall(&pred, &truth) - 2.0 / 3.0).abs() < 1e-12);
//! ```

use std::collections::HashSet;

/// Spread between the largest and smallest lag. 0 for an empty slice.
pub fn lag_range(lags: &[f64]) -> f64 {
    if lags.is_empty() {
        return 0.0;
    }
    let max = lags.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = lags.iter().cloned().fold(f64::INFINITY, f64::min);
    max - min
}

/// Population variance of the lags. 0 for an empty slice.
pub fn lag_variance(lags: &[f64]) -> f64 {
    if lags.is_empty() {
        return 0.0;
    }
    let n = lags.len() as f64;
    let mean = lags.iter().sum::<f64>() / n;
    lags.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n
}

/// Population standard deviation of the lags. 0 for an empty slice.
pub fn lag_std(lags: &[f64]) -> f64 {
    lag_variance(lags).sqrt()
}

/// Fraction of predicted pairs that appear in `truth`.
///
/// 1.0 when `pred` is empty: nothing claimed, nothing wrong.
pub fn pair_precision(pred: &[(usize, usize)], truth: &[(usize, usize)]) -> f64 {
    if pred.is_empty() {
        return 1.0;
    }
    overlap(pred, truth) as f64 / pred.len() as f64
}

/// Fraction of `truth` pairs that appear in `pred`.
///
/// 1.0 when `truth` is empty.
pub fn pair_recall(pred: &[(usize, usize)], truth: &[(usize, usize)]) -> f64 {
    if truth.is_empty() {
        return 1.0;
    }
    overlap(pred, truth) as f64 / truth.len() as f64
}

/// Harmonic mean of [`pair_precision`] and [`pair_recall`].
pub fn pair_f1(pred: &[(usize, usize)], truth: &[(usize, usize)]) -> f64 {
    let p = pair_precision(pred, truth);
    let r = pair_recall(pred, truth);
    if p + r == 0.0 {
        0.0
    } else {
        2.0 * p * r / (p + r)
    }
}

fn overlap(pred: &[(usize, usize)], truth: &[(usize, usize)]) -> usize {
    let truth: HashSet<_> = truth.iter().collect();
    pred.iter()
        .collect::<HashSet<_>>()
        .into_iter()
        .filter(|pair| truth.contains(pair))
        .count()
}
