//! Gaussian evidence kernel and the evidence ("normal") matrix.
//!
//! # The Lag Model
//!
//! A pair (aᵢ, bⱼ) is explained by a single Gaussian over the offset:
//!
//! ```text
//! bⱼ - aᵢ ~ N(μ, σ²)
//! ```
//!
//! The unnormalized evidence for the pair, weighted by the current belief
//! `w = R[i][j]` that the two correspond, is:
//!
//! ```text
//! w × (1 / √(2πσ²)) × exp(-(bⱼ - aᵢ - μ)² / 2σ²)
//! ```
//!
//! # Preconditions
//!
//! `var` must be > 0. With `var == 0` the scale factor is infinite and the
//! exponent is `0/0` for exact matches, so every entry becomes NaN. The
//! convergence loop never calls these with a collapsed variance; other
//! callers must guard it themselves.

use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1, Zip};

/// Unnormalized evidence weight of the pair (a, b) under N(mu, var).
#[inline]
pub fn gaussian_weight(a: f64, b: f64, mu: f64, var: f64, prior: f64) -> f64 {
    let scale = 1.0 / (2.0 * std::f64::consts::PI * var).sqrt();
    weight_with_scale(a, b, mu, var, scale, prior)
}

#[inline]
fn weight_with_scale(a: f64, b: f64, mu: f64, var: f64, scale: f64, prior: f64) -> f64 {
    let diff = b - a - mu;
    prior * scale * (-(diff * diff) / (2.0 * var)).exp()
}

/// Build the N×M evidence matrix: entry (i, j) is
/// `gaussian_weight(a[i], b[j], mu, var, r[i][j])`.
///
/// `r` is only read. The returned matrix is a fresh allocation owned by the
/// caller.
pub fn normal_matrix(a: &[f64], b: &[f64], r: ArrayView2<'_, f64>, mu: f64, var: f64) -> Array2<f64> {
    debug_assert_eq!(r.dim(), (a.len(), b.len()));

    let scale = 1.0 / (2.0 * std::f64::consts::PI * var).sqrt();
    let mut evidence = Array2::zeros(r.raw_dim());

    let zip = Zip::indexed(&mut evidence).and(&r);

    #[cfg(feature = "parallel")]
    zip.par_for_each(|(i, j), e, &w| {
        *e = weight_with_scale(a[i], b[j], mu, var, scale, w);
    });

    #[cfg(not(feature = "parallel"))]
    zip.for_each(|(i, j), e, &w| {
        *e = weight_with_scale(a[i], b[j], mu, var, scale, w);
    });

    evidence
}

/// [`normal_matrix`] restricted to per-column row windows.
///
/// Entry (i, j) is evaluated only when `lo <= i <= hi` for
/// `windows[j] = (lo, hi)`; every other entry is 0.
pub fn normal_matrix_windowed(
    a: &[f64],
    b: &[f64],
    r: ArrayView2<'_, f64>,
    mu: f64,
    var: f64,
    windows: &[(usize, usize)],
) -> Array2<f64> {
    debug_assert_eq!(r.dim(), (a.len(), b.len()));
    debug_assert_eq!(windows.len(), b.len());

    let scale = 1.0 / (2.0 * std::f64::consts::PI * var).sqrt();
    let mut evidence = Array2::zeros(r.raw_dim());

    let zip = Zip::indexed(evidence.columns_mut()).and(r.columns());
    let fill = |j: usize, mut column: ArrayViewMut1<'_, f64>, prior: ArrayView1<'_, f64>| {
        let (lo, hi) = windows[j];
        for i in lo..=hi {
            column[i] = weight_with_scale(a[i], b[j], mu, var, scale, prior[i]);
        }
    };

    #[cfg(feature = "parallel")]
    zip.par_for_each(fill);

    #[cfg(not(feature = "parallel"))]
    zip.for_each(fill);

    evidence
}
