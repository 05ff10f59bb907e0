//! E-step and M-step of the lag EM fit.
//!
//! **E-step**: responsibilities are the evidence matrix, row-normalized:
//! ```text
//! R[i][j] = E[i][j] / Σₖ E[i][k]      (R[i][·] = 0 when Σₖ E[i][k] = 0)
//! ```
//!
//! **M-step**: mean and variance of the offsets, weighted by R:
//! ```text
//! μ  = Σᵢ Σⱼ (bⱼ - aᵢ) R[i][j] / N
//! σ² = Σᵢ Σⱼ ((bⱼ - aᵢ) - μ)² R[i][j] / N
//! ```
//!
//! Both M-step sums divide by N = |a|, not by Σ R. That is the weighted mean
//! only while every row of R sums to 1; a degenerate (all-zero) row still
//! counts toward N and pulls both estimates toward zero.

use core::ops::Range;

use ndarray::{s, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Zip};

use super::lag_em::LagModel;

/// Normalize `evidence` rows in `rows` into `r`.
///
/// Rows of `r` outside the range are left untouched. A row whose evidence
/// sums to exactly zero is written as all zeros.
pub fn expectation(r: &mut Array2<f64>, evidence: ArrayView2<'_, f64>, rows: Range<usize>) {
    debug_assert_eq!(r.dim(), evidence.dim());

    let mut out = r.slice_mut(s![rows.clone(), ..]);
    let evidence = evidence.slice(s![rows, ..]);
    let zip = Zip::from(out.rows_mut()).and(evidence.rows());

    #[cfg(feature = "parallel")]
    zip.par_for_each(normalize_row);

    #[cfg(not(feature = "parallel"))]
    zip.for_each(normalize_row);
}

fn normalize_row(mut out: ArrayViewMut1<'_, f64>, evidence: ArrayView1<'_, f64>) {
    let sum: f64 = evidence.sum();
    if sum != 0.0 {
        Zip::from(&mut out).and(&evidence).for_each(|o, &e| *o = e / sum);
    } else {
        out.fill(0.0);
    }
}

/// Windowed E-step.
///
/// `windows[j]` is the inclusive row window `(lo, hi)` for column `j`.
/// Evidence outside a column's window is treated as zero, so each row still
/// sums to 1 or 0. Only in-window entries are read; the rest of `r` is
/// zeroed.
pub fn expectation_windowed(
    r: &mut Array2<f64>,
    evidence: ArrayView2<'_, f64>,
    windows: &[(usize, usize)],
) {
    debug_assert_eq!(r.dim(), evidence.dim());
    debug_assert_eq!(windows.len(), evidence.ncols());

    let mut row_mass = vec![0.0; evidence.nrows()];
    for (j, &(lo, hi)) in windows.iter().enumerate() {
        for (i, mass) in row_mass.iter_mut().enumerate().take(hi + 1).skip(lo) {
            *mass += evidence[[i, j]];
        }
    }

    r.fill(0.0);
    let zip = Zip::indexed(r.columns_mut()).and(evidence.columns());
    let normalize = |j: usize, mut out: ArrayViewMut1<'_, f64>, ev: ArrayView1<'_, f64>| {
        let (lo, hi) = windows[j];
        for i in lo..=hi {
            if row_mass[i] != 0.0 {
                out[i] = ev[i] / row_mass[i];
            }
        }
    };

    #[cfg(feature = "parallel")]
    zip.par_for_each(normalize);

    #[cfg(not(feature = "parallel"))]
    zip.for_each(normalize);
}

/// Re-estimate the lag model from the responsibilities.
pub fn maximization(a: &[f64], b: &[f64], r: ArrayView2<'_, f64>) -> LagModel {
    debug_assert_eq!(r.dim(), (a.len(), b.len()));
    let n = a.len() as f64;

    let mut mu = 0.0;
    Zip::indexed(&r).for_each(|(i, j), &w| {
        mu += (b[j] - a[i]) * w;
    });
    mu /= n;

    let mut var = 0.0;
    Zip::indexed(&r).for_each(|(i, j), &w| {
        let diff = (b[j] - a[i]) - mu;
        var += diff * diff * w;
    });
    var /= n;

    LagModel { mu, var }
}
