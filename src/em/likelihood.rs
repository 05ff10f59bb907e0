//! Goodness of fit of a converged lag model.
//!
//! Both scores start from the evidence matrix of the final model and the
//! final responsibilities, and marginalize over `a`:
//!
//! ```text
//! cⱼ = Σᵢ E[i][j]
//! log-likelihood = Σⱼ ln cⱼ
//! likelihood     = Πⱼ cⱼ
//! ```
//!
//! The product underflows to 0 quickly once M grows past a few hundred
//! columns; prefer [`log_likelihood`] for anything but small diagnostics.
//! A column with no mass contributes `ln 0 = -∞`.

use ndarray::{Array1, ArrayView2, Axis};

use super::kernel::normal_matrix;
use super::lag_em::LagModel;

fn column_mass(a: &[f64], b: &[f64], r: ArrayView2<'_, f64>, model: LagModel) -> Array1<f64> {
    normal_matrix(a, b, r, model.mu, model.var).sum_axis(Axis(0))
}

/// Sum of log column masses.
pub fn log_likelihood(a: &[f64], b: &[f64], r: ArrayView2<'_, f64>, model: LagModel) -> f64 {
    column_mass(a, b, r, model).iter().map(|c| c.ln()).sum()
}

/// Product of column masses.
pub fn likelihood(a: &[f64], b: &[f64], r: ArrayView2<'_, f64>, model: LagModel) -> f64 {
    column_mass(a, b, r, model).iter().product()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_log_matches_product_on_small_input() {
        let a = [0.0, 1.0, 2.0];
        let b = [0.5, 1.5];
        let r = Array2::from_elem((3, 2), 0.5);
        let model = LagModel { mu: 0.5, var: 0.8 };

        let ll = log_likelihood(&a, &b, r.view(), model);
        let l = likelihood(&a, &b, r.view(), model);
        assert!((ll - l.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_empty_column_is_negative_infinity() {
        let a = [0.0];
        let b = [0.0, 1.0];
        let mut r = Array2::zeros((1, 2));
        r[[0, 0]] = 1.0;
        let model = LagModel { mu: 0.0, var: 1.0 };

        assert_eq!(log_likelihood(&a, &b, r.view(), model), f64::NEG_INFINITY);
        assert_eq!(likelihood(&a, &b, r.view(), model), 0.0);
    }

    #[test]
    fn test_single_exact_match() {
        let a = [2.0];
        let b = [5.0];
        let r = Array2::from_elem((1, 1), 1.0);
        let model = LagModel { mu: 3.0, var: 1.0 };
        let expected = -0.5 * (2.0 * std::f64::consts::PI).ln();
        assert!((log_likelihood(&a, &b, r.view(), model) - expected).abs() < 1e-12);
    }
}
