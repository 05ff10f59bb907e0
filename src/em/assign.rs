//! Hard assignments from the final responsibility matrix.

use ndarray::ArrayView2;

/// Best match in `b` for every row of `r` that carries any responsibility.
///
/// For row i the pair `(i, j*)` is emitted with `j* = argmax_j r[i][j]`
/// (first maximum wins) only if `r[i][j*] > 0`. Rows come out in ascending
/// order; all-zero and NaN rows are skipped.
pub fn extract_assignments(r: ArrayView2<'_, f64>) -> Vec<(usize, usize)> {
    r.outer_iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let mut best = 0.0;
            let mut idx = None;
            for (j, &w) in row.iter().enumerate() {
                if w > best {
                    best = w;
                    idx = Some(j);
                }
            }
            idx.map(|j| (i, j))
        })
        .collect()
}

/// Lag samples `b[j] - a[i]` for each assigned pair.
///
/// # Panics
///
/// Panics if a pair indexes outside `a` or `b`.
pub fn matched_lags(a: &[f64], b: &[f64], assignments: &[(usize, usize)]) -> Vec<f64> {
    assignments.iter().map(|&(i, j)| b[j] - a[i]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_extract_assignments_argmax() {
        let r = array![[0.1, 0.7, 0.2], [0.6, 0.3, 0.1]];
        assert_eq!(extract_assignments(r.view()), vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_extract_assignments_skips_zero_rows() {
        let r = array![[0.0, 0.0], [0.0, 1.0], [0.0, 0.0]];
        assert_eq!(extract_assignments(r.view()), vec![(1, 1)]);
    }

    #[test]
    fn test_extract_assignments_tie_takes_first() {
        let r = array![[0.5, 0.5]];
        assert_eq!(extract_assignments(r.view()), vec![(0, 0)]);
    }

    #[test]
    fn test_extract_assignments_nan_row_skipped() {
        let r = array![[f64::NAN, f64::NAN], [0.2, 0.8]];
        assert_eq!(extract_assignments(r.view()), vec![(1, 1)]);
    }

    #[test]
    fn test_matched_lags() {
        let a = [0.0, 10.0];
        let b = [3.0, 12.5, 20.0];
        let lags = matched_lags(&a, &b, &[(0, 0), (1, 1)]);
        assert_eq!(lags, vec![3.0, 2.5]);
    }
}
