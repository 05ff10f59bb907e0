//! Bounded neighbor search: restrict the E-step to a row window per column.
//!
//! # The Heuristic
//!
//! For column j, the rows of `a` that can plausibly explain `b[j]` sit around
//! `b[j] - μ`. Starting at the closest row, the window grows one row at a
//! time toward whichever neighbor currently carries more responsibility in
//! column j, until the mass collected in the window reaches `1 - ε` or the
//! window spans every row.
//!
//! ```text
//!   a:   0   1   2   3   4
//!            [   *   ]          * = closest to b[j] - μ
//!        [       *   ]          grow toward the heavier side
//! ```
//!
//! # Approximation
//!
//! This is not an exact reformulation of the full E-step. Evidence outside
//! the window is dropped. Unless the window spans every row, at most ε of
//! the column's responsibility mass, as measured on the *previous* iteration,
//! is left outside; the rows that lose it are renormalized over what remains.
//! Because responsibilities are multiplicative, an entry dropped once stays
//! zero for the rest of the fit. With small ε and a well-localized posterior
//! the two paths agree; on ambiguous data they can converge to different
//! fixed points.
//!
//! # Cost
//!
//! The kernel is only evaluated inside the windows, so an E-step costs
//! O(Σ window sizes) exponentials instead of N·M. When `a` is ascending the
//! seed row is found by binary search; otherwise by a linear scan.

use ndarray::ArrayView2;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Strategy for the row range touched by each E-step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum NeighborSearch {
    /// Every row contributes to every column.
    #[default]
    Full,
    /// Greedy per-column windows holding about `1 - epsilon` of the column mass.
    Windowed {
        /// Mass allowed to fall outside each window, in (0, 1).
        epsilon: f64,
    },
}

/// Index of the element of `a` closest to `target`.
///
/// Ties resolve to the first index. Returns `None` for an empty slice.
pub fn find_closest(a: &[f64], target: f64) -> Option<usize> {
    let mut best = f64::MAX;
    let mut idx = None;
    for (i, &x) in a.iter().enumerate() {
        let dist = (x - target).abs();
        if dist < best {
            best = dist;
            idx = Some(i);
        }
    }
    idx
}

/// [`find_closest`] for ascending `a`, in O(log N).
///
/// Same tie rule: among equally close elements the lowest index wins.
pub fn find_closest_sorted(a: &[f64], target: f64) -> Option<usize> {
    let last = a.len().checked_sub(1)?;
    let above = a.partition_point(|&x| x < target);
    let best = if above == 0 {
        0
    } else if above > last || target - a[above - 1] <= a[above] - target {
        above - 1
    } else {
        above
    };
    // First of any run of duplicates
    Some(a.partition_point(|&x| x < a[best]))
}

/// Inclusive row window `(lo, hi)` for column `j`.
///
/// `r` is the responsibility matrix the window is grown against, `b_j` the
/// value of column `j` and `mu` the current mean offset. The seed row's own
/// mass counts toward the `1 - epsilon` target; ties between the two open
/// boundaries extend toward the lower one.
///
/// # Panics
///
/// Panics if `a` is empty.
pub fn greedy_bound(
    a: &[f64],
    r: ArrayView2<'_, f64>,
    j: usize,
    b_j: f64,
    mu: f64,
    epsilon: f64,
) -> (usize, usize) {
    let seed = find_closest(a, b_j - mu).unwrap_or(0);
    grow_window(r, j, seed, epsilon)
}

fn grow_window(r: ArrayView2<'_, f64>, j: usize, seed: usize, epsilon: f64) -> (usize, usize) {
    let last = r.nrows() - 1;
    let (mut lo, mut hi) = (seed, seed);
    let mut mass = r[[seed, j]];

    while mass < 1.0 - epsilon {
        if lo == 0 && hi == last {
            break;
        }

        let next = if lo == 0 {
            hi += 1;
            hi
        } else if hi == last || r[[lo - 1, j]] >= r[[hi + 1, j]] {
            lo -= 1;
            lo
        } else {
            hi += 1;
            hi
        };
        mass += r[[next, j]];
    }

    (lo, hi)
}

/// Windows for every column of `b`.
///
/// Equal to [`greedy_bound`] per column. Columns are independent and run in
/// parallel under the `parallel` feature.
pub fn column_windows(
    a: &[f64],
    b: &[f64],
    r: ArrayView2<'_, f64>,
    mu: f64,
    epsilon: f64,
) -> Vec<(usize, usize)> {
    debug_assert_eq!(r.dim(), (a.len(), b.len()));

    let ascending = a.windows(2).all(|w| w[0] <= w[1]);
    let window = |j: usize, b_j: f64| {
        let target = b_j - mu;
        let seed = if ascending {
            find_closest_sorted(a, target)
        } else {
            find_closest(a, target)
        };
        grow_window(r, j, seed.unwrap_or(0), epsilon)
    };

    #[cfg(feature = "parallel")]
    let windows = b.par_iter().enumerate().map(|(j, &b_j)| window(j, b_j)).collect();

    #[cfg(not(feature = "parallel"))]
    let windows = b.iter().enumerate().map(|(j, &b_j)| window(j, b_j)).collect();

    windows
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn test_find_closest() {
        let a = [0.0, 1.0, 2.0, 5.0];
        assert_eq!(find_closest(&a, 1.2), Some(1));
        assert_eq!(find_closest(&a, 100.0), Some(3));
        assert_eq!(find_closest(&a, -3.0), Some(0));
        assert_eq!(find_closest(&[], 1.0), None);
    }

    #[test]
    fn test_find_closest_tie_takes_first() {
        let a = [0.0, 2.0];
        assert_eq!(find_closest(&a, 1.0), Some(0));
    }

    #[test]
    fn test_find_closest_sorted_agrees_with_linear_scan() {
        let a = [0.0, 1.0, 1.0, 2.0, 4.0, 4.0, 4.0, 9.0];
        for target in [-3.0, 0.0, 0.5, 1.0, 1.5, 2.9, 3.0, 4.0, 6.5, 7.0, 20.0] {
            assert_eq!(
                find_closest_sorted(&a, target),
                find_closest(&a, target),
                "target {target}"
            );
        }
        assert_eq!(find_closest_sorted(&a, 1.4), Some(1));
        assert_eq!(find_closest_sorted(&[], 1.0), None);
    }

    #[test]
    fn test_column_windows_match_greedy_bound() {
        let a = [0.0, 2.0, 4.0, 6.0, 8.0];
        let b = [1.0, 3.5, 8.5];
        let r = array![
            [0.5, 0.0, 0.1],
            [0.3, 0.2, 0.1],
            [0.1, 0.5, 0.1],
            [0.1, 0.2, 0.3],
            [0.0, 0.1, 0.4],
        ];
        let windows = column_windows(&a, &b, r.view(), 0.5, 0.2);
        for (j, &b_j) in b.iter().enumerate() {
            assert_eq!(windows[j], greedy_bound(&a, r.view(), j, b_j, 0.5, 0.2));
        }

        // Unsorted input falls back to the linear scan
        let shuffled = [4.0, 0.0, 8.0, 2.0, 6.0];
        let windows = column_windows(&shuffled, &b, r.view(), 0.5, 0.2);
        for (j, &b_j) in b.iter().enumerate() {
            assert_eq!(
                windows[j],
                greedy_bound(&shuffled, r.view(), j, b_j, 0.5, 0.2)
            );
        }
    }

    #[test]
    fn test_greedy_bound_uniform_grows_to_target() {
        let a = [0.0, 1.0, 2.0, 3.0, 4.0];
        let r = Array2::from_elem((5, 5), 0.2);
        // Seed row 2 (0.2), then ties go low: 1, 0, then forced high: 3 -> 0.8
        let (lo, hi) = greedy_bound(&a, r.view(), 2, 2.0, 0.0, 0.2);
        assert_eq!((lo, hi), (0, 3));
    }

    #[test]
    fn test_greedy_bound_concentrated_mass_stays_put() {
        let a = [0.0, 1.0, 2.0, 3.0, 4.0];
        let mut r = Array2::<f64>::zeros((5, 2));
        r[[0, 0]] = 1.0;
        r[[1, 1]] = 1.0;
        assert_eq!(greedy_bound(&a, r.view(), 0, 0.0, 0.0, 0.2), (0, 0));
        assert_eq!(greedy_bound(&a, r.view(), 1, 1.0, 0.0, 0.2), (1, 1));
    }

    #[test]
    fn test_greedy_bound_follows_heavier_side() {
        let a = [0.0, 1.0, 2.0, 3.0];
        let r = array![[0.0], [0.1], [0.2], [0.6]];
        // Seed at row 1, neighbor 2 heavier than neighbor 0
        let (lo, hi) = greedy_bound(&a, r.view(), 0, 1.0, 0.0, 0.1);
        assert_eq!((lo, hi), (1, 3));
    }

    #[test]
    fn test_greedy_bound_stops_at_both_edges() {
        let a = [0.0, 1.0, 2.0];
        let r = Array2::<f64>::zeros((3, 1));
        assert_eq!(greedy_bound(&a, r.view(), 0, 1.0, 0.0, 0.2), (0, 2));
    }

    #[test]
    fn test_greedy_bound_uses_mu_shift() {
        let a = [0.0, 10.0, 20.0];
        let r = array![[0.0], [0.0], [1.0]];
        // b_j - mu = 25 - 5 = 20 -> seed row 2
        assert_eq!(greedy_bound(&a, r.view(), 0, 25.0, 5.0, 0.2), (2, 2));
    }

    #[test]
    fn test_column_windows_len() {
        let a = [0.0, 1.0];
        let b = [0.0, 1.0, 2.0];
        let r = Array2::from_elem((2, 3), 1.0 / 3.0);
        let windows = column_windows(&a, &b, r.view(), 0.0, 0.2);
        assert_eq!(windows.len(), 3);
        for (lo, hi) in windows {
            assert!(lo <= hi && hi < 2);
        }
    }
}
