//! Lag estimation between two event sequences.
//!
//! Given events `a` (e.g. triggers) and `b` (e.g. responses), estimate the
//! delay μ and jitter σ between them, and which response belongs to which
//! trigger.
//!
//! ## Soft vs Hard Correspondence
//!
//! The fit never commits to a matching while it runs. It keeps a
//! **responsibility matrix** R, where `R[i][j]` is the probability that
//! `b[j]` answers `a[i]`, and only at the end reads off the most probable
//! partner for each `a[i]`. Soft correspondences let an ambiguous early
//! guess be revised as the lag estimate sharpens.
//!
//! ## Components
//!
//! | Step | Function | Cost |
//! |------|----------|------|
//! | Evidence | [`normal_matrix`] / [`normal_matrix_windowed`] | O(N·M) / O(Σ window) |
//! | E-step | [`expectation`] / [`expectation_windowed`] | O(N·M) / O(Σ window) |
//! | Windows | [`column_windows`] | O(M·log N) seeds + window growth |
//! | M-step | [`maximization`] | O(N·M) |
//! | Assignments | [`extract_assignments`] | O(N·M) |
//! | Score | [`log_likelihood`] / [`likelihood`] | O(N·M) |
//!
//! [`LagEm`] runs the loop; [`MultiStart`] wraps it with random restarts.
//!
//! ## Usage
//!
//! ```rust
//! use lagem::em::{LagEm, FitStatus};
//!
//! let triggers = [0.0, 10.0, 20.0, 30.0, 40.0];
//! let responses = [3.1, 12.8, 23.15, 32.9, 43.05];
//!
//! let fit = LagEm::new(0.0, 4.0).fit(&triggers, &responses).unwrap();
//! assert_eq!(fit.status, FitStatus::Converged);
//! assert!((fit.mu - 3.0).abs() < 0.05);
//! assert_eq!(fit.assignments[2], (2, 2));
//! ```

mod assign;
mod kernel;
mod lag_em;
mod likelihood;
mod multistart;
mod steps;
mod traits;
mod window;

pub use assign::{extract_assignments, matched_lags};
pub use kernel::{gaussian_weight, normal_matrix, normal_matrix_windowed};
pub use lag_em::{FitStatus, LagEm, LagFit, LagModel, LagScore};
pub use likelihood::{likelihood, log_likelihood};
pub use multistart::{MultiStart, MultiStartFit};
pub use steps::{expectation, expectation_windowed, maximization};
pub use traits::{LagEstimator, SoftAlignment};
pub use window::{column_windows, find_closest, find_closest_sorted, greedy_bound, NeighborSearch};
