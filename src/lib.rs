//! # lagem
//!
//! Lag estimation between two event sequences: a single-Gaussian lag model
//! fitted by Expectation-Maximization, with soft and hard correspondences
//! between the events.
//!
//! The core fit is serial; the `parallel` feature spreads evidence and E-step
//! rows over rayon without changing results.

/// Lag EM engine: kernel, E/M steps, windows, convergence loop, restarts.
pub mod em;
/// Error types used across `lagem`.
pub mod error;
pub mod metrics;


pub use em::{
    FitStatus, LagEm, LagEstimator, LagFit, LagModel, LagScore, MultiStart, MultiStartFit,
    NeighborSearch, SoftAlignment,
};
pub use error::{Error, Result};
pub use metrics::{lag_range, lag_std, lag_variance, pair_f1, pair_precision, pair_recall};
