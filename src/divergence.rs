//! Kullback-Leibler divergence between discrete probability mass sequences.
//!
//! The additive epsilon keeps the log ratio defined when either side has an
//! empty bin. Smoothed masses no longer sum to exactly 1, so scores are
//! approximate relative measures suited to ranking and thresholding, not
//! calibrated information-theoretic quantities.

use crate::error::{DriftError, DriftResult};

/// Default smoothing constant added to every bin on both sides.
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// Computes `sum over i of p[i] * ln((p[i] + epsilon) / (q[i] + epsilon))`.
///
/// Asymmetric: `kl_divergence(p, q)` and `kl_divergence(q, p)` differ in
/// general. Inputs must be the same length; a mismatch is rejected rather
/// than truncated to the shorter side.
pub fn kl_divergence(p: &[f64], q: &[f64], epsilon: f64) -> DriftResult<f64> {
    if p.len() != q.len() {
        return Err(DriftError::HistogramLengthMismatch {
            left: p.len(),
            right: q.len(),
        });
    }
    let score = p
        .iter()
        .zip(q.iter())
        .map(|(&pi, &qi)| pi * ((pi + epsilon) / (qi + epsilon)).ln())
        .sum();
    Ok(score)
}
