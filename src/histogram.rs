//! Fixed-bin probability mass estimation over raw sample slices.
//!
//! Converts a window's contents into a discrete distribution the divergence
//! metric can consume. Bin edges come from the sample slice itself (its own
//! min and max), so the output describes the *shape* of the data over its
//! observed range.

/// Normalized histogram of `samples` using `bin_count` equal-width bins.
///
/// Degenerate inputs map to fixed shapes rather than errors:
/// - empty `samples` (or `bin_count == 0`): every bin is zero
/// - all values identical: full mass (1.0) in the first bin
/// - otherwise: bins span `[min, max]`, a value equal to `max` is clamped
///   into the last bin, and counts are normalized by the sample count so the
///   result sums to 1.0 up to rounding.
///
/// The shapes matter downstream: a constant window scored as anything other
/// than a first-bin point mass would get a different divergence against
/// every live distribution.
pub fn probability_mass(samples: &[f64], bin_count: usize) -> Vec<f64> {
    let mut mass = vec![0.0; bin_count];
    if samples.is_empty() || bin_count == 0 {
        return mass;
    }

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in samples {
        min = min.min(v);
        max = max.max(v);
    }

    if min == max {
        mass[0] = 1.0;
        return mass;
    }

    let width = (max - min) / bin_count as f64;
    for &v in samples {
        let bin = (((v - min) / width).floor() as usize).min(bin_count - 1);
        mass[bin] += 1.0;
    }

    let total = samples.len() as f64;
    for m in mass.iter_mut() {
        *m /= total;
    }
    mass
}
