//! Normalization helpers (masses → probabilities, log-scores → probabilities).
//!
//! Both helpers work in place on a caller-owned buffer and never allocate. Neither
//! ever produces NaN: degenerate totals are clamped.

use crate::{EXP_CEILING, MIN_MASS};

/// Divide nonnegative masses by their total.
///
/// The total is clamped to [`MIN_MASS`] before dividing. If it is not finite the
/// result falls back to uniform.
pub fn normalize_masses(p: &mut [f64]) {
    if p.is_empty() {
        return;
    }
    let total: f64 = p.iter().sum();
    if !total.is_finite() {
        uniform(p);
        return;
    }
    let total = total.max(MIN_MASS);
    for x in p.iter_mut() {
        *x /= total;
    }
}

/// Turn log-domain scores into a distribution using the max-trick.
///
/// Exponents are clamped to `[-EXP_CEILING, EXP_CEILING]` so every entry stays
/// strictly positive and finite.
pub fn exp_normalize(scores: &mut [f64]) {
    if scores.is_empty() {
        return;
    }
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        uniform(scores);
        return;
    }
    for x in scores.iter_mut() {
        let z = *x - max;
        // NaN scores get the floor rather than poisoning the total.
        let z = if z.is_nan() { -EXP_CEILING } else { z };
        *x = z.clamp(-EXP_CEILING, EXP_CEILING).exp();
    }
    normalize_masses(scores);
}

fn uniform(p: &mut [f64]) {
    let u = 1.0 / p.len() as f64;
    p.fill(u);
}
