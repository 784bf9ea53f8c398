//! Overflow guard for the exact strategies.
//!
//! Weights only ever grow under nonnegative rewards, and `exp(w)` overflows past
//! ~709. Renormalization finds the smallest `adjustment >= 0` such that
//!
//! ```text
//!   w[f][l][i] - adjustment / labels_f <= WEIGHT_CEILING   for all f, l, i
//! ```
//!
//! and subtracts `adjustment / labels_f` from every weight of partition `f`. Each
//! partition's product of row sums then shrinks by the same factor
//! `exp(-adjustment)`, so the blended distribution is unchanged.

use crate::{WeightTable, WEIGHT_CEILING};

/// Shift required to bring every weight under the ceiling (0 if none is needed).
pub fn required_adjustment(w: &WeightTable) -> f64 {
    let mut adjustment = 0.0f64;
    for f in 0..w.partitions() {
        let n = w.label_count(f) as f64;
        for r in w.partition_rows(f) {
            for &x in w.row_at(r) {
                let need = n * (x - WEIGHT_CEILING);
                if need > adjustment {
                    adjustment = need;
                }
            }
        }
    }
    adjustment
}

/// Apply the shift in place. Returns the adjustment used, or `None` when the table
/// was already under the ceiling and nothing changed.
pub fn renormalize(w: &mut WeightTable) -> Option<f64> {
    let adjustment = required_adjustment(w);
    if adjustment <= 0.0 || !adjustment.is_finite() {
        return None;
    }
    for f in 0..w.partitions() {
        let n = w.label_count(f) as f64;
        w.shift_partition_down(f, adjustment / n);
    }
    Some(adjustment)
}
