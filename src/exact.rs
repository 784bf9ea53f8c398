//! Exact strategies: probabilities from exponentiated weights.
//!
//! For labels `c` the arm mass is
//!
//! ```text
//!   m_i = sum_f  b[f][c_f][i] * prod_{l != c_f} sb[f][l]
//! ```
//!
//! with `b = exp(w)` and `sb` the row sums of `b`. The two variants differ only in
//! how they obtain the product over the other labels.
//!
//! Row sums and partition products are held as logarithms, and the sum over
//! partitions is a log-sum-exp. A partition with hundreds of labels has a product
//! far outside `f64` range, but its logarithm is an ordinary number, so the learned
//! spread between arms survives. Masses are only exponentiated relative to the
//! largest one.

use crate::alloc::exp_normalize;
use crate::{ProbabilityStrategy, StrategyKind, WeightTable, MIN_MASS};

/// Exponentiate a log-mass for the diagnostic views, saturating at both ends.
#[inline]
fn mass_from_log(x: f64) -> f64 {
    if x.is_nan() {
        MIN_MASS
    } else {
        x.exp().clamp(MIN_MASS, f64::MAX)
    }
}

/// `ln sum_i exp(xs_i)`, shifted by the max.
fn log_sum_exp(xs: impl Iterator<Item = f64> + Clone) -> f64 {
    let max = xs.clone().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + xs.map(|x| (x - max).exp()).sum::<f64>().ln()
}

/// Relative change of `exp(old)` against `exp(new)`.
#[inline]
fn relative_gap(old: f64, new: f64) -> f64 {
    if old == new {
        0.0
    } else {
        (old - new).exp_m1().abs()
    }
}

/// Log row sums `ln sb`, laid out like the weight table.
#[derive(Debug, Clone)]
pub(crate) struct LogRows {
    lsb: Vec<f64>,
}

impl LogRows {
    pub(crate) fn new(w: &WeightTable) -> Self {
        let mut rows = Self {
            lsb: vec![(w.arms() as f64).ln(); w.rows()],
        };
        rows.refresh_all(w);
        rows
    }

    /// Recompute row `r`; returns its new log sum.
    pub(crate) fn refresh_row(&mut self, w: &WeightTable, r: usize) -> f64 {
        let s = log_sum_exp(w.row_at(r).iter().copied());
        self.lsb[r] = s;
        s
    }

    /// Recompute every row; returns the largest relative change of a row sum.
    pub(crate) fn refresh_all(&mut self, w: &WeightTable) -> f64 {
        let mut drift = 0.0f64;
        for r in 0..w.rows() {
            let old = self.lsb[r];
            let new = self.refresh_row(w, r);
            drift = drift.max(relative_gap(old, new));
        }
        drift
    }

    #[inline]
    pub(crate) fn lsb(&self, r: usize) -> f64 {
        self.lsb[r]
    }

    /// `ln prod_{l != skip} sb[f][l]`
    pub(crate) fn sum_except(&self, w: &WeightTable, f: usize, skip: usize) -> f64 {
        let skip = w.row_index(f, skip);
        w.partition_rows(f)
            .filter(|&r| r != skip)
            .map(|r| self.lsb[r])
            .sum()
    }

    /// `ln prod_l sb[f][l]`
    pub(crate) fn sum_all(&self, w: &WeightTable, f: usize) -> f64 {
        w.partition_rows(f).map(|r| self.lsb[r]).sum()
    }
}

/// `ln m_i` for every arm, given `ln prod_{l != c_f} sb[f][l]` per partition.
fn log_masses(w: &WeightTable, labels: &[usize], others: &[f64], out: &mut [f64]) {
    for (arm, slot) in out.iter_mut().enumerate() {
        let terms = labels
            .iter()
            .zip(others)
            .enumerate()
            .map(|(f, (&c, &o))| w.get(f, c, arm) + o);
        *slot = log_sum_exp(terms);
    }
}

/// Exact probabilities with an incrementally maintained partition product `bf`.
///
/// Cheapest of the three per request. `ln bf[f]` is kept up to date by taking out
/// the stale row sum and adding the fresh one, so rounding error accumulates until
/// [`ProbabilityStrategy::resync`] rebuilds it.
#[derive(Debug, Clone)]
pub struct ExactNonStable {
    rows: LogRows,
    log_bf: Vec<f64>,
}

impl ExactNonStable {
    pub fn new(w: &WeightTable) -> Self {
        let rows = LogRows::new(w);
        let log_bf = (0..w.partitions()).map(|f| rows.sum_all(w, f)).collect();
        Self { rows, log_bf }
    }

    /// Current partition products, as logarithms.
    pub fn log_partition_products(&self) -> &[f64] {
        &self.log_bf
    }

    fn others(&self, w: &WeightTable, labels: &[usize]) -> Vec<f64> {
        labels
            .iter()
            .enumerate()
            .map(|(f, &l)| self.log_bf[f] - self.rows.lsb(w.row_index(f, l)))
            .collect()
    }
}

impl ProbabilityStrategy for ExactNonStable {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ExactNonStable
    }

    fn needs_renormalization(&self) -> bool {
        true
    }

    fn compute_probabilities(&self, w: &WeightTable, labels: &[usize], p: &mut [f64]) {
        log_masses(w, labels, &self.others(w, labels), p);
        exp_normalize(p);
    }

    fn on_reward_applied(&mut self, w: &WeightTable, f: usize, l: usize) {
        let r = w.row_index(f, l);
        let stale = self.rows.lsb(r);
        let fresh = self.rows.refresh_row(w, r);
        self.log_bf[f] += fresh - stale;
    }

    fn resync(&mut self, w: &WeightTable) -> f64 {
        self.rows.refresh_all(w);
        let mut drift = 0.0f64;
        for f in 0..w.partitions() {
            let rebuilt = self.rows.sum_all(w, f);
            drift = drift.max(relative_gap(self.log_bf[f], rebuilt));
            self.log_bf[f] = rebuilt;
        }
        drift
    }

    fn partition_weights(&self, _w: &WeightTable, _labels: &[usize]) -> Vec<f64> {
        self.log_bf.iter().map(|&x| mass_from_log(x)).collect()
    }

    fn clone_box(&self) -> Box<dyn ProbabilityStrategy> {
        Box::new(self.clone())
    }

    fn arm_weights(&self, w: &WeightTable, labels: &[usize]) -> Vec<f64> {
        let mut m = vec![0.0; w.arms()];
        log_masses(w, labels, &self.others(w, labels), &mut m);
        m.into_iter().map(mass_from_log).collect()
    }
}

/// Exact probabilities with the partition product rebuilt on every request.
///
/// `O(F * labels)` per request, but nothing is carried between requests except the
/// row sums themselves, so there is no drift to correct.
#[derive(Debug, Clone)]
pub struct ExactStable {
    rows: LogRows,
}

impl ExactStable {
    pub fn new(w: &WeightTable) -> Self {
        Self {
            rows: LogRows::new(w),
        }
    }

    fn others(&self, w: &WeightTable, labels: &[usize]) -> Vec<f64> {
        labels
            .iter()
            .enumerate()
            .map(|(f, &l)| self.rows.sum_except(w, f, l))
            .collect()
    }
}

impl ProbabilityStrategy for ExactStable {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ExactStable
    }

    fn needs_renormalization(&self) -> bool {
        true
    }

    fn compute_probabilities(&self, w: &WeightTable, labels: &[usize], p: &mut [f64]) {
        log_masses(w, labels, &self.others(w, labels), p);
        exp_normalize(p);
    }

    fn on_reward_applied(&mut self, w: &WeightTable, f: usize, l: usize) {
        self.rows.refresh_row(w, w.row_index(f, l));
    }

    fn resync(&mut self, w: &WeightTable) -> f64 {
        self.rows.refresh_all(w)
    }

    fn partition_weights(&self, w: &WeightTable, _labels: &[usize]) -> Vec<f64> {
        (0..w.partitions())
            .map(|f| mass_from_log(self.rows.sum_all(w, f)))
            .collect()
    }

    fn clone_box(&self) -> Box<dyn ProbabilityStrategy> {
        Box::new(self.clone())
    }

    fn arm_weights(&self, w: &WeightTable, labels: &[usize]) -> Vec<f64> {
        let mut m = vec![0.0; w.arms()];
        log_masses(w, labels, &self.others(w, labels), &mut m);
        m.into_iter().map(mass_from_log).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renorm::renormalize;

    fn table() -> WeightTable {
        let mut w = WeightTable::new(3, &[2, 3]);
        w.add(0, 0, 0, 0.4);
        w.add(0, 1, 2, -0.3);
        w.add(1, 2, 1, 0.9);
        w.add(1, 0, 0, 0.2);
        w
    }

    fn direct(w: &WeightTable, labels: &[usize]) -> Vec<f64> {
        let mut m = vec![0.0; w.arms()];
        for (f, &c) in labels.iter().enumerate() {
            let mut others = 1.0;
            for l in 0..w.label_count(f) {
                if l != c {
                    others *= w.row(f, l).iter().map(|x| x.exp()).sum::<f64>();
                }
            }
            for (i, mi) in m.iter_mut().enumerate() {
                *mi += w.get(f, c, i).exp() * others;
            }
        }
        let s: f64 = m.iter().sum();
        m.into_iter().map(|x| x / s).collect()
    }

    fn softmax(row: &[f64]) -> Vec<f64> {
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let e: Vec<f64> = row.iter().map(|x| (x - max).exp()).collect();
        let s: f64 = e.iter().sum();
        e.into_iter().map(|x| x / s).collect()
    }

    fn probs(s: &dyn ProbabilityStrategy, w: &WeightTable, labels: &[usize]) -> Vec<f64> {
        let mut p = vec![0.0; w.arms()];
        s.compute_probabilities(w, labels, &mut p);
        p
    }

    #[test]
    fn both_variants_match_direct_evaluation() {
        let w = table();
        let labels = [1, 2];
        let want = direct(&w, &labels);
        let a = probs(&ExactNonStable::new(&w), &w, &labels);
        let b = probs(&ExactStable::new(&w), &w, &labels);
        for i in 0..3 {
            assert!((a[i] - want[i]).abs() < 1e-12, "{a:?} vs {want:?}");
            assert!((b[i] - want[i]).abs() < 1e-12, "{b:?} vs {want:?}");
        }
    }

    #[test]
    fn initial_partition_product_is_k_to_the_labels() {
        let w = WeightTable::new(3, &[2, 4]);
        let s = ExactNonStable::new(&w);
        let got = s.log_partition_products();
        assert!((got[0] - 9f64.ln()).abs() < 1e-12);
        assert!((got[1] - 81f64.ln()).abs() < 1e-12);
        let pw = s.partition_weights(&w, &[0, 0]);
        assert!((pw[0] - 9.0).abs() < 1e-9 && (pw[1] - 81.0).abs() < 1e-9);
    }

    #[test]
    fn incremental_update_tracks_rebuild() {
        let mut w = WeightTable::new(3, &[2, 3]);
        let mut s = ExactNonStable::new(&w);
        for step in 0..200usize {
            let f = step % 2;
            let l = (step / 2) % w.label_count(f);
            let arm = step % 3;
            w.add(f, l, arm, 0.01);
            s.on_reward_applied(&w, f, l);
        }
        let incremental = s.log_partition_products().to_vec();
        let drift = s.resync(&w);
        assert!(drift < 1e-12, "drift={drift}");
        for (a, b) in incremental.iter().zip(s.log_partition_products()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn resync_reports_injected_drift() {
        let w = WeightTable::new(2, &[2]);
        let mut s = ExactNonStable::new(&w);
        s.log_bf[0] += 1.5f64.ln();
        let drift = s.resync(&w);
        assert!((drift - 0.5).abs() < 1e-12, "drift={drift}");
        assert_eq!(s.resync(&w), 0.0);
    }

    #[test]
    fn underflowing_rows_stay_finite() {
        let mut w = WeightTable::new(2, &[2]);
        for x in w.row_mut(0, 0) {
            *x = -1.0e6;
        }
        let s = ExactStable::new(&w);
        let p = probs(&s, &w, &[0]);
        assert!(p.iter().all(|x| x.is_finite()));
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(s.partition_weights(&w, &[0])[0] > 0.0);
    }

    #[test]
    fn wide_partition_reduces_to_softmax_of_current_row() {
        // 400 labels: prod sb is 10^399 before any learning, far past f64::MAX.
        let mut w = WeightTable::new(10, &[400]);
        w.add(0, 0, 3, 120.0);
        for l in 1..400 {
            w.add(0, l, l % 10, 0.5);
        }
        assert!(renormalize(&mut w).is_some());

        let want = softmax(w.row(0, 0));
        assert!(want[3] > 0.999);
        for s in [
            &ExactStable::new(&w) as &dyn ProbabilityStrategy,
            &ExactNonStable::new(&w),
        ] {
            let p = probs(s, &w, &[0]);
            for (a, b) in p.iter().zip(&want) {
                assert!((a - b).abs() < 1e-12, "{:?}: {p:?} vs {want:?}", s.kind());
            }
        }
    }

    #[test]
    fn wide_partition_dominates_a_narrow_one_without_overflow() {
        let mut w = WeightTable::new(10, &[400, 2]);
        w.add(0, 0, 0, 1.0);
        w.add(1, 0, 1, 5.0);
        // The 400-label partition carries a factor of 10^399 against 10^1, so the
        // blend is its current row's softmax: e / (e + 9) for arm 0.
        let want0 = 1f64.exp() / (1f64.exp() + 9.0);
        for s in [
            &ExactStable::new(&w) as &dyn ProbabilityStrategy,
            &ExactNonStable::new(&w),
        ] {
            let p = probs(s, &w, &[0, 0]);
            assert!((p[0] - want0).abs() < 1e-12, "{:?}: {p:?}", s.kind());
            assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
    }
}
