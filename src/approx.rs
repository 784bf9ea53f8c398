//! Log-domain approximate strategy.
//!
//! Replaces every log-sum-exp of the exact formula with a plain `max`:
//!
//! ```text
//!   mw[f][l] = max_i w[f][l][i]
//!   a_i      = max_f ( w[f][c_f][i] + sum_{l != c_f} mw[f][l] )
//!   p_i      = exp(a_i - max_j a_j) / Z
//! ```
//!
//! `ln p_exact_i - ln p_approx_i` is bounded in magnitude by
//! `ln F + max_f (labels_f - 1) ln K`, and the approximation is exact when `F == 1`.
//! No unbounded value is ever exponentiated, so weights never need renormalizing.

use crate::alloc::exp_normalize;
use crate::{ProbabilityStrategy, StrategyKind, WeightTable};

fn row_max(row: &[f64]) -> f64 {
    row.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Max-surrogate strategy.
#[derive(Debug, Clone)]
pub struct ApproximateStrategy {
    mw: Vec<f64>,
}

impl ApproximateStrategy {
    pub fn new(w: &WeightTable) -> Self {
        Self {
            mw: (0..w.rows()).map(|r| row_max(w.row_at(r))).collect(),
        }
    }

    /// `sum_{l != c_f} mw[f][l]` for each partition.
    fn deltas(&self, w: &WeightTable, labels: &[usize]) -> Vec<f64> {
        labels
            .iter()
            .enumerate()
            .map(|(f, &c)| {
                let skip = w.row_index(f, c);
                w.partition_rows(f)
                    .filter(|&r| r != skip)
                    .map(|r| self.mw[r])
                    .sum()
            })
            .collect()
    }

    fn arm_score(w: &WeightTable, labels: &[usize], deltas: &[f64], arm: usize) -> f64 {
        labels
            .iter()
            .zip(deltas)
            .enumerate()
            .map(|(f, (&c, &d))| w.get(f, c, arm) + d)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

impl ProbabilityStrategy for ApproximateStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Approximate
    }

    fn needs_renormalization(&self) -> bool {
        false
    }

    fn compute_probabilities(&self, w: &WeightTable, labels: &[usize], p: &mut [f64]) {
        let deltas = self.deltas(w, labels);
        for (arm, slot) in p.iter_mut().enumerate() {
            *slot = Self::arm_score(w, labels, &deltas, arm);
        }
        exp_normalize(p);
    }

    fn on_reward_applied(&mut self, w: &WeightTable, f: usize, l: usize) {
        let r = w.row_index(f, l);
        self.mw[r] = row_max(w.row_at(r));
    }

    fn resync(&mut self, w: &WeightTable) -> f64 {
        let mut drift = 0.0f64;
        for r in 0..w.rows() {
            let m = row_max(w.row_at(r));
            if m != self.mw[r] {
                drift = drift.max((m - self.mw[r]).abs());
            }
            self.mw[r] = m;
        }
        drift
    }

    fn partition_weights(&self, w: &WeightTable, labels: &[usize]) -> Vec<f64> {
        self.deltas(w, labels)
            .into_iter()
            .enumerate()
            .map(|(f, d)| d + self.mw[w.row_index(f, labels[f])])
            .collect()
    }

    fn clone_box(&self) -> Box<dyn ProbabilityStrategy> {
        Box::new(self.clone())
    }

    fn arm_weights(&self, w: &WeightTable, labels: &[usize]) -> Vec<f64> {
        let deltas = self.deltas(w, labels);
        (0..w.arms())
            .map(|arm| Self::arm_score(w, labels, &deltas, arm))
            .collect()
    }
}
