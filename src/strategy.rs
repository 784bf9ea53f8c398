//! Probability strategies: how weights become a per-arm distribution.
//!
//! Every strategy reads the same [`WeightTable`] and keeps its own derived aggregates
//! (log row sums, log partition products, or row maxima). The engine
//! tells a strategy which rows changed; the strategy decides how much to recompute.
//!
//! Contract shared by all implementations:
//! - `compute_probabilities` writes a distribution (nonnegative, sums to 1) that
//!   depends only on the table, the derived state, and the labels.
//! - Masses are combined as logarithms and only exponentiated relative to the
//!   largest, so wide partitions neither overflow nor underflow.

use crate::{ApproximateStrategy, ExactNonStable, ExactStable, StrategyKind, WeightTable};

/// Capability set of a probability strategy.
pub trait ProbabilityStrategy: std::fmt::Debug + Send {
    /// Which variant this is.
    fn kind(&self) -> StrategyKind;

    /// Whether the engine must renormalize weights after each reward.
    fn needs_renormalization(&self) -> bool;

    /// Write the distribution for `labels` into `p` (length `K`).
    ///
    /// `labels` must already be validated against the table.
    fn compute_probabilities(&self, w: &WeightTable, labels: &[usize], p: &mut [f64]);

    /// Row `(f, l)` of `w` changed; refresh whatever depends on it.
    fn on_reward_applied(&mut self, w: &WeightTable, f: usize, l: usize);

    /// Rebuild every derived aggregate from `w`.
    ///
    /// Returns the largest relative difference between the previous and rebuilt
    /// aggregates (0 when nothing had drifted).
    fn resync(&mut self, w: &WeightTable) -> f64;

    /// Every row of `w` was shifted. Defaults to a full rebuild.
    fn on_renormalized(&mut self, w: &WeightTable) {
        self.resync(w);
    }

    /// Aggregate weight of each partition under `labels` (diagnostics only).
    fn partition_weights(&self, w: &WeightTable, labels: &[usize]) -> Vec<f64>;

    /// Blended (unnormalized) weight of each arm under `labels` (diagnostics only).
    fn arm_weights(&self, w: &WeightTable, labels: &[usize]) -> Vec<f64>;

    /// Clone behind the trait object, preserving any accumulated drift.
    fn clone_box(&self) -> Box<dyn ProbabilityStrategy>;
}

impl Clone for Box<dyn ProbabilityStrategy> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Build the strategy for `kind`, with aggregates consistent with `w`.
pub fn build_strategy(kind: StrategyKind, w: &WeightTable) -> Box<dyn ProbabilityStrategy> {
    match kind {
        StrategyKind::ExactNonStable => Box::new(ExactNonStable::new(w)),
        StrategyKind::ExactStable => Box::new(ExactStable::new(w)),
        StrategyKind::Approximate => Box::new(ApproximateStrategy::new(w)),
    }
}
