//! Engine configuration.
//!
//! Like the other policy configs in this crate, `Exp4Config` is a plain struct with a
//! deterministic `Default`. It is validated once, when the engine is built.

use crate::Exp4Error;

/// Which arithmetic is used to turn weights into a probability vector.
///
/// All three agree on small tables; they differ in cost and in how they behave over
/// very long runs. Chosen once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StrategyKind {
    /// Exponentiated weights with an incrementally maintained per-partition product.
    ///
    /// `O(F)` per arm. The product is updated by divide/multiply and can drift; see
    /// [`Exp4Config::resync_every`].
    ExactNonStable,
    /// Exponentiated weights; the per-partition product is rebuilt on every request.
    #[default]
    ExactStable,
    /// Log-domain scores combined with `max` instead of log-sum-exp.
    ///
    /// Never exponentiates unbounded values, so it skips renormalization entirely.
    Approximate,
}

/// Configuration for [`Exp4`][crate::Exp4].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Exp4Config {
    /// Time horizon `T` (used only for the automatic exploration rate).
    pub horizon: usize,
    /// Number of arms `K`.
    pub arms: usize,
    /// Label count per partition. Its length is the partition count `F`.
    pub label_counts: Vec<usize>,
    /// Seed for the sampler's RNG.
    pub seed: u64,
    /// Exploration rate. `None` derives `sqrt(K ln N / T)` with `N = sum_f K^labels_f`.
    pub gamma: Option<f64>,
    /// Probability arithmetic.
    pub strategy: StrategyKind,
    /// Rebuild every derived aggregate from the weights after this many rewards.
    ///
    /// `None` disables the periodic rebuild. Only the non-stable strategy carries state
    /// that can drift; for the others a rebuild is a no-op in value.
    pub resync_every: Option<u64>,
}

impl Default for Exp4Config {
    fn default() -> Self {
        Self {
            horizon: 1_000,
            arms: 2,
            label_counts: vec![1],
            seed: 0,
            gamma: None,
            strategy: StrategyKind::default(),
            resync_every: Some(4_096),
        }
    }
}

impl Exp4Config {
    /// Partition count `F`.
    pub fn partitions(&self) -> usize {
        self.label_counts.len()
    }

    /// Check dimensions and the explicit exploration rate.
    pub fn validate(&self) -> Result<(), Exp4Error> {
        if self.arms == 0 {
            return Err(Exp4Error::NoArms);
        }
        if self.label_counts.is_empty() {
            return Err(Exp4Error::NoPartitions);
        }
        if let Some(partition) = self.label_counts.iter().position(|&n| n == 0) {
            return Err(Exp4Error::EmptyPartition { partition });
        }
        if self.horizon == 0 {
            return Err(Exp4Error::ZeroHorizon);
        }
        if let Some(g) = self.gamma {
            if !g.is_finite() || g < 0.0 {
                return Err(Exp4Error::InvalidGamma(g));
            }
        }
        Ok(())
    }

    /// The exploration rate the engine starts with.
    pub fn resolved_gamma(&self) -> f64 {
        self.gamma.unwrap_or_else(|| auto_gamma(self.horizon, self.arms, &self.label_counts))
    }
}

/// `sqrt(K ln N / T)` where `N = sum_f K^{labels_f}` is the size of the expert space.
///
/// `ln N` is evaluated as a log-sum-exp over `labels_f * ln K`, so large label counts
/// do not overflow.
pub fn auto_gamma(horizon: usize, arms: usize, label_counts: &[usize]) -> f64 {
    let k = arms.max(1) as f64;
    let t = horizon.max(1) as f64;
    let ln_k = k.ln();
    let terms: Vec<f64> = label_counts.iter().map(|&n| n as f64 * ln_k).collect();
    let max = terms.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return 0.0;
    }
    let ln_n = max + terms.iter().map(|x| (x - max).exp()).sum::<f64>().ln();
    (k * ln_n.max(0.0) / t).sqrt()
}
