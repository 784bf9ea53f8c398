//! Context-free EXP3 baseline with an anytime exploration rate.
//!
//! Useful as the reference point the partitioned engine is measured against: it sees
//! no labels, and its exploration rate `gamma_t = t^(-1/3)` needs no horizon.
//! Like the engine it is **seedable** and follows the same request/reward protocol.

use crate::decision::notes_for;
use crate::{Decision, DecisionPolicy, Exp4Error, Sampler, Snapshot, MIN_MASS};

/// Configuration for EXP3.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Exp3Config {
    /// Number of arms.
    pub arms: usize,
    /// Seed for the internal RNG.
    pub seed: u64,
}

impl Default for Exp3Config {
    fn default() -> Self {
        Self { arms: 2, seed: 0 }
    }
}

/// `t^(-1/3)`, the exploration rate at round `t >= 1`.
pub fn anytime_gamma(t: u64) -> f64 {
    (t.max(1) as f64).powf(-1.0 / 3.0)
}

/// Seedable EXP3.
#[derive(Debug, Clone)]
pub struct Exp3 {
    arms: usize,
    t: u64,
    gamma: f64,
    sampler: Sampler,

    // Log weights, shifted so the largest is 0.
    log_w: Vec<f64>,
    probs: Vec<f64>,
    pending: Option<usize>,
}

impl Exp3 {
    pub fn new(cfg: Exp3Config) -> Result<Self, Exp4Error> {
        if cfg.arms == 0 {
            return Err(Exp4Error::NoArms);
        }
        let k = cfg.arms;
        let mut ex = Self {
            arms: k,
            t: 1,
            gamma: anytime_gamma(1),
            sampler: Sampler::new(cfg.seed),
            log_w: vec![0.0; k],
            probs: vec![1.0 / k as f64; k],
            pending: None,
        };
        ex.recompute_probs();
        Ok(ex)
    }

    pub fn arms(&self) -> usize {
        self.arms
    }

    /// Current round (starts at 1).
    pub fn round(&self) -> u64 {
        self.t
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Current selection probabilities.
    pub fn probabilities(&self) -> &[f64] {
        &self.probs
    }

    /// Weights normalized so the largest is 1 (never below the smallest positive value).
    pub fn weights(&self) -> Vec<f64> {
        self.log_w.iter().map(|x| x.exp().max(MIN_MASS)).collect()
    }

    /// Per-step diagnostic row: weights, then probabilities. There are no partitions.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            partition_weights: Vec::new(),
            arm_weights: self.weights(),
            probabilities: self.probs.clone(),
        }
    }

    /// Column names matching [`Exp3::snapshot`] rows.
    pub fn log_headers(&self) -> Vec<String> {
        (1..=self.arms)
            .map(|i| format!("weight{i}"))
            .chain((1..=self.arms).map(|i| format!("probability{i}")))
            .collect()
    }

    fn recompute_probs(&mut self) {
        // p_i = (1 - gamma) * w_i / sum(w) + gamma / K
        let w = self.weights();
        let total: f64 = w.iter().sum::<f64>().max(MIN_MASS);
        let k = self.arms as f64;
        let g = self.gamma;
        for (p, wi) in self.probs.iter_mut().zip(w) {
            *p = (1.0 - g) * wi / total + g / k;
        }
    }

    pub fn pending_arm(&self) -> Option<usize> {
        self.pending
    }

    /// Sample an arm from the current distribution.
    pub fn decide(&mut self) -> Result<Decision, Exp4Error> {
        if let Some(arm) = self.pending {
            return Err(Exp4Error::RewardPending { arm });
        }
        let draw = self.sampler.draw(&self.probs);
        self.pending = Some(draw.arm);
        Ok(Decision {
            policy: DecisionPolicy::Exp3,
            arm: draw.arm,
            labels: Vec::new(),
            probs: self.probs.clone(),
            notes: notes_for(draw),
        })
    }

    pub fn select(&mut self) -> Result<usize, Exp4Error> {
        self.decide().map(|d| d.arm)
    }

    /// Credit `reward` to the pending arm and advance the round.
    pub fn update_reward(&mut self, reward: f64) -> Result<(), Exp4Error> {
        let Some(arm) = self.pending else {
            return Err(Exp4Error::NoPendingArm);
        };
        if !reward.is_finite() {
            return Err(Exp4Error::NonFiniteReward(reward));
        }
        self.pending = None;

        let estimate = reward / self.probs[arm].max(MIN_MASS);
        self.t += 1;
        self.gamma = anytime_gamma(self.t);

        self.log_w[arm] += self.gamma * estimate / self.arms as f64;
        let max = self.log_w.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if max.is_finite() {
            for x in &mut self.log_w {
                *x -= max;
            }
        }
        self.recompute_probs();
        Ok(())
    }
}
