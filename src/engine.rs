//! The weighting engine: partitioned EXP4 with a pluggable probability strategy.
//!
//! Each partition is an expert family that maps the current context to one of its
//! labels; every `(partition, label)` pair owns a row of per-arm scores. A request
//! blends the active row of every partition into one distribution and samples it. A
//! reward is importance-weighted by the chosen arm's probability and added to the
//! active row of every partition:
//!
//! ```text
//!   w[f][c_f][arm] += reward * gamma / (K * p[arm])
//! ```
//!
//! Protocol: `request_arm` then exactly one `give_reward`, repeated. Breaking the
//! alternation is reported as an error rather than reusing stale state.
//!
//! The engine is seedable: same config, same labels, same rewards → same arms.

use crate::decision::notes_for;
use crate::renorm::renormalize;
use crate::strategy::build_strategy;
use crate::{
    Decision, DecisionPolicy, Draw, Exp4Config, Exp4Error, ProbabilityStrategy, Sampler, Snapshot,
    StrategyKind, WeightTable, MAX_UPDATE, MIN_MASS,
};

/// Seedable partitioned EXP4 engine.
#[derive(Debug, Clone)]
pub struct Exp4 {
    cfg: Exp4Config,
    gamma: f64,
    weights: WeightTable,
    strategy: Box<dyn ProbabilityStrategy>,
    sampler: Sampler,

    labels: Vec<usize>,
    probs: Vec<f64>,
    pending: Option<usize>,

    rounds: u64,
    since_resync: u64,
}

impl Exp4 {
    /// Validate `cfg` and build an engine with a uniform prior.
    pub fn new(cfg: Exp4Config) -> Result<Self, Exp4Error> {
        cfg.validate()?;
        let gamma = cfg.resolved_gamma();
        let weights = WeightTable::new(cfg.arms, &cfg.label_counts);
        let strategy = build_strategy(cfg.strategy, &weights);
        let k = cfg.arms;
        tracing::debug!(
            arms = k,
            partitions = cfg.partitions(),
            horizon = cfg.horizon,
            gamma,
            strategy = ?cfg.strategy,
            "exp4 engine constructed"
        );
        Ok(Self {
            sampler: Sampler::new(cfg.seed),
            labels: vec![0; cfg.partitions()],
            probs: vec![1.0 / k as f64; k],
            pending: None,
            rounds: 0,
            since_resync: 0,
            gamma,
            weights,
            strategy,
            cfg,
        })
    }

    pub fn config(&self) -> &Exp4Config {
        &self.cfg
    }

    /// Current exploration rate (changes only through a reward-time override).
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn arms(&self) -> usize {
        self.cfg.arms
    }

    pub fn partitions(&self) -> usize {
        self.cfg.partitions()
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    /// Raw score table.
    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    /// Labels of the most recent request (all zero before the first).
    pub fn current_labels(&self) -> &[usize] {
        &self.labels
    }

    /// Distribution used by the most recent request (uniform before the first).
    pub fn last_probabilities(&self) -> &[f64] {
        &self.probs
    }

    /// Arm awaiting its reward, if any.
    pub fn pending_arm(&self) -> Option<usize> {
        self.pending
    }

    /// Completed request/reward cycles.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Distribution the engine would sample from under `labels`, without sampling.
    pub fn probabilities(&self, labels: &[usize]) -> Result<Vec<f64>, Exp4Error> {
        self.weights.check_labels(labels)?;
        let mut p = vec![0.0; self.cfg.arms];
        self.strategy.compute_probabilities(&self.weights, labels, &mut p);
        Ok(p)
    }

    /// Choose an arm for `labels`.
    pub fn request_arm(&mut self, labels: &[usize]) -> Result<usize, Exp4Error> {
        self.choose(labels).map(|d| d.arm)
    }

    /// Choose an arm for `labels` and return the full decision record.
    pub fn request_arm_explain(&mut self, labels: &[usize]) -> Result<Decision, Exp4Error> {
        let draw = self.choose(labels)?;
        Ok(Decision {
            policy: DecisionPolicy::Exp4(self.strategy.kind()),
            arm: draw.arm,
            labels: self.labels.clone(),
            probs: self.probs.clone(),
            notes: notes_for(draw),
        })
    }

    fn choose(&mut self, labels: &[usize]) -> Result<Draw, Exp4Error> {
        if let Some(arm) = self.pending {
            return Err(Exp4Error::RewardPending { arm });
        }
        self.weights.check_labels(labels)?;
        self.labels.copy_from_slice(labels);
        self.strategy.compute_probabilities(&self.weights, &self.labels, &mut self.probs);

        let draw = self.sampler.draw(&self.probs);
        if draw.fell_back {
            tracing::trace!(arm = draw.arm, "sampling walked past the end; using last arm");
        }
        self.pending = Some(draw.arm);
        tracing::trace!(
            round = self.rounds,
            arm = draw.arm,
            prob = self.probs[draw.arm],
            "arm requested"
        );
        Ok(draw)
    }

    /// Credit `reward` to the pending arm.
    ///
    /// A finite, positive `gamma_override` replaces the exploration rate from this
    /// reward on; any other override value is ignored.
    pub fn give_reward(
        &mut self,
        reward: f64,
        gamma_override: Option<f64>,
    ) -> Result<(), Exp4Error> {
        let Some(arm) = self.pending else {
            return Err(Exp4Error::NoPendingArm);
        };
        if !reward.is_finite() {
            return Err(Exp4Error::NonFiniteReward(reward));
        }
        if let Some(g) = gamma_override {
            if g.is_finite() && g > 0.0 {
                self.gamma = g;
            }
        }
        self.pending = None;

        let k = self.cfg.arms as f64;
        let p = self.probs[arm].max(MIN_MASS);
        let step = (reward * self.gamma / (k * p)).clamp(-MAX_UPDATE, MAX_UPDATE);
        if step != 0.0 {
            self.apply_step(arm, step);
        }

        self.rounds += 1;
        self.since_resync += 1;
        if let Some(every) = self.cfg.resync_every {
            if every > 0 && self.since_resync >= every {
                self.resync();
            }
        }
        tracing::trace!(round = self.rounds, arm, reward, step, "reward applied");
        Ok(())
    }

    fn apply_step(&mut self, arm: usize, step: f64) {
        for (f, &l) in self.labels.iter().enumerate() {
            self.weights.add(f, l, arm, step);
        }

        let shifted = if self.strategy.needs_renormalization() {
            renormalize(&mut self.weights)
        } else {
            None
        };
        match shifted {
            Some(adjustment) => {
                tracing::debug!(round = self.rounds, adjustment, "weights renormalized");
                self.strategy.on_renormalized(&self.weights);
            }
            None => {
                for (f, &l) in self.labels.iter().enumerate() {
                    self.strategy.on_reward_applied(&self.weights, f, l);
                }
            }
        }
    }

    /// Rebuild every derived aggregate from the raw weights.
    ///
    /// Returns the largest relative drift that was corrected.
    pub fn resync(&mut self) -> f64 {
        let drift = self.strategy.resync(&self.weights);
        self.since_resync = 0;
        tracing::debug!(
            round = self.rounds,
            drift,
            strategy = ?self.strategy.kind(),
            "aggregates resynced"
        );
        drift
    }

    /// Diagnostic view at the current labels. Does not mutate the engine.
    pub fn snapshot(&self) -> Snapshot {
        let mut probabilities = vec![0.0; self.cfg.arms];
        self.strategy.compute_probabilities(&self.weights, &self.labels, &mut probabilities);
        Snapshot {
            partition_weights: self.strategy.partition_weights(&self.weights, &self.labels),
            arm_weights: self.strategy.arm_weights(&self.weights, &self.labels),
            probabilities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const KINDS: [StrategyKind; 3] = [
        StrategyKind::ExactNonStable,
        StrategyKind::ExactStable,
        StrategyKind::Approximate,
    ];

    fn engine(kind: StrategyKind, arms: usize, label_counts: &[usize], seed: u64) -> Exp4 {
        Exp4::new(Exp4Config {
            horizon: 1_000,
            arms,
            label_counts: label_counts.to_vec(),
            seed,
            gamma: None,
            strategy: kind,
            resync_every: Some(64),
        })
        .unwrap()
    }

    #[test]
    fn two_arm_scenario_shifts_mass_toward_rewarded_arm() {
        for kind in KINDS {
            let mut e = engine(kind, 2, &[2], 42);
            assert_eq!(e.probabilities(&[0]).unwrap(), vec![0.5, 0.5]);

            // Request until arm 0 comes up; reward nothing for the others.
            loop {
                let arm = e.request_arm(&[0]).unwrap();
                assert_eq!(e.last_probabilities(), &[0.5, 0.5]);
                if arm == 0 {
                    e.give_reward(1.0, Some(0.1)).unwrap();
                    break;
                }
                e.give_reward(0.0, None).unwrap();
            }
            assert_eq!(e.gamma(), 0.1);
            let p = e.probabilities(&[0]).unwrap();
            assert!(p[0] > 0.5, "{kind:?}: {p:?}");
            // The other label was never touched.
            assert_eq!(e.probabilities(&[1]).unwrap(), vec![0.5, 0.5]);
        }
    }

    #[test]
    fn zero_rewards_leave_everything_untouched() {
        for kind in KINDS {
            let mut e = engine(kind, 4, &[3, 2], 9);
            for t in 0..500usize {
                e.request_arm(&[t % 3, t % 2]).unwrap();
                e.give_reward(0.0, None).unwrap();
            }
            assert!(e.weights().is_pristine());
            for labels in [[0, 0], [2, 1], [1, 0]] {
                assert_eq!(e.probabilities(&labels).unwrap(), vec![0.25; 4]);
            }
            assert_eq!(e.rounds(), 500);
        }
    }

    #[test]
    fn protocol_violations_are_reported() {
        let mut e = engine(StrategyKind::ExactStable, 3, &[2], 0);
        assert_eq!(e.give_reward(1.0, None), Err(Exp4Error::NoPendingArm));

        let arm = e.request_arm(&[1]).unwrap();
        assert_eq!(e.pending_arm(), Some(arm));
        assert_eq!(e.request_arm(&[1]), Err(Exp4Error::RewardPending { arm }));

        // A rejected reward keeps the arm pending.
        assert!(matches!(
            e.give_reward(f64::NAN, None),
            Err(Exp4Error::NonFiniteReward(_))
        ));
        assert_eq!(e.pending_arm(), Some(arm));

        e.give_reward(0.5, None).unwrap();
        assert_eq!(e.give_reward(0.5, None), Err(Exp4Error::NoPendingArm));
        assert!(e.request_arm(&[0]).is_ok());
    }

    #[test]
    fn bad_labels_do_not_consume_the_turn() {
        let mut e = engine(StrategyKind::Approximate, 2, &[2, 3], 0);
        assert!(matches!(
            e.request_arm(&[0]),
            Err(Exp4Error::LabelCountMismatch { .. })
        ));
        assert!(matches!(
            e.request_arm(&[0, 3]),
            Err(Exp4Error::LabelOutOfRange { partition: 1, .. })
        ));
        assert_eq!(e.pending_arm(), None);
        assert!(e.request_arm(&[1, 2]).is_ok());
    }

    #[test]
    fn non_positive_gamma_override_is_ignored() {
        let mut e = engine(StrategyKind::ExactStable, 2, &[1], 0);
        let g = e.gamma();
        e.request_arm(&[0]).unwrap();
        e.give_reward(0.0, Some(-1.0)).unwrap();
        e.request_arm(&[0]).unwrap();
        e.give_reward(0.0, Some(f64::INFINITY)).unwrap();
        assert_eq!(e.gamma(), g);
    }

    #[test]
    fn explain_carries_labels_and_distribution() {
        let mut e = engine(StrategyKind::ExactNonStable, 3, &[2, 2], 5);
        let d = e.request_arm_explain(&[1, 0]).unwrap();
        assert_eq!(d.labels, vec![1, 0]);
        assert_eq!(d.policy, DecisionPolicy::Exp4(StrategyKind::ExactNonStable));
        assert!(d.arm < 3);
        assert!((d.chosen_prob() - 1.0 / 3.0).abs() < 1e-12);
        assert!(!d.fell_back() || d.arm == 2);
    }

    #[test]
    fn snapshot_is_pure() {
        let mut e = engine(StrategyKind::ExactStable, 3, &[2, 2], 1);
        for _ in 0..20 {
            e.request_arm(&[1, 0]).unwrap();
            e.give_reward(0.7, None).unwrap();
        }
        let before = e.clone();
        let s1 = e.snapshot();
        let s2 = e.snapshot();
        assert_eq!(s1, s2);
        assert_eq!(e.weights(), before.weights());
        assert_eq!(s1.partition_weights.len(), 2);
        assert_eq!(s1.arm_weights.len(), 3);
        let sum: f64 = s1.probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn clones_continue_identically() {
        let mut a = engine(StrategyKind::ExactNonStable, 4, &[3], 77);
        for t in 0..30usize {
            let arm = a.request_arm(&[t % 3]).unwrap();
            a.give_reward(if arm == 1 { 1.0 } else { 0.1 }, None).unwrap();
        }
        let mut b = a.clone();
        for t in 0..30usize {
            let x = a.request_arm(&[t % 3]).unwrap();
            let y = b.request_arm(&[t % 3]).unwrap();
            assert_eq!(x, y);
            a.give_reward(0.3, None).unwrap();
            b.give_reward(0.3, None).unwrap();
        }
        assert_eq!(a.weights(), b.weights());
    }

    #[test]
    fn exact_weights_stay_under_the_ceiling() {
        for kind in [StrategyKind::ExactNonStable, StrategyKind::ExactStable] {
            let mut e = engine(kind, 3, &[2, 4], 3);
            for t in 0..2_000usize {
                let arm = e.request_arm(&[t % 2, t % 4]).unwrap();
                e.give_reward(if arm == 0 { 1.0 } else { 0.0 }, Some(0.5)).unwrap();
            }
            assert!(e
                .weights()
                .values()
                .iter()
                .all(|&x| x.is_finite() && x <= crate::WEIGHT_CEILING + 1e-12));
            let p = e.probabilities(&[0, 0]).unwrap();
            assert!(p[0] > 0.9, "{kind:?}: {p:?}");
        }
    }

    proptest! {
        #[test]
        fn requests_always_return_a_valid_arm_and_distribution(
            seed in any::<u64>(),
            kind_idx in 0usize..3,
            arms in 1usize..6,
            label_counts in proptest::collection::vec(1usize..5, 1..4),
            rewards in proptest::collection::vec(-1.0f64..2.0, 0..150),
        ) {
            let mut e = engine(KINDS[kind_idx], arms, &label_counts, seed);
            for (t, r) in rewards.iter().enumerate() {
                let labels: Vec<usize> = label_counts.iter().map(|&n| (t * 7 + n) % n).collect();
                let d = e.request_arm_explain(&labels).unwrap();
                prop_assert!(d.arm < arms);
                let s: f64 = d.probs.iter().sum();
                prop_assert!((s - 1.0).abs() < 1e-9, "sum={}", s);
                for &v in &d.probs {
                    prop_assert!(v.is_finite() && v >= 0.0);
                }
                e.give_reward(*r, None).unwrap();
            }
        }

        #[test]
        fn probability_preview_is_idempotent(
            seed in any::<u64>(),
            kind_idx in 0usize..3,
            rewards in proptest::collection::vec(0.0f64..1.0, 0..60),
        ) {
            let mut e = engine(KINDS[kind_idx], 3, &[2, 3], seed);
            for (t, r) in rewards.iter().enumerate() {
                e.request_arm(&[t % 2, t % 3]).unwrap();
                e.give_reward(*r, None).unwrap();
            }
            let a = e.probabilities(&[1, 2]).unwrap();
            let b = e.probabilities(&[1, 2]).unwrap();
            prop_assert_eq!(&a, &b);
            let d = e.request_arm_explain(&[1, 2]).unwrap();
            prop_assert_eq!(&d.probs, &a);
        }
    }
}
