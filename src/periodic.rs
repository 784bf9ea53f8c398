//! Time-driven driver: labels come from partitions evaluated at the current timestep.
//!
//! [`PeriodicExp4`] owns an [`Exp4`] engine plus the partitions it was built from,
//! and counts timesteps itself. Callers only ask for the next arm and report its
//! reward; the driver advances `t` after each reward.

use crate::partition::{cycle_partitions, repeating_cycle_partitions};
use crate::{Decision, Exp4, Exp4Config, Exp4Error, Partition, Snapshot};

/// [`Exp4`] over time-based partitions.
#[derive(Debug)]
pub struct PeriodicExp4 {
    engine: Exp4,
    partitions: Vec<Box<dyn Partition>>,
    t: u64,
}

impl PeriodicExp4 {
    /// Build an engine whose label counts are taken from `partitions`.
    ///
    /// Any `label_counts` already in `cfg` are replaced.
    pub fn new(
        mut cfg: Exp4Config,
        partitions: Vec<Box<dyn Partition>>,
    ) -> Result<Self, Exp4Error> {
        cfg.label_counts = partitions.iter().map(|p| p.label_count()).collect();
        Ok(Self {
            engine: Exp4::new(cfg)?,
            partitions,
            t: 0,
        })
    }

    /// One [`CyclePartition`][crate::CyclePartition] per period over `cfg.horizon`.
    ///
    /// `periods = [1]` is plain EXP3.
    pub fn partition_cycles(cfg: Exp4Config, periods: &[usize]) -> Result<Self, Exp4Error> {
        let parts = cycle_partitions(cfg.horizon as u64, periods);
        Self::new(cfg, parts)
    }

    /// One [`RepeatingCyclePartition`][crate::RepeatingCyclePartition] per period.
    pub fn repeating_partition_cycles(
        cfg: Exp4Config,
        repeats: u64,
        periods: &[usize],
    ) -> Result<Self, Exp4Error> {
        let parts = repeating_cycle_partitions(cfg.horizon as u64, repeats, periods);
        Self::new(cfg, parts)
    }

    /// Current timestep (number of rewards given so far).
    pub fn timestep(&self) -> u64 {
        self.t
    }

    pub fn engine(&self) -> &Exp4 {
        &self.engine
    }

    /// Labels every partition assigns to timestep `t`.
    pub fn labels_at(&self, t: u64) -> Vec<usize> {
        self.partitions.iter().map(|p| p.label(t)).collect()
    }

    /// Choose the arm for the current timestep.
    pub fn next_arm(&mut self) -> Result<usize, Exp4Error> {
        self.next_arm_explain().map(|d| d.arm)
    }

    pub fn next_arm_explain(&mut self) -> Result<Decision, Exp4Error> {
        let labels = self.labels_at(self.t);
        self.engine.request_arm_explain(&labels)
    }

    /// Reward the arm chosen for the current timestep and advance to the next.
    pub fn give_reward(
        &mut self,
        reward: f64,
        gamma_override: Option<f64>,
    ) -> Result<(), Exp4Error> {
        self.engine.give_reward(reward, gamma_override)?;
        self.t += 1;
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        self.engine.snapshot()
    }

    /// Column names for [`Snapshot::to_row`].
    pub fn log_headers(&self) -> Vec<String> {
        Snapshot::headers(self.partitions.len(), self.engine.arms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StrategyKind;

    fn cfg(horizon: usize, arms: usize) -> Exp4Config {
        Exp4Config {
            horizon,
            arms,
            seed: 17,
            ..Exp4Config::default()
        }
    }

    #[test]
    fn label_counts_come_from_partitions() {
        let d = PeriodicExp4::partition_cycles(cfg(100, 3), &[1, 2, 5]).unwrap();
        assert_eq!(d.engine().config().label_counts, vec![1, 2, 5]);
        assert_eq!(d.labels_at(0), vec![0, 0, 0]);
        assert_eq!(d.labels_at(60), vec![0, 1, 3]);
        assert_eq!(
            d.log_headers()[..3],
            ["w_partitionF1", "w_partitionF2", "w_partitionF3"]
        );
        assert_eq!(d.log_headers().len(), 3 + 2 * 3);
    }

    #[test]
    fn timestep_advances_only_on_reward() {
        let mut d = PeriodicExp4::partition_cycles(cfg(10, 2), &[2]).unwrap();
        d.next_arm().unwrap();
        assert_eq!(d.timestep(), 0);
        assert!(d.next_arm().is_err());
        d.give_reward(1.0, None).unwrap();
        assert_eq!(d.timestep(), 1);
        assert_eq!(d.give_reward(1.0, None), Err(Exp4Error::NoPendingArm));
        assert_eq!(d.timestep(), 1);
    }

    #[test]
    fn decisions_use_labels_of_the_current_timestep() {
        let mut d = PeriodicExp4::partition_cycles(cfg(4, 2), &[4]).unwrap();
        for t in 0..6u64 {
            let dec = d.next_arm_explain().unwrap();
            assert_eq!(dec.labels, vec![(t as usize).min(3)]);
            d.give_reward(0.0, None).unwrap();
        }
    }

    #[test]
    fn empty_partition_list_is_rejected() {
        let err = PeriodicExp4::new(cfg(10, 2), Vec::new()).unwrap_err();
        assert_eq!(err, Exp4Error::NoPartitions);
    }

    #[test]
    fn periodic_rewards_are_learned_per_segment() {
        // Arm 0 pays in the first half, arm 1 in the second.
        let horizon = 4_000usize;
        let mut d = PeriodicExp4::partition_cycles(
            Exp4Config {
                strategy: StrategyKind::ExactStable,
                ..cfg(horizon, 2)
            },
            &[2],
        )
        .unwrap();
        for t in 0..horizon {
            let arm = d.next_arm().unwrap();
            let good = if t < horizon / 2 { 0 } else { 1 };
            d.give_reward(if arm == good { 1.0 } else { 0.0 }, None).unwrap();
        }
        let e = d.engine();
        assert!(e.probabilities(&[0]).unwrap()[0] > 0.9);
        assert!(e.probabilities(&[1]).unwrap()[1] > 0.9);
    }
}
