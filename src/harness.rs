//! Simulation glue: drive any [`BanditPolicy`] against a scripted reward stream.
//!
//! The harness owns no policy logic. It only alternates
//! `decide` / `update_reward`, collects what happened, and optionally appends a
//! snapshot row per step to a [`DiagnosticLog`].

use crate::{BanditPolicy, DiagnosticLog, Exp4Error};

/// What a simulation run produced.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulationReport {
    /// Arm chosen at each step.
    pub picks: Vec<usize>,
    /// Reward paid at each step.
    pub rewards: Vec<f64>,
    /// Probability of the chosen arm at each step.
    pub chosen_probs: Vec<f64>,
    /// Steps where sampling fell back to the last arm.
    pub fallbacks: usize,
}

impl SimulationReport {
    pub fn steps(&self) -> usize {
        self.picks.len()
    }

    pub fn total_reward(&self) -> f64 {
        self.rewards.iter().sum()
    }

    /// Fraction of steps in `range` that picked `arm`.
    pub fn pick_share(&self, arm: usize, range: std::ops::Range<usize>) -> f64 {
        let range = range.start.min(self.picks.len())..range.end.min(self.picks.len());
        if range.is_empty() {
            return 0.0;
        }
        let n = range.len();
        let hits = self.picks[range].iter().filter(|&&a| a == arm).count();
        hits as f64 / n as f64
    }
}

/// Run `steps` request/reward cycles.
///
/// - `labels_at(t)` gives the labels for step `t`.
/// - `reward_at(t, arm)` gives the reward for pulling `arm` at step `t`.
/// - When `log` is present, the policy's snapshot (if it has one) is recorded right
///   after each decision.
pub fn simulate<P, L, R>(
    policy: &mut P,
    steps: usize,
    mut labels_at: L,
    mut reward_at: R,
    mut log: Option<&mut DiagnosticLog>,
) -> Result<SimulationReport, Exp4Error>
where
    P: BanditPolicy + ?Sized,
    L: FnMut(u64) -> Vec<usize>,
    R: FnMut(u64, usize) -> f64,
{
    let mut report = SimulationReport {
        picks: Vec::with_capacity(steps),
        rewards: Vec::with_capacity(steps),
        chosen_probs: Vec::with_capacity(steps),
        fallbacks: 0,
    };
    for t in 0..steps as u64 {
        let labels = labels_at(t);
        let d = policy.decide(&labels)?;
        if let Some(log) = log.as_deref_mut() {
            if let Some(snap) = policy.snapshot() {
                log.record(&snap);
            }
        }
        let r = reward_at(t, d.arm);
        policy.update_reward(r)?;

        report.fallbacks += usize::from(d.fell_back());
        report.chosen_probs.push(d.chosen_prob());
        report.picks.push(d.arm);
        report.rewards.push(r);
    }
    Ok(report)
}

/// A reward stream whose best arm changes at evenly spaced points.
///
/// Step `t` falls in segment `z = floor(t * segments / steps)`; the best arm of
/// segment 0 is `first`, and of segment `z > 0` is `z % arms`. The best arm pays
/// `good`, every other arm pays 0.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShiftingBestArm {
    pub steps: u64,
    pub segments: u64,
    pub arms: usize,
    pub first: usize,
    pub good: f64,
}

impl ShiftingBestArm {
    pub fn segment(&self, t: u64) -> u64 {
        let steps = self.steps.max(1) as u128;
        let z = t as u128 * self.segments.max(1) as u128 / steps;
        (z as u64).min(self.segments.max(1) - 1)
    }

    pub fn best_arm(&self, t: u64) -> usize {
        let arms = self.arms.max(1);
        match self.segment(t) {
            0 => self.first % arms,
            z => (z % arms as u64) as usize,
        }
    }

    pub fn reward(&self, t: u64, arm: usize) -> f64 {
        if arm == self.best_arm(t) {
            self.good
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Exp3, Exp3Config, Exp4, Exp4Config, PeriodicExp4, Snapshot, StrategyKind};

    #[test]
    fn shifting_schedule_matches_segments() {
        let s = ShiftingBestArm {
            steps: 270,
            segments: 27,
            arms: 10,
            first: 2,
            good: 0.8,
        };
        assert_eq!(s.best_arm(0), 2);
        assert_eq!(s.best_arm(9), 2);
        assert_eq!(s.best_arm(10), 1);
        assert_eq!(s.best_arm(100), 0);
        assert_eq!(s.best_arm(269), 6);
        assert_eq!(s.reward(10, 1), 0.8);
        assert_eq!(s.reward(10, 2), 0.0);
        // Past the end stays in the last segment.
        assert_eq!(s.best_arm(10_000), 6);
    }

    #[test]
    fn report_accounting() {
        let mut ex = Exp3::new(Exp3Config { arms: 2, seed: 1 }).unwrap();
        let rep = simulate(&mut ex, 50, |_| Vec::new(), |_, a| a as f64, None).unwrap();
        assert_eq!(rep.steps(), 50);
        let ones = rep.picks.iter().filter(|&&a| a == 1).count();
        assert_eq!(rep.total_reward(), ones as f64);
        assert!((rep.pick_share(1, 0..50) - ones as f64 / 50.0).abs() < 1e-12);
        assert_eq!(rep.pick_share(1, 60..70), 0.0);
        assert!(rep.chosen_probs.iter().all(|&p| p > 0.0 && p <= 1.0));
    }

    #[test]
    fn log_gets_one_row_per_step_for_snapshotting_policies() {
        let mut ex = Exp4::new(Exp4Config {
            arms: 3,
            label_counts: vec![2, 3],
            ..Exp4Config::default()
        })
        .unwrap();
        let mut log = DiagnosticLog::new(Snapshot::headers(2, 3).len());
        simulate(
            &mut ex,
            25,
            |t| vec![(t % 2) as usize, (t % 3) as usize],
            |_, a| if a == 0 { 1.0 } else { 0.0 },
            Some(&mut log),
        )
        .unwrap();
        assert_eq!(log.rows().count(), 25);
        for row in log.rows() {
            let probs = &row[2 + 3..];
            assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn exp3_logs_weights_then_probabilities_each_step() {
        let mut ex = Exp3::new(Exp3Config { arms: 4, seed: 9 }).unwrap();
        let mut log = DiagnosticLog::new(ex.log_headers().len());
        simulate(
            &mut ex,
            30,
            |_| Vec::new(),
            |_, a| if a == 1 { 1.0 } else { 0.0 },
            Some(&mut log),
        )
        .unwrap();
        assert_eq!(log.cols(), 8);
        assert_eq!(log.rows().count(), 30);
        for row in log.rows() {
            let (weights, probs) = row.split_at(4);
            assert!(weights.iter().all(|&w| w > 0.0 && w <= 1.0));
            assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
        assert_eq!(log.values().len(), 30 * 8);
    }

    #[test]
    fn partitioned_engine_beats_context_free_baseline_on_periodic_rewards() {
        let steps = 6_000u64;
        let sched = ShiftingBestArm {
            steps,
            segments: 6,
            arms: 3,
            first: 0,
            good: 0.8,
        };
        let mut periodic = PeriodicExp4::partition_cycles(
            Exp4Config {
                horizon: steps as usize,
                arms: 3,
                seed: 3,
                strategy: StrategyKind::ExactStable,
                ..Exp4Config::default()
            },
            &[1, 2, 3, 6],
        )
        .unwrap();
        let mut base = Exp3::new(Exp3Config { arms: 3, seed: 3 }).unwrap();

        let reward = |t, arm| sched.reward(t, arm);
        let a = simulate(&mut periodic, steps as usize, |_| Vec::new(), reward, None).unwrap();
        let b = simulate(&mut base, steps as usize, |_| Vec::new(), reward, None).unwrap();
        assert!(
            a.total_reward() > b.total_reward(),
            "periodic={} exp3={}",
            a.total_reward(),
            b.total_reward()
        );
    }
}
