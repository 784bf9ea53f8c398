//! Unified `BanditPolicy` trait for the request/reward protocol.
//!
//! [`Exp4`], [`PeriodicExp4`] and [`Exp3`] share the same two-step cycle:
//! `decide(labels) -> Decision` then `update_reward(reward)`. This trait makes that
//! explicit so harnesses can swap policies without code changes.
//!
//! Policies that derive their own context ignore `labels`: [`Exp3`] sees no context
//! at all, and [`PeriodicExp4`] computes labels from its own timestep.
//!
//! # Example
//!
//! ```rust
//! use pexp4::{BanditPolicy, Exp3, Exp3Config, Exp4, Exp4Config};
//!
//! fn run_policy<P: BanditPolicy>(policy: &mut P, labels: &[usize]) {
//!     let d = policy.decide(labels).unwrap();
//!     // ... pull the arm ...
//!     policy.update_reward(if d.arm == 0 { 0.8 } else { 0.0 }).unwrap();
//! }
//!
//! let cfg = Exp4Config { arms: 3, label_counts: vec![2], ..Exp4Config::default() };
//! let mut ex = Exp4::new(cfg).unwrap();
//! let mut base = Exp3::new(Exp3Config { arms: 3, seed: 0 }).unwrap();
//!
//! run_policy(&mut ex, &[1]);
//! run_policy(&mut base, &[]);
//! ```

use crate::{Decision, Exp3, Exp4, Exp4Error, PeriodicExp4, Snapshot};

/// Common interface for stateful request/reward policies.
pub trait BanditPolicy {
    /// Choose an arm under `labels`.
    fn decide(&mut self, labels: &[usize]) -> Result<Decision, Exp4Error>;

    /// Credit `reward` to the arm returned by the last `decide`.
    fn update_reward(&mut self, reward: f64) -> Result<(), Exp4Error>;

    /// Diagnostic snapshot, for policies that expose one.
    fn snapshot(&self) -> Option<Snapshot> {
        None
    }
}

impl BanditPolicy for Exp4 {
    fn decide(&mut self, labels: &[usize]) -> Result<Decision, Exp4Error> {
        self.request_arm_explain(labels)
    }
    fn update_reward(&mut self, reward: f64) -> Result<(), Exp4Error> {
        self.give_reward(reward, None)
    }
    fn snapshot(&self) -> Option<Snapshot> {
        Some(Exp4::snapshot(self))
    }
}

impl BanditPolicy for PeriodicExp4 {
    fn decide(&mut self, _labels: &[usize]) -> Result<Decision, Exp4Error> {
        self.next_arm_explain()
    }
    fn update_reward(&mut self, reward: f64) -> Result<(), Exp4Error> {
        self.give_reward(reward, None)
    }
    fn snapshot(&self) -> Option<Snapshot> {
        Some(PeriodicExp4::snapshot(self))
    }
}

impl BanditPolicy for Exp3 {
    fn decide(&mut self, _labels: &[usize]) -> Result<Decision, Exp4Error> {
        Exp3::decide(self)
    }
    fn update_reward(&mut self, reward: f64) -> Result<(), Exp4Error> {
        Exp3::update_reward(self, reward)
    }
    fn snapshot(&self) -> Option<Snapshot> {
        Some(Exp3::snapshot(self))
    }
}
