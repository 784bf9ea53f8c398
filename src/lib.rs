//! `pexp4`: seedable contextual EXP4 over independent label partitions.
//!
//! Designed for "which arm now?" problems where the right answer depends on
//! context that can be described by several coarse groupings. Each grouping (a
//! **partition**) assigns the current context one of its **labels**; every
//! `(partition, label)` pair keeps its own per-arm scores. A request blends the
//! active row of every partition into one distribution and samples an arm; the reward
//! for that arm is importance-weighted and credited to all active rows.
//!
//! Partitions are experts in the EXP4 sense. A partition whose labels line up with
//! how rewards really vary builds sharper rows and a larger aggregate mass, so the
//! blend leans on it automatically. Periodic partitions over time
//! ([`CyclePartition`], driven by [`PeriodicExp4`]) are the canonical use: the engine
//! finds the period the rewards follow without being told.
//!
//! **Goals:**
//! - **Deterministic by default**: same config, labels and rewards → same arms.
//! - **Bounded numerics**: no NaN or infinity after any number of steps.
//! - **Three arithmetic trade-offs** behind one trait ([`ProbabilityStrategy`]),
//!   chosen once via [`StrategyKind`].
//!
//! **Core types:**
//! - [`Exp4`] / [`Exp4Config`]: the weighting engine (`request_arm` → `give_reward`).
//! - [`ExactNonStable`], [`ExactStable`], [`ApproximateStrategy`]: probability strategies.
//! - [`renormalize`]: overflow guard for the exact strategies.
//! - [`Sampler`]: inverse-CDF sampling with an owned seeded RNG.
//! - [`Snapshot`] / [`DiagnosticLog`]: diagnostic rows and an append-only recorder.
//!
//! **Around the core:**
//! - [`PeriodicExp4`], [`CyclePartition`], [`RepeatingCyclePartition`]: time-driven labels.
//! - [`Exp3`]: context-free baseline with an anytime exploration rate.
//! - [`BanditPolicy`], [`simulate`], [`ShiftingBestArm`]: harness glue.
//!
//! **Non-goals:**
//! - Not a general RL framework, not multi-agent, no persistence.
//! - One engine is single-threaded state; run independent engines for concurrency.
//!
//! # The update
//!
//! With `K` arms, chosen arm `a`, its probability `p_a`, and exploration rate `gamma`:
//!
//! ```text
//!   w[f][c_f][a] += reward * gamma / (K * p_a)       for every partition f
//! ```
//!
//! Dividing by `p_a` makes the expected update unbiased with respect to the sampling
//! distribution. The default rate is `sqrt(K ln N / T)` with `N = sum_f K^labels_f`,
//! the size of the expert space.
//!
//! # Choosing a strategy
//!
//! | strategy | per request | drift | renormalizes |
//! |---|---|---|---|
//! | `ExactNonStable` | `O(F K)` | yes, corrected by resync | yes |
//! | `ExactStable` | `O(F (K + labels))` | no | yes |
//! | `Approximate` | `O(F (K + labels))` | no | no |
//!
//! The two exact strategies agree to rounding. The approximate one is exact for a
//! single partition and otherwise within `ln F + max_f (labels_f - 1) ln K` in log
//! probability.
//!
//! # Example
//!
//! ```rust
//! use pexp4::{Exp4, Exp4Config, StrategyKind};
//!
//! let mut engine = Exp4::new(Exp4Config {
//!     horizon: 1_000,
//!     arms: 2,
//!     label_counts: vec![2],
//!     seed: 7,
//!     gamma: Some(0.1),
//!     strategy: StrategyKind::ExactStable,
//!     ..Exp4Config::default()
//! })
//! .unwrap();
//!
//! let arm = engine.request_arm(&[0]).unwrap();
//! engine.give_reward(if arm == 0 { 1.0 } else { 0.0 }, None).unwrap();
//! let snap = engine.snapshot();
//! assert_eq!(snap.to_row().len(), 1 + 2 + 2);
//! ```

#![forbid(unsafe_code)]

/// Smallest mass any probability denominator or diagnostic weight may take.
pub const MIN_MASS: f64 = f64::MIN_POSITIVE;

/// Largest exponent passed to `exp` by the log-domain strategy (`exp(709)` is the
/// last finite value).
pub const EXP_CEILING: f64 = 700.0;

/// Renormalization keeps every weight at or below this value.
pub const WEIGHT_CEILING: f64 = 1.0;

/// Magnitude cap on a single importance-weighted update.
pub const MAX_UPDATE: f64 = 1.0e150;

pub const PEXP4_VERSION: &str = env!("CARGO_PKG_VERSION");

mod error;
pub use error::*;

mod config;
pub use config::*;

mod weights;
pub use weights::*;

mod alloc;
pub use alloc::{exp_normalize, normalize_masses};

mod strategy;
pub use strategy::*;

mod exact;
pub use exact::{ExactNonStable, ExactStable};

mod approx;
pub use approx::*;

mod renorm;
pub use renorm::*;

mod sampler;
pub use sampler::*;

mod decision;
pub use decision::{Decision, DecisionNote, DecisionPolicy};

mod engine;
pub use engine::*;

mod snapshot;
pub use snapshot::*;

mod partition;
pub use partition::*;

mod periodic;
pub use periodic::*;

mod exp3;
pub use exp3::*;

mod policy;
pub use policy::BanditPolicy;

mod harness;
pub use harness::*;
