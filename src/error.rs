//! Error type for engine construction and the request/reward protocol.
//!
//! Numeric edge cases (zero mass, overflow, sampling drift) are never errors:
//! they are clamped in place. Only configuration mistakes and protocol
//! violations surface here.

use thiserror::Error;

/// Errors reported by [`Exp4`][crate::Exp4] and the policies built on it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Exp4Error {
    #[error("arm count must be at least 1")]
    NoArms,

    #[error("at least one partition is required")]
    NoPartitions,

    #[error("partition {partition} has no labels")]
    EmptyPartition { partition: usize },

    #[error("horizon must be at least 1")]
    ZeroHorizon,

    #[error("exploration rate must be finite and >= 0, got {0}")]
    InvalidGamma(f64),

    #[error("expected {expected} labels (one per partition), got {actual}")]
    LabelCountMismatch { expected: usize, actual: usize },

    #[error("label {label} out of range for partition {partition} ({count} labels)")]
    LabelOutOfRange {
        partition: usize,
        label: usize,
        count: usize,
    },

    /// `request_arm` was called while the previous arm still awaits its reward.
    #[error("arm {arm} is still awaiting its reward")]
    RewardPending { arm: usize },

    /// `give_reward` was called without a preceding `request_arm`.
    #[error("no arm is awaiting a reward; call request_arm first")]
    NoPendingArm,

    #[error("reward must be finite, got {0}")]
    NonFiniteReward(f64),
}
