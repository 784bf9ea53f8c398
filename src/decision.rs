//! Decision envelope for policy outputs.
//!
//! A `Decision` is an audit-friendly record of one arm request: what was chosen, under
//! which labels, from which distribution, and typed notes explaining how. It can be
//! logged, replayed offline, or handed to the diagnostic recorder.

use crate::StrategyKind;

/// Which policy produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecisionPolicy {
    /// Partitioned EXP4 with the given probability strategy.
    Exp4(StrategyKind),
    /// Context-free EXP3 baseline.
    Exp3,
}

/// Notes attached to a decision.
///
/// Small, typed, and stable. Prefer adding new variants over changing existing
/// semantics.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecisionNote {
    /// The arm was sampled from `probs` by inverse CDF.
    SampledFromDistribution,

    /// Rounding left mass past the end of `probs`; the last arm was used.
    NumericalFallbackToLastArm,
}

/// A single arm request in a unified envelope.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Decision {
    /// The policy that produced this decision.
    pub policy: DecisionPolicy,
    /// Chosen arm index.
    pub arm: usize,
    /// Labels the decision was conditioned on (empty for context-free policies).
    pub labels: Vec<usize>,
    /// Distribution the arm was drawn from.
    pub probs: Vec<f64>,
    /// Audit notes describing how the choice happened.
    pub notes: Vec<DecisionNote>,
}

impl Decision {
    /// Probability of the chosen arm.
    pub fn chosen_prob(&self) -> f64 {
        self.probs.get(self.arm).copied().unwrap_or(0.0)
    }

    pub fn fell_back(&self) -> bool {
        self.notes.contains(&DecisionNote::NumericalFallbackToLastArm)
    }
}

pub(crate) fn notes_for(draw: crate::Draw) -> Vec<DecisionNote> {
    let mut notes = vec![DecisionNote::SampledFromDistribution];
    if draw.fell_back {
        notes.push(DecisionNote::NumericalFallbackToLastArm);
    }
    notes
}
