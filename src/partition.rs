//! Label functions over time.
//!
//! A partition splits the timeline `0..horizon` into labelled segments. Giving the
//! engine several partitions with different periods lets it discover which periodic
//! structure (if any) the rewards follow: the partition whose segments line up with
//! the reward changes accumulates the sharpest rows.
//!
//! ```text
//!    _____________________________
//!   |_____________________________|  period 1  (plain EXP3)
//!    ______________ ______________
//!   |______________|______________|  period 2
//!    _________ _________ _________
//!   |_________|_________|_________|  period 3
//! ```

/// A grouping of timesteps into a fixed number of labels.
pub trait Partition: std::fmt::Debug + Send {
    /// Number of distinct labels.
    fn label_count(&self) -> usize;

    /// Label at timestep `t`; always `< label_count()`.
    fn label(&self, t: u64) -> usize;
}

/// Splits `0..horizon` into `period` contiguous, near-equal segments.
///
/// Timesteps at or past the horizon map to the last label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CyclePartition {
    horizon: u64,
    period: usize,
}

impl CyclePartition {
    /// `horizon` and `period` are clamped to at least 1.
    pub fn new(horizon: u64, period: usize) -> Self {
        Self {
            horizon: horizon.max(1),
            period: period.max(1),
        }
    }
}

impl Partition for CyclePartition {
    fn label_count(&self) -> usize {
        self.period
    }

    fn label(&self, t: u64) -> usize {
        let l = (self.period as u128 * t as u128) / self.horizon as u128;
        (l as usize).min(self.period - 1)
    }
}

/// Repeats a [`CyclePartition`]-style split `repeats` times across the horizon.
///
/// The horizon is first cut into `repeats` near-equal blocks; each block is then cut
/// into `period` labelled segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RepeatingCyclePartition {
    horizon: u64,
    repeats: u64,
    period: usize,
}

impl RepeatingCyclePartition {
    /// All arguments are clamped to at least 1.
    pub fn new(horizon: u64, repeats: u64, period: usize) -> Self {
        Self {
            horizon: horizon.max(1),
            repeats: repeats.max(1),
            period: period.max(1),
        }
    }

    /// `ceil(i * horizon / repeats)`: first timestep of block `i`.
    fn block_start(&self, i: u128) -> u128 {
        let r = self.repeats as u128;
        (i * self.horizon as u128 + r - 1) / r
    }
}

impl Partition for RepeatingCyclePartition {
    fn label_count(&self) -> usize {
        self.period
    }

    fn label(&self, t: u64) -> usize {
        let t = t.min(self.horizon - 1) as u128;
        let block = t * self.repeats as u128 / self.horizon as u128;
        let start = self.block_start(block);
        let len = (self.block_start(block + 1) - start).max(1);
        let l = (t - start) * self.period as u128 / len;
        (l as usize).min(self.period - 1)
    }
}

/// One [`CyclePartition`] per period.
pub fn cycle_partitions(horizon: u64, periods: &[usize]) -> Vec<Box<dyn Partition>> {
    periods
        .iter()
        .map(|&p| Box::new(CyclePartition::new(horizon, p)) as Box<dyn Partition>)
        .collect()
}

/// One [`RepeatingCyclePartition`] per period, all with the same repeat count.
pub fn repeating_cycle_partitions(
    horizon: u64,
    repeats: u64,
    periods: &[usize],
) -> Vec<Box<dyn Partition>> {
    periods
        .iter()
        .map(|&p| {
            Box::new(RepeatingCyclePartition::new(horizon, repeats, p)) as Box<dyn Partition>
        })
        .collect()
}
