//! Diagnostic snapshot of engine state and the append-only recorder that stores them.
//!
//! A [`Snapshot`] flattens to one row of `F + 2K` reals:
//! partition weights, then blended arm weights, then arm probabilities. The meaning of
//! the weight columns depends on the strategy (multiplicative mass for the exact
//! strategies, log-domain scores for the approximate one); probabilities are always
//! comparable.

/// Read-only view of the engine at the current labels.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    /// One aggregate weight per partition.
    pub partition_weights: Vec<f64>,
    /// One blended weight per arm.
    pub arm_weights: Vec<f64>,
    /// One probability per arm.
    pub probabilities: Vec<f64>,
}

impl Snapshot {
    /// Flatten in column order: partitions, arm weights, probabilities.
    pub fn to_row(&self) -> Vec<f64> {
        let mut row = Vec::with_capacity(self.width());
        row.extend_from_slice(&self.partition_weights);
        row.extend_from_slice(&self.arm_weights);
        row.extend_from_slice(&self.probabilities);
        row
    }

    pub fn width(&self) -> usize {
        self.partition_weights.len() + self.arm_weights.len() + self.probabilities.len()
    }

    /// Column names matching [`Snapshot::to_row`] (1-based, as they appear in CSV headers).
    pub fn headers(partitions: usize, arms: usize) -> Vec<String> {
        (1..=partitions)
            .map(|f| format!("w_partitionF{f}"))
            .chain((1..=arms).map(|i| format!("w_arm{i}")))
            .chain((1..=arms).map(|i| format!("probability{i}")))
            .collect()
    }
}

/// Append-only buffer of reals with a resettable read cursor.
///
/// Holds no logic beyond storage: rows are appended, then read back value by value.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiagnosticLog {
    cols: usize,
    data: Vec<f64>,
    #[cfg_attr(feature = "serde", serde(skip))]
    cursor: usize,
}

impl DiagnosticLog {
    /// Empty log whose rows are `cols` wide.
    pub fn new(cols: usize) -> Self {
        Self {
            cols,
            data: Vec::new(),
            cursor: 0,
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn push(&mut self, v: f64) {
        self.data.push(v);
    }

    pub fn extend_row(&mut self, row: &[f64]) {
        self.data.extend_from_slice(row);
    }

    /// Append one snapshot as a row.
    pub fn record(&mut self, snap: &Snapshot) {
        self.data.extend_from_slice(&snap.partition_weights);
        self.data.extend_from_slice(&snap.arm_weights);
        self.data.extend_from_slice(&snap.probabilities);
    }

    /// Next value at the cursor, or `None` once the buffer is exhausted.
    pub fn next_value(&mut self) -> Option<f64> {
        let v = self.data.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(v)
    }

    /// Rewind the read cursor to the start.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Drop all data and rewind.
    pub fn clear(&mut self) {
        self.data.clear();
        self.reset();
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }

    /// Complete rows (a trailing partial row is ignored).
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.cols.max(1))
    }
}
