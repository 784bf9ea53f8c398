//! Weight storage: one row of `K` log-domain scores per `(partition, label)`.
//!
//! Rows are stored contiguously (partition-major, then label) in a single buffer.
//! Dimensions are fixed at construction.

use std::ops::Range;

use crate::Exp4Error;

/// Dense `w[f][l][i]` table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeightTable {
    arms: usize,
    label_counts: Vec<usize>,
    // First row index of each partition; `row_starts[F]` is the total row count.
    row_starts: Vec<usize>,
    w: Vec<f64>,
}

impl WeightTable {
    /// All-zero table (uniform prior).
    pub fn new(arms: usize, label_counts: &[usize]) -> Self {
        let mut row_starts = Vec::with_capacity(label_counts.len() + 1);
        let mut acc = 0usize;
        row_starts.push(0);
        for &n in label_counts {
            acc += n;
            row_starts.push(acc);
        }
        Self {
            arms,
            label_counts: label_counts.to_vec(),
            row_starts,
            w: vec![0.0; acc * arms],
        }
    }

    pub fn arms(&self) -> usize {
        self.arms
    }

    pub fn partitions(&self) -> usize {
        self.label_counts.len()
    }

    pub fn label_counts(&self) -> &[usize] {
        &self.label_counts
    }

    pub fn label_count(&self, f: usize) -> usize {
        self.label_counts[f]
    }

    /// Total number of `(partition, label)` rows.
    pub fn rows(&self) -> usize {
        self.row_starts.last().copied().unwrap_or(0)
    }

    /// Flat row index of `(f, l)`.
    #[inline]
    pub fn row_index(&self, f: usize, l: usize) -> usize {
        self.row_starts[f] + l
    }

    /// Flat row indices belonging to partition `f`.
    pub fn partition_rows(&self, f: usize) -> Range<usize> {
        self.row_starts[f]..self.row_starts[f + 1]
    }

    #[inline]
    pub fn row_at(&self, r: usize) -> &[f64] {
        &self.w[r * self.arms..(r + 1) * self.arms]
    }

    #[inline]
    pub fn row(&self, f: usize, l: usize) -> &[f64] {
        self.row_at(self.row_index(f, l))
    }

    pub fn row_mut(&mut self, f: usize, l: usize) -> &mut [f64] {
        let r = self.row_index(f, l);
        let k = self.arms;
        &mut self.w[r * k..(r + 1) * k]
    }

    #[inline]
    pub fn get(&self, f: usize, l: usize, arm: usize) -> f64 {
        self.row(f, l)[arm]
    }

    /// Add `delta` to a single score.
    pub fn add(&mut self, f: usize, l: usize, arm: usize, delta: f64) {
        self.row_mut(f, l)[arm] += delta;
    }

    /// Subtract `shift` from every score of partition `f`.
    pub fn shift_partition_down(&mut self, f: usize, shift: f64) {
        let rows = self.partition_rows(f);
        let k = self.arms;
        for x in &mut self.w[rows.start * k..rows.end * k] {
            *x -= shift;
        }
    }

    /// Every score, row-major.
    pub fn values(&self) -> &[f64] {
        &self.w
    }

    /// True when every score is exactly zero (the initial state).
    pub fn is_pristine(&self) -> bool {
        self.w.iter().all(|&x| x == 0.0)
    }

    /// Check that `labels` has one in-range label per partition.
    pub fn check_labels(&self, labels: &[usize]) -> Result<(), Exp4Error> {
        if labels.len() != self.partitions() {
            return Err(Exp4Error::LabelCountMismatch {
                expected: self.partitions(),
                actual: labels.len(),
            });
        }
        for (partition, (&label, &count)) in labels.iter().zip(&self.label_counts).enumerate() {
            if label >= count {
                return Err(Exp4Error::LabelOutOfRange {
                    partition,
                    label,
                    count,
                });
            }
        }
        Ok(())
    }
}
