//! Crossing Index
//!
//! The table of sample positions a shard is allowed to start or end on.

use serde::Serialize;

use crate::engine::buffer::AudioBuffer;
use crate::error::{Result, ShatterError};

/// Which samples qualify as cut points
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub enum SplitMode {
    /// Only samples that are exactly 0.0
    #[default]
    ExactZero,
    /// Samples with `|x| <= threshold`
    NearZero(f32),
    /// Every position qualifies
    Unrestricted,
}

impl SplitMode {
    #[inline]
    fn qualifies(&self, sample: f32) -> bool {
        match *self {
            SplitMode::ExactZero => sample == 0.0,
            SplitMode::NearZero(threshold) => sample.abs() <= threshold,
            SplitMode::Unrestricted => true,
        }
    }
}

/// Ascending cut points inside `[start_limit, end_limit)`, followed by a
/// guard entry equal to `end_limit`.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossingIndex {
    points: Vec<usize>,
    start_limit: usize,
    end_limit: usize,
}

impl CrossingIndex {
    /// Scan `buffer` once and collect every qualifying position
    ///
    /// `end_limit` is clamped to the last sample of the buffer so the guard is
    /// itself a readable position, and `start_limit` is clamped to `end_limit`.
    pub fn build(
        buffer: &AudioBuffer,
        start_limit: usize,
        end_limit: usize,
        mode: SplitMode,
    ) -> Self {
        let end_limit = end_limit.min(buffer.len().saturating_sub(1));
        let start_limit = start_limit.min(end_limit);
        let window = &buffer.samples()[start_limit..end_limit];

        let count = window.iter().filter(|&&s| mode.qualifies(s)).count();
        let mut points = Vec::with_capacity(count + 1);
        points.extend(
            window
                .iter()
                .enumerate()
                .filter(|&(_, &s)| mode.qualifies(s))
                .map(|(i, _)| start_limit + i),
        );
        points.push(end_limit);

        Self {
            points,
            start_limit,
            end_limit,
        }
    }

    /// Build over the whole buffer
    pub fn build_full(buffer: &AudioBuffer, mode: SplitMode) -> Self {
        Self::build(buffer, 0, buffer.len(), mode)
    }

    /// Number of entries, guard included
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when no pair of positions can be formed
    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 2
    }

    /// Never true: the guard is always present
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[usize] {
        &self.points
    }

    #[inline]
    pub fn get(&self, i: usize) -> usize {
        self.points[i]
    }

    pub fn start_limit(&self) -> usize {
        self.start_limit
    }

    /// The (clamped) end of the window, equal to the guard entry
    pub fn end_limit(&self) -> usize {
        self.end_limit
    }

    /// Fail with `DegenerateInput` unless at least two entries exist
    pub fn ensure_selectable(&self) -> Result<()> {
        if self.is_degenerate() {
            return Err(ShatterError::DegenerateInput {
                reason: format!(
                    "no cut points found in samples {}..{}",
                    self.start_limit, self.end_limit
                ),
            });
        }
        Ok(())
    }
}
