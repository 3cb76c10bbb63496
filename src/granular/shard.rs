//! Shards
//!
//! A shard is the stretch of source audio a layer loops over. Its boundaries
//! are always taken from the crossing index, and it carries the probability
//! state that decides when it gets replaced.

use log::debug;
use rand::Rng;
use serde::Serialize;

use crate::error::{Result, ShatterError};
use crate::granular::crossing::CrossingIndex;

/// Random pair draws before falling back to a sweep of the index
pub const MAX_SELECTION_ATTEMPTS: usize = 4096;

/// Default multiplier applied to the stay probability after each surviving pass
pub const DEFAULT_BIAS: f64 = 0.75;

/// Allowed shard length, in samples, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShardBounds {
    pub min: usize,
    pub max: usize,
}

impl ShardBounds {
    /// # Errors
    /// * `Config` - if `min` is zero or `min > max`
    pub fn new(min: usize, max: usize) -> Result<Self> {
        if min == 0 {
            return Err(ShatterError::config("minimum shard length must be at least one sample"));
        }
        if min > max {
            return Err(ShatterError::config(format!(
                "minimum shard length ({} samples) exceeds maximum ({} samples)",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    #[inline]
    pub fn accepts(&self, len: usize) -> bool {
        self.min <= len && len <= self.max
    }
}

/// A bounded sub-range of the source buffer
#[derive(Debug, Clone, PartialEq)]
pub struct Shard {
    start: usize,
    end: usize,
    reshuffle_probability: f64,
    looping: bool,
    passes: u32,
}

impl Shard {
    /// A fresh, inactive shard over `start..=end`
    pub(crate) fn new(start: usize, end: usize) -> Self {
        debug_assert!(start < end);
        Self {
            start,
            end,
            reshuffle_probability: 1.0,
            looping: false,
            passes: 0,
        }
    }

    /// Pick a random shard whose boundaries both come from `index`
    ///
    /// Pairs of entries are drawn uniformly until one lies within `bounds`.
    /// After [`MAX_SELECTION_ATTEMPTS`] misses the index is swept from a
    /// random anchor for the first valid pair instead.
    ///
    /// # Errors
    /// * `DegenerateInput` - if the index has fewer than two entries or no
    ///   pair of entries is within `bounds`
    pub fn select<R: Rng + ?Sized>(
        index: &CrossingIndex,
        bounds: ShardBounds,
        rng: &mut R,
    ) -> Result<Self> {
        index.ensure_selectable()?;
        let m = index.len();

        let span = index.get(m - 1) - index.get(0);
        if bounds.min > span {
            return Err(ShatterError::DegenerateInput {
                reason: format!(
                    "shortest allowed shard ({} samples) exceeds the {} samples between \
                     the first and last cut point",
                    bounds.min, span
                ),
            });
        }

        for _ in 0..MAX_SELECTION_ATTEMPTS {
            let p = index.get(rng.random_range(0..m));
            let q = index.get(rng.random_range(0..m));
            if bounds.accepts(p.abs_diff(q)) {
                return Ok(Self::new(p.min(q), p.max(q)));
            }
        }

        debug!(
            "No shard within {}..={} samples after {} draws, sweeping {} cut points",
            bounds.min, bounds.max, MAX_SELECTION_ATTEMPTS, m
        );
        let anchor = rng.random_range(0..m);
        Self::sweep(index.points(), bounds, anchor).ok_or_else(|| ShatterError::DegenerateInput {
            reason: format!(
                "no pair of the {} cut points is {}..={} samples apart",
                m, bounds.min, bounds.max
            ),
        })
    }

    /// First valid pair whose lower entry is at or after `anchor`, wrapping
    fn sweep(points: &[usize], bounds: ShardBounds, anchor: usize) -> Option<Self> {
        let m = points.len();
        (0..m).map(|k| (anchor + k) % m).find_map(|i| {
            let start = points[i];
            let earliest_end = start.checked_add(bounds.min)?;
            let j = points.partition_point(|&p| p < earliest_end);
            points
                .get(j)
                .filter(|&&end| end - start <= bounds.max)
                .map(|&end| Self::new(start, end))
        })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    /// Last sample of the shard (inclusive)
    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Never true: a shard always spans at least one sample step
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn reshuffle_probability(&self) -> f64 {
        self.reshuffle_probability
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Completed loop passes, i.e. reshuffle trials run
    pub fn passes(&self) -> u32 {
        self.passes
    }

    pub fn activate(&mut self) {
        self.looping = true;
    }

    pub fn deactivate(&mut self) {
        self.looping = false;
    }

    /// Decide whether this shard gets replaced after a loop pass
    ///
    /// Returns true when the draw exceeds the current stay probability;
    /// otherwise the probability is multiplied by `bias`.
    pub fn reshuffle_trial<R: Rng + ?Sized>(&mut self, bias: f64, rng: &mut R) -> bool {
        let r: f64 = rng.random();
        self.trial_with_draw(r, bias)
    }

    pub(crate) fn trial_with_draw(&mut self, r: f64, bias: f64) -> bool {
        self.passes += 1;
        if r > self.reshuffle_probability {
            true
        } else {
            self.reshuffle_probability *= bias;
            false
        }
    }
}
