//! Run configuration
//!
//! `ShatterConfig` holds the user-facing settings in seconds and
//! milliseconds. It is validated before any audio is loaded and converted to
//! sample-based [`EngineSettings`] once the source's rate and length are known.

use serde::Serialize;

use crate::engine::buffer::{ms_to_frames, secs_to_frames};
use crate::engine::render::{EngineSettings, BLOCK_SIZE};
use crate::error::{Result, ShatterError};
use crate::granular::{ShardBounds, SplitMode, DEFAULT_BIAS};

/// Default minimum shard length in milliseconds
pub const DEFAULT_MIN_SHARD_MS: f64 = 62.0;

/// Default maximum shard length in milliseconds
pub const DEFAULT_MAX_SHARD_MS: f64 = 495.0;

/// Settings for one shatter run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShatterConfig {
    /// Requested output length in seconds
    pub length_secs: f64,
    /// Number of layers
    pub layers: usize,
    /// Cut point criterion
    pub split_mode: SplitMode,
    /// Start of the cut point search window in seconds
    pub search_start_secs: Option<f64>,
    /// End of the cut point search window in seconds
    pub search_end_secs: Option<f64>,
    /// Play layers out to the buffer end after the requested length
    pub tail: bool,
    /// Collect per-shard diagnostics
    pub diagnostics: bool,
    /// Stay-probability multiplier, in `[0, 1]`
    pub bias: f64,
    pub min_shard_ms: f64,
    pub max_shard_ms: f64,
    /// Fixed RNG seed for reproducible output
    pub seed: Option<u64>,
    /// Frames per output block
    pub block_size: usize,
}

impl Default for ShatterConfig {
    fn default() -> Self {
        Self {
            length_secs: 0.0,
            layers: 1,
            split_mode: SplitMode::ExactZero,
            search_start_secs: None,
            search_end_secs: None,
            tail: true,
            diagnostics: false,
            bias: DEFAULT_BIAS,
            min_shard_ms: DEFAULT_MIN_SHARD_MS,
            max_shard_ms: DEFAULT_MAX_SHARD_MS,
            seed: None,
            block_size: BLOCK_SIZE,
        }
    }
}

impl ShatterConfig {
    /// A default configuration for the given length and layer count
    pub fn new(length_secs: f64, layers: usize) -> Self {
        Self {
            length_secs,
            layers,
            ..Self::default()
        }
    }

    pub fn with_split_mode(mut self, mode: SplitMode) -> Self {
        self.split_mode = mode;
        self
    }

    pub fn with_shard_ms(mut self, min_ms: f64, max_ms: f64) -> Self {
        self.min_shard_ms = min_ms;
        self.max_shard_ms = max_ms;
        self
    }

    pub fn with_bias(mut self, bias: f64) -> Self {
        self.bias = bias;
        self
    }

    pub fn with_tail(mut self, tail: bool) -> Self {
        self.tail = tail;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_search_window(mut self, start_secs: Option<f64>, end_secs: Option<f64>) -> Self {
        self.search_start_secs = start_secs;
        self.search_end_secs = end_secs;
        self
    }

    /// Check every setting that does not depend on the source file
    pub fn validate(&self) -> Result<()> {
        if !self.length_secs.is_finite() || self.length_secs < 0.0 {
            return Err(ShatterError::config(format!(
                "length cannot be less than 0.0 seconds (got {})",
                self.length_secs
            )));
        }
        if self.layers == 0 {
            return Err(ShatterError::config("number of layers cannot be 0 or less"));
        }
        if !(0.0..=1.0).contains(&self.bias) {
            return Err(ShatterError::config(format!(
                "bias must be between 0.0 and 1.0 (got {})",
                self.bias
            )));
        }
        if let SplitMode::NearZero(threshold) = self.split_mode {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ShatterError::config(format!(
                    "near-zero threshold must be between 0.0 and 1.0 (got {})",
                    threshold
                )));
            }
        }
        if !self.min_shard_ms.is_finite() || self.min_shard_ms <= 0.0 {
            return Err(ShatterError::config(format!(
                "minimum shard length must be positive (got {} ms)",
                self.min_shard_ms
            )));
        }
        if !self.max_shard_ms.is_finite() || self.min_shard_ms > self.max_shard_ms {
            return Err(ShatterError::config(format!(
                "minimum shard length ({} ms) exceeds maximum ({} ms)",
                self.min_shard_ms, self.max_shard_ms
            )));
        }
        if let Some(start) = self.search_start_secs {
            if !start.is_finite() || start < 0.0 {
                return Err(ShatterError::config(format!(
                    "search start cannot be negative (got {} s)",
                    start
                )));
            }
        }
        if let Some(end) = self.search_end_secs {
            let start = self.search_start_secs.unwrap_or(0.0);
            if !end.is_finite() || end <= start {
                return Err(ShatterError::config(format!(
                    "search end ({} s) must be after search start ({} s)",
                    end, start
                )));
            }
        }
        if self.block_size == 0 {
            return Err(ShatterError::config("block size must be at least 1"));
        }
        Ok(())
    }

    /// Resolve to sample-based settings for a source of `frames` frames
    ///
    /// # Errors
    /// * `Config` - if validation fails, the search window starts past the
    ///   end of the source, or the shard lengths round to an empty range
    pub fn engine_settings(&self, sample_rate: u32, frames: usize) -> Result<EngineSettings> {
        self.validate()?;

        let search_start = self
            .search_start_secs
            .map_or(0, |secs| secs_to_frames(secs, sample_rate));
        let search_end = self
            .search_end_secs
            .map_or(frames, |secs| secs_to_frames(secs, sample_rate));
        if search_start >= frames {
            return Err(ShatterError::config(format!(
                "search window starts at frame {} but the source has {} frames",
                search_start, frames
            )));
        }

        let bounds = ShardBounds::new(
            ms_to_frames(self.min_shard_ms, sample_rate).max(1),
            ms_to_frames(self.max_shard_ms, sample_rate),
        )?;

        Ok(EngineSettings {
            layers: self.layers,
            length: secs_to_frames(self.length_secs, sample_rate),
            tail: self.tail,
            bias: self.bias,
            bounds,
            split_mode: self.split_mode,
            search_start,
            search_end,
            block_size: self.block_size,
            collect_shards: self.diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ShatterConfig::new(2.0, 3);
        assert!(config.validate().is_ok());
        assert_eq!(config.bias, 0.75);
        assert!(config.tail);
        assert_eq!(config.split_mode, SplitMode::ExactZero);
        assert_eq!(config.block_size, 1024);
    }

    #[test]
    fn test_rejects_bad_values() {
        let cases = vec![
            ShatterConfig::new(-1.0, 3),
            ShatterConfig::new(f64::NAN, 3),
            ShatterConfig::new(1.0, 0),
            ShatterConfig::new(1.0, 3).with_bias(1.5),
            ShatterConfig::new(1.0, 3).with_bias(-0.1),
            ShatterConfig::new(1.0, 3).with_split_mode(SplitMode::NearZero(2.0)),
            ShatterConfig::new(1.0, 3).with_shard_ms(500.0, 100.0),
            ShatterConfig::new(1.0, 3).with_shard_ms(0.0, 100.0),
            ShatterConfig::new(1.0, 3).with_search_window(Some(2.0), Some(1.0)),
            ShatterConfig::new(1.0, 3).with_search_window(Some(1.0), Some(1.0)),
            ShatterConfig::new(1.0, 3).with_search_window(Some(-1.0), None),
        ];

        for config in cases {
            match config.validate() {
                Err(ShatterError::Config { .. }) => {}
                other => panic!("Expected Config error for {:?}, got: {:?}", config, other),
            }
        }
    }

    #[test]
    fn test_edge_values_accepted() {
        assert!(ShatterConfig::new(0.0, 1).with_bias(0.0).validate().is_ok());
        assert!(ShatterConfig::new(0.0, 1).with_bias(1.0).validate().is_ok());
        assert!(ShatterConfig::new(1.0, 1)
            .with_split_mode(SplitMode::NearZero(0.0))
            .validate()
            .is_ok());
        assert!(ShatterConfig::new(1.0, 1).with_shard_ms(100.0, 100.0).validate().is_ok());
    }

    #[test]
    fn test_engine_settings_in_samples() {
        let config = ShatterConfig::new(2.0, 3).with_search_window(Some(0.25), Some(0.75));
        let settings = config.engine_settings(48000, 48000).unwrap();

        assert_eq!(settings.length, 96000);
        assert_eq!(settings.layers, 3);
        assert_eq!(settings.bounds.min, 2976);
        assert_eq!(settings.bounds.max, 23760);
        assert_eq!(settings.search_start, 12000);
        assert_eq!(settings.search_end, 36000);
        assert!(!settings.collect_shards);
    }

    #[test]
    fn test_search_window_past_source_end() {
        let config = ShatterConfig::new(1.0, 1).with_search_window(Some(5.0), None);
        assert!(matches!(
            config.engine_settings(48000, 48000),
            Err(ShatterError::Config { .. })
        ));
    }

    #[test]
    fn test_tiny_max_shard_rejected() {
        let config = ShatterConfig::new(1.0, 1).with_shard_ms(0.001, 0.001);
        assert!(matches!(
            config.engine_settings(48000, 48000),
            Err(ShatterError::Config { .. })
        ));
    }
}
