//! Audio Buffer Management
//!
//! The source recording is held as one mono block of 32-bit floats and is
//! never written to after load.

use crate::error::{Result, ShatterError};

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert a duration in seconds to a whole number of frames
#[inline]
pub fn secs_to_frames(secs: f64, sample_rate: u32) -> usize {
    (secs * sample_rate as f64) as usize
}

/// Convert a duration in milliseconds to a whole number of frames
#[inline]
pub fn ms_to_frames(ms: f64, sample_rate: u32) -> usize {
    (ms * sample_rate as f64 / 1000.0) as usize
}

/// Convert a frame position to seconds
#[inline]
pub fn frames_to_secs(frames: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        0.0
    } else {
        frames as f64 / sample_rate as f64
    }
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// A loaded mono recording
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Wrap decoded samples
    ///
    /// # Errors
    /// * `EmptyAudio` - if `samples` is empty
    /// * `Config` - if `sample_rate` is zero
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if samples.is_empty() {
            return Err(ShatterError::EmptyAudio);
        }
        if sample_rate == 0 {
            return Err(ShatterError::config("sample rate must be non-zero"));
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Number of frames in the buffer
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed buffer, kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Read-only view of the samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        frames_to_secs(self.len(), self.sample_rate)
    }

    /// Peak absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max)
    }
}

impl std::ops::Index<usize> for AudioBuffer {
    type Output = f32;

    #[inline]
    fn index(&self, index: usize) -> &f32 {
        &self.samples[index]
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_rejects_empty() {
        let result = AudioBuffer::new(Vec::new(), 48000);
        assert!(matches!(result, Err(ShatterError::EmptyAudio)));
    }

    #[test]
    fn test_new_rejects_zero_rate() {
        let result = AudioBuffer::new(vec![0.0; 4], 0);
        assert!(matches!(result, Err(ShatterError::Config { .. })));
    }

    #[test]
    fn test_duration_and_peak() {
        let buffer = AudioBuffer::new(vec![0.0, -0.5, 0.25, 0.0], 4).unwrap();
        assert_eq!(buffer.len(), 4);
        assert!(!buffer.is_empty());
        assert_relative_eq!(buffer.duration_secs(), 1.0);
        assert_relative_eq!(buffer.peak(), 0.5);
        assert_relative_eq!(buffer[1], -0.5);
    }

    #[test]
    fn test_frame_conversions() {
        assert_eq!(secs_to_frames(2.0, 48000), 96000);
        assert_eq!(ms_to_frames(62.0, 48000), 2976);
        assert_eq!(ms_to_frames(495.0, 48000), 23760);
        assert_relative_eq!(frames_to_secs(24000, 48000), 0.5);
        assert_relative_eq!(frames_to_secs(10, 0), 0.0);
    }
}
