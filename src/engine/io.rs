//! Audio file I/O for Shatter
//!
//! The render core only sees the [`AudioSource`] and [`AudioSink`] traits.
//! WAV files are handled through `hound`; the in-memory implementations are
//! used by tests and by callers that already hold decoded audio.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;

use crate::engine::buffer::AudioBuffer;
use crate::error::{Result, ShatterError};

/// Something that can hand over a whole recording as floats
pub trait AudioSource {
    /// Sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Channel count as declared by the source
    fn channels(&self) -> u16;

    /// Number of frames the source declares
    fn frame_count(&self) -> usize;

    /// Decode every sample to `f32` in `[-1.0, 1.0]`
    fn read_all_samples(&mut self) -> Result<Vec<f32>>;
}

/// Something that accepts rendered blocks
pub trait AudioSink {
    /// Write one block, returning the number of frames accepted
    fn write_block(&mut self, block: &[f32]) -> Result<usize>;

    /// Flush and release the sink. Calling it twice is a no-op.
    fn close(&mut self) -> Result<()>;
}

/// Load a mono recording from any source
///
/// Channel count and length are checked from the header before any sample
/// memory is allocated.
///
/// # Errors
/// * `UnsupportedChannels` - if the source is not mono
/// * `EmptyAudio` - if the source declares no frames
pub fn load_mono<S: AudioSource + ?Sized>(source: &mut S) -> Result<AudioBuffer> {
    let channels = source.channels();
    if channels != 1 {
        return Err(ShatterError::UnsupportedChannels { channels });
    }
    if source.frame_count() == 0 {
        return Err(ShatterError::EmptyAudio);
    }

    let samples = source.read_all_samples()?;
    debug!(
        "Loaded {} frames at {} Hz",
        samples.len(),
        source.sample_rate()
    );
    AudioBuffer::new(samples, source.sample_rate())
}

// ============================================================================
// WAV source
// ============================================================================

/// A WAV file opened for reading
pub struct WavSource {
    path: String,
    spec: WavSpec,
    frames: usize,
    reader: WavReader<BufReader<File>>,
}

impl WavSource {
    /// Open a WAV file and read its header
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = WavReader::open(path).map_err(|e| ShatterError::AudioRead {
            path: path.display().to_string(),
            source: e,
        })?;
        let spec = reader.spec();
        let frames = reader.duration() as usize;

        Ok(Self {
            path: path.display().to_string(),
            spec,
            frames,
            reader,
        })
    }

    /// The header of the opened file
    pub fn spec(&self) -> WavSpec {
        self.spec
    }
}

impl AudioSource for WavSource {
    fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    fn channels(&self) -> u16 {
        self.spec.channels
    }

    fn frame_count(&self) -> usize {
        self.frames
    }

    fn read_all_samples(&mut self) -> Result<Vec<f32>> {
        let path = &self.path;
        match self.spec.sample_format {
            SampleFormat::Float => self
                .reader
                .samples::<f32>()
                .map(|s| {
                    s.map_err(|e| ShatterError::AudioRead {
                        path: path.clone(),
                        source: e,
                    })
                })
                .collect::<Result<Vec<f32>>>(),
            SampleFormat::Int => {
                let max_val = (1u64 << (self.spec.bits_per_sample - 1)) as f32;
                self.reader
                    .samples::<i32>()
                    .map(|s| {
                        s.map(|v| v as f32 / max_val)
                            .map_err(|e| ShatterError::AudioRead {
                                path: path.clone(),
                                source: e,
                            })
                    })
                    .collect::<Result<Vec<f32>>>()
            }
        }
    }
}

// ============================================================================
// WAV sink
// ============================================================================

/// A mono WAV file opened for writing
pub struct WavSink {
    path: String,
    spec: WavSpec,
    writer: Option<WavWriter<BufWriter<File>>>,
}

impl WavSink {
    /// Create the output file
    ///
    /// The channel count is forced to mono; bit depth and sample format are
    /// taken from `spec` so the output mirrors the input file.
    pub fn create<P: AsRef<Path>>(path: P, spec: WavSpec) -> Result<Self> {
        let path = path.as_ref();
        let spec = WavSpec {
            channels: 1,
            ..spec
        };

        match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Float, 32) | (SampleFormat::Int, 8 | 16 | 24 | 32) => {}
            (format, bits) => {
                return Err(ShatterError::config(format!(
                    "cannot write {}-bit {:?} audio",
                    bits, format
                )))
            }
        }

        let writer = WavWriter::create(path, spec).map_err(|e| ShatterError::AudioWrite {
            path: path.display().to_string(),
            source: e,
        })?;

        Ok(Self {
            path: path.display().to_string(),
            spec,
            writer: Some(writer),
        })
    }

    /// 32-bit float mono at the given rate
    pub fn create_float<P: AsRef<Path>>(path: P, sample_rate: u32) -> Result<Self> {
        Self::create(
            path,
            WavSpec {
                channels: 1,
                sample_rate,
                bits_per_sample: 32,
                sample_format: SampleFormat::Float,
            },
        )
    }

    fn write_error(&self, source: hound::Error) -> ShatterError {
        ShatterError::AudioWrite {
            path: self.path.clone(),
            source,
        }
    }
}

impl AudioSink for WavSink {
    fn write_block(&mut self, block: &[f32]) -> Result<usize> {
        let spec = self.spec;
        let Some(writer) = self.writer.as_mut() else {
            return Err(ShatterError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "write to a closed sink",
            )));
        };

        let result = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Float, _) => block.iter().try_for_each(|&s| writer.write_sample(s)),
            (_, 8) => block.iter().try_for_each(|&s| {
                writer.write_sample((s * 127.0).clamp(-128.0, 127.0) as i8)
            }),
            (_, 16) => block.iter().try_for_each(|&s| {
                writer.write_sample((s * 32767.0).clamp(-32768.0, 32767.0) as i16)
            }),
            (_, 24) => block.iter().try_for_each(|&s| {
                // 24-bit stored as i32 in hound
                writer.write_sample((s * 8388607.0).clamp(-8388608.0, 8388607.0) as i32)
            }),
            _ => block.iter().try_for_each(|&s| {
                let scaled = s as f64 * 2147483647.0;
                writer.write_sample(scaled.clamp(-2147483648.0, 2147483647.0) as i32)
            }),
        };

        result.map_err(|e| self.write_error(e))?;
        Ok(block.len())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().map_err(|e| self.write_error(e))?;
        }
        Ok(())
    }
}

// ============================================================================
// In-memory collaborators
// ============================================================================

/// Decoded audio already held in memory
#[derive(Debug, Clone)]
pub struct MemorySource {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl MemorySource {
    /// A mono source
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::with_channels(samples, sample_rate, 1)
    }

    /// Interleaved samples with an arbitrary channel count
    pub fn with_channels(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }
}

impl AudioSource for MemorySource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn frame_count(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    fn read_all_samples(&mut self) -> Result<Vec<f32>> {
        Ok(std::mem::take(&mut self.samples))
    }
}

/// Collects every written block
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    samples: Vec<f32>,
    blocks: usize,
    closed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of `write_block` calls
    pub fn blocks(&self) -> usize {
        self.blocks
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

impl AudioSink for MemorySink {
    fn write_block(&mut self, block: &[f32]) -> Result<usize> {
        self.samples.extend_from_slice(block);
        self.blocks += 1;
        Ok(block.len())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

// ============================================================================
// Test signals
// ============================================================================

/// Generate a mono sine wave
///
/// # Arguments
/// * `frequency` - Frequency of the sine wave in Hz
/// * `duration_secs` - Duration of the tone in seconds
/// * `sample_rate` - Sample rate in Hz
pub fn generate_test_tone(
    frequency: f32,
    duration_secs: f32,
    sample_rate: u32,
) -> Result<AudioBuffer> {
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;

    let samples = (0..num_samples)
        .map(|i| (angular_freq * i as f32).sin())
        .collect();

    AudioBuffer::new(samples, sample_rate)
}

// ============================================================================
// Tests
// ============================================================================
