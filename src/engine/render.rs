//! Render State Machine
//!
//! Drives the sample-by-sample mix of all layers and the lifecycle of a run:
//!
//! ```text
//! Render --(requested length reached, tail on)--> Tail --(all layers stopped)--> Done
//!    \--------------(requested length reached, tail off / cancelled)------------/
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::engine::buffer::{frames_to_secs, AudioBuffer};
use crate::engine::io::AudioSink;
use crate::error::{Result, ShatterError};
use crate::granular::{CrossingIndex, Layer, Shard, ShardBounds, SplitMode};

/// Frames per block handed to the sink
pub const BLOCK_SIZE: usize = 1024;

/// Lifecycle of a render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum EngineState {
    /// Producing the requested length with looping shards
    #[default]
    Render,
    /// Shards released, layers playing out to the buffer end
    Tail,
    /// Terminal
    Done,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Render => write!(f, "Render"),
            EngineState::Tail => write!(f, "Tail"),
            EngineState::Done => write!(f, "Done"),
        }
    }
}

/// Everything the engine needs, in samples
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Number of layers (N)
    pub layers: usize,
    /// Requested output length in frames
    pub length: usize,
    /// Play the tail after the requested length
    pub tail: bool,
    /// Stay-probability multiplier per surviving pass
    pub bias: f64,
    /// Allowed shard length
    pub bounds: ShardBounds,
    /// Cut point criterion
    pub split_mode: SplitMode,
    /// First frame of the cut point search window
    pub search_start: usize,
    /// End of the cut point search window (exclusive, clamped to the buffer)
    pub search_end: usize,
    /// Frames per block
    pub block_size: usize,
    /// Record a [`ShardEvent`] for every retired shard
    pub collect_shards: bool,
}

/// One shard as seen over its lifetime
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShardEvent {
    /// Index of the owning layer
    pub layer: usize,
    pub start: usize,
    pub end: usize,
    pub start_secs: f64,
    pub end_secs: f64,
    pub length_ms: f64,
    /// First output frame played from the shard
    pub assigned_at: usize,
    /// Loop passes survived before retirement
    pub passes: u32,
    /// Stay probability at retirement
    pub final_probability: f64,
}

/// Outcome of a finished run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSummary {
    pub sample_rate: u32,
    pub layers: usize,
    /// Frames produced during Render
    pub rendered: usize,
    /// Frames produced during Tail
    pub tail: usize,
    /// Frames accepted by the sink
    pub written: usize,
    /// Shards replaced after losing a reshuffle trial
    pub reshuffles: usize,
    /// Stopped by the cancel flag
    pub cancelled: bool,
    /// Retired shards, when collection was enabled
    pub shards: Vec<ShardEvent>,
}

impl RenderSummary {
    pub fn total_frames(&self) -> usize {
        self.rendered + self.tail
    }

    pub fn duration_secs(&self) -> f64 {
        frames_to_secs(self.total_frames(), self.sample_rate)
    }
}

/// Owns the source, the crossing index and all layers for a run
pub struct Engine<R: Rng = StdRng> {
    buffer: AudioBuffer,
    crossings: CrossingIndex,
    layers: Vec<Layer>,
    assigned_at: Vec<usize>,
    settings: EngineSettings,
    rng: R,
    state: EngineState,
    rendered: usize,
    tail: usize,
    written: usize,
    reshuffles: usize,
    cancelled: bool,
    shards: Vec<ShardEvent>,
}

impl Engine<StdRng> {
    /// Build an engine with a seeded generator, or one seeded from the OS
    pub fn with_seed(
        buffer: AudioBuffer,
        settings: EngineSettings,
        seed: Option<u64>,
    ) -> Result<Self> {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => {
                let mut thread_rng = rand::rng();
                StdRng::from_rng(&mut thread_rng)
            }
        };
        Self::new(buffer, settings, rng)
    }
}

impl<R: Rng> Engine<R> {
    /// Build the crossing index and draw the first shard of every layer
    ///
    /// # Errors
    /// * `Config` - if there are no layers or the block size is zero
    /// * `DegenerateInput` - if no shard fits the bounds
    pub fn new(buffer: AudioBuffer, settings: EngineSettings, mut rng: R) -> Result<Self> {
        if settings.layers == 0 {
            return Err(ShatterError::config("layer count must be at least 1"));
        }
        if settings.block_size == 0 {
            return Err(ShatterError::config("block size must be at least 1"));
        }

        let crossings = CrossingIndex::build(
            &buffer,
            settings.search_start,
            settings.search_end,
            settings.split_mode,
        );
        info!(
            "Found {} cut points in frames {}..{}",
            crossings.len() - 1,
            crossings.start_limit(),
            crossings.end_limit()
        );

        let mut layers = Vec::with_capacity(settings.layers);
        for i in 0..settings.layers {
            let shard = Shard::select(&crossings, settings.bounds, &mut rng)?;
            debug!("Layer {}: initial shard {}..={}", i, shard.start(), shard.end());
            let mut layer = Layer::new(settings.layers, shard);
            layer.activate_shard();
            layers.push(layer);
        }

        Ok(Self {
            buffer,
            crossings,
            assigned_at: vec![0; settings.layers],
            layers,
            settings,
            rng,
            state: EngineState::Render,
            rendered: 0,
            tail: 0,
            written: 0,
            reshuffles: 0,
            cancelled: false,
            shards: Vec::new(),
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn crossings(&self) -> &CrossingIndex {
        &self.crossings
    }

    pub fn buffer(&self) -> &AudioBuffer {
        &self.buffer
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Frames produced so far (Render + Tail)
    pub fn frames_produced(&self) -> usize {
        self.rendered + self.tail
    }

    /// Run to completion, writing every block to `sink`
    ///
    /// `cancel` is polled once per block; when set the run ends as if the
    /// engine had reached Done.
    pub fn run<S: AudioSink + ?Sized>(
        &mut self,
        sink: &mut S,
        cancel: Option<&AtomicBool>,
    ) -> Result<RenderSummary> {
        let mut block = Vec::with_capacity(self.settings.block_size);

        while self.state != EngineState::Done {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                info!("Cancelled after {} frames", self.frames_produced());
                self.cancelled = true;
                self.finish();
                break;
            }

            self.process_block(&mut block)?;
            if block.is_empty() {
                continue;
            }

            let written = sink.write_block(&block)?;
            if written != block.len() {
                return Err(ShatterError::ShortWrite {
                    expected: block.len(),
                    written,
                });
            }
            self.written += written;
        }

        Ok(self.summary())
    }

    /// Fill `block` with the next frames and advance the state machine
    ///
    /// The last Render block is cut short so that exactly the requested
    /// length is rendered. A Tail block ends early once every layer has
    /// stopped. Leaves `block` empty in Done.
    pub fn process_block(&mut self, block: &mut Vec<f32>) -> Result<()> {
        block.clear();

        match self.state {
            EngineState::Render => {
                let n = self
                    .settings
                    .block_size
                    .min(self.settings.length - self.rendered);
                for _ in 0..n {
                    let sample = self.mix_sample()?;
                    block.push(sample);
                    self.rendered += 1;
                }

                if self.rendered >= self.settings.length {
                    self.end_render();
                }
            }
            EngineState::Tail => {
                while block.len() < self.settings.block_size {
                    if self.layers.iter().all(|layer| !layer.is_active()) {
                        info!("Tail finished after {} frames", self.tail);
                        self.finish();
                        break;
                    }
                    let sample = self.mix_sample()?;
                    block.push(sample);
                    self.tail += 1;
                }
            }
            EngineState::Done => {}
        }

        Ok(())
    }

    /// Snapshot of the run so far
    pub fn summary(&self) -> RenderSummary {
        RenderSummary {
            sample_rate: self.buffer.sample_rate(),
            layers: self.layers.len(),
            rendered: self.rendered,
            tail: self.tail,
            written: self.written,
            reshuffles: self.reshuffles,
            cancelled: self.cancelled,
            shards: self.shards.clone(),
        }
    }

    fn mix_sample(&mut self) -> Result<f32> {
        let mut sum = 0.0;
        for i in 0..self.layers.len() {
            let tick = self.layers[i].tick(&self.buffer, self.settings.bias, &mut self.rng);
            sum += tick.value;
            if tick.reshuffled {
                self.reshuffle(i)?;
            }
        }
        Ok(sum)
    }

    /// The new shard plays from the frame after the one being mixed
    fn reshuffle(&mut self, layer: usize) -> Result<()> {
        let shard = Shard::select(&self.crossings, self.settings.bounds, &mut self.rng)?;
        let frame = self.frames_produced() + 1;
        debug!(
            "Layer {}: reshuffled to {}..={} at frame {}",
            layer,
            shard.start(),
            shard.end(),
            frame
        );

        let retired = self.layers[layer].replace_shard(shard);
        self.record(layer, &retired);
        self.assigned_at[layer] = frame;
        self.reshuffles += 1;
        Ok(())
    }

    fn end_render(&mut self) {
        if self.settings.tail {
            info!("Rendered {} frames, releasing shards", self.rendered);
            for layer in &mut self.layers {
                layer.release();
            }
            self.state = EngineState::Tail;
        } else {
            info!("Rendered {} frames, tail disabled", self.rendered);
            self.finish();
        }
    }

    fn finish(&mut self) {
        for i in 0..self.layers.len() {
            let shard = self.layers[i].shard().clone();
            self.record(i, &shard);
        }
        self.state = EngineState::Done;
    }

    fn record(&mut self, layer: usize, shard: &Shard) {
        if !self.settings.collect_shards {
            return;
        }
        let sample_rate = self.buffer.sample_rate();
        self.shards.push(ShardEvent {
            layer,
            start: shard.start(),
            end: shard.end(),
            start_secs: frames_to_secs(shard.start(), sample_rate),
            end_secs: frames_to_secs(shard.end(), sample_rate),
            length_ms: frames_to_secs(shard.len(), sample_rate) * 1000.0,
            assigned_at: self.assigned_at[layer],
            passes: shard.passes(),
            final_probability: shard.reshuffle_probability(),
        });
    }
}
