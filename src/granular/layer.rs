//! Layers
//!
//! A layer is one playback stream: a cursor into the source buffer, a gain,
//! and the shard it currently loops over.

use rand::Rng;

use crate::engine::buffer::AudioBuffer;
use crate::granular::shard::Shard;

/// What a single tick produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Gain-scaled sample value
    pub value: f32,
    /// The shard lost its reshuffle trial and must be replaced
    pub reshuffled: bool,
}

impl Tick {
    const SILENT: Tick = Tick {
        value: 0.0,
        reshuffled: false,
    };
}

/// One of the N summed playback streams
#[derive(Debug, Clone)]
pub struct Layer {
    cursor: usize,
    amplitude: f32,
    active: bool,
    flat_gain: f32,
    loop_gain: f32,
    shard: Shard,
}

impl Layer {
    /// A layer playing from the top of the buffer at `1/N` gain
    ///
    /// The shard is taken over as-is; call [`Layer::activate_shard`] to
    /// start looping it.
    pub fn new(layer_count: usize, shard: Shard) -> Self {
        let n = layer_count.max(1) as f32;
        Self {
            cursor: 0,
            amplitude: 1.0 / n,
            active: true,
            flat_gain: 1.0 / n,
            loop_gain: 1.0 / n.sqrt(),
            shard,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Current per-sample gain
    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn shard(&self) -> &Shard {
        &self.shard
    }

    /// Gain used while a shard is looping (`1/√N`)
    pub fn loop_gain(&self) -> f32 {
        self.loop_gain
    }

    /// Gain used outside a shard loop (`1/N`)
    pub fn flat_gain(&self) -> f32 {
        self.flat_gain
    }

    /// Start looping the current shard at `1/√N`
    pub fn activate_shard(&mut self) {
        self.shard.activate();
        self.amplitude = self.loop_gain;
    }

    /// Stop looping; the layer plays on to the end of the buffer and stops
    pub fn release(&mut self) {
        self.shard.deactivate();
        self.amplitude = self.flat_gain;
    }

    /// Swap in a freshly drawn shard and jump to its start
    ///
    /// The new shard is switched to looping at `1/√N`. Returns the retired
    /// shard.
    pub fn replace_shard(&mut self, mut shard: Shard) -> Shard {
        shard.activate();
        self.cursor = shard.start();
        self.amplitude = self.loop_gain;
        std::mem::replace(&mut self.shard, shard)
    }

    /// Produce one sample and advance
    ///
    /// Passing the shard end while looping jumps back to the shard start and
    /// runs the reshuffle trial. Running off the end of the buffer wraps to
    /// zero, and stops the layer if its shard is no longer looping.
    pub fn tick<R: Rng + ?Sized>(&mut self, buffer: &AudioBuffer, bias: f64, rng: &mut R) -> Tick {
        if !self.active {
            return Tick::SILENT;
        }

        let value = buffer[self.cursor] * self.amplitude;
        self.cursor += 1;

        let mut reshuffled = false;
        if self.shard.is_looping() && self.cursor > self.shard.end() {
            self.cursor = self.shard.start();
            self.amplitude = self.loop_gain;
            reshuffled = self.shard.reshuffle_trial(bias, rng);
        }

        if self.cursor >= buffer.len() {
            self.cursor = 0;
            if !self.shard.is_looping() {
                self.active = false;
            }
        }

        Tick { value, reshuffled }
    }
}
