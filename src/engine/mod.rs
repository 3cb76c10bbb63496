//! Audio Engine Module
//!
//! Core audio processing engine including:
//! - Audio buffer management
//! - Source/sink collaborators and WAV I/O
//! - Render state machine

pub mod buffer;
pub mod io;
pub mod render;

pub use buffer::AudioBuffer;
pub use io::{
    generate_test_tone, load_mono, AudioSink, AudioSource, MemorySink, MemorySource, WavSink,
    WavSource,
};
pub use render::{
    Engine, EngineSettings, EngineState, RenderSummary, ShardEvent, BLOCK_SIZE,
};
