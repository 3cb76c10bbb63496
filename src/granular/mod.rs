//! Granular Core
//!
//! The shard/layer model the render engine is built from:
//! - Crossing index: candidate cut points in the source
//! - Shards: bounded, randomly chosen stretches of the source
//! - Layers: playback cursors looping over one shard each

pub mod crossing;
pub mod layer;
pub mod shard;

pub use crossing::{CrossingIndex, SplitMode};
pub use layer::{Layer, Tick};
pub use shard::{Shard, ShardBounds, DEFAULT_BIAS, MAX_SELECTION_ATTEMPTS};
