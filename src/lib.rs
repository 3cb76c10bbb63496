//! Shatter - Batch Audio Granulation
//!
//! Shatter takes a mono recording and renders an output of any requested
//! length by summing several looping layers. Each layer repeats a randomly
//! chosen shard of the source, and shards are reshuffled with a probability
//! that grows the longer they survive.
//!
//! # Architecture
//!
//! - `granular`: crossing index, shards and layers
//! - `engine`: audio buffer, I/O collaborators and the render state machine
//! - `config`: user-facing settings and their validation
//! - `cli`: command-line front end

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod granular;

pub use config::ShatterConfig;
pub use error::{Result, ShatterError};
