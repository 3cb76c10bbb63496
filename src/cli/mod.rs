//! CLI Module
//!
//! Command-line interface for the shatter renderer.

pub mod commands;

use clap::Parser;
use std::path::PathBuf;

use crate::config::{ShatterConfig, DEFAULT_MAX_SHARD_MS, DEFAULT_MIN_SHARD_MS};
use crate::granular::{SplitMode, DEFAULT_BIAS};

/// Shatters an audio file over a number of layers
#[derive(Parser, Debug)]
#[command(name = "shatter")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Split anywhere instead of only at zero crossings
    #[arg(short = 'z', conflicts_with = "near_zero")]
    pub unrestricted: bool,

    /// Split where |sample| <= THRESH (0.0 to 1.0)
    #[arg(short = 'n', value_name = "THRESH")]
    pub near_zero: Option<f32>,

    /// Start of the split point search window, in seconds
    #[arg(short = 's', value_name = "SECS")]
    pub search_start: Option<f64>,

    /// End of the split point search window, in seconds
    #[arg(short = 'e', value_name = "SECS")]
    pub search_end: Option<f64>,

    /// Stop at the requested length instead of letting layers play out
    #[arg(short = 't')]
    pub no_tail: bool,

    /// Print every shard once the render is done
    #[arg(short = 'l')]
    pub list_shards: bool,

    /// Reshuffle bias (0.0 to 1.0); lower values reshuffle sooner
    #[arg(short = 'b', value_name = "BIAS", default_value_t = DEFAULT_BIAS)]
    pub bias: f64,

    /// Minimum shard length in milliseconds
    #[arg(short = 'm', value_name = "MS", default_value_t = DEFAULT_MIN_SHARD_MS)]
    pub min_ms: f64,

    /// Maximum shard length in milliseconds
    #[arg(short = 'x', value_name = "MS", default_value_t = DEFAULT_MAX_SHARD_MS)]
    pub max_ms: f64,

    /// Seed the random generator for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write a JSON summary of the run to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Input audio file (mono WAV)
    pub infile: PathBuf,

    /// Output audio file
    pub outfile: PathBuf,

    /// Requested output length in seconds
    #[arg(allow_negative_numbers = true)]
    pub length_seconds: f64,

    /// Number of layers
    pub layers: usize,
}

impl Cli {
    /// The run configuration these arguments describe
    pub fn to_config(&self) -> ShatterConfig {
        let split_mode = if self.unrestricted {
            SplitMode::Unrestricted
        } else if let Some(threshold) = self.near_zero {
            SplitMode::NearZero(threshold)
        } else {
            SplitMode::ExactZero
        };

        ShatterConfig {
            length_secs: self.length_seconds,
            layers: self.layers,
            split_mode,
            search_start_secs: self.search_start,
            search_end_secs: self.search_end,
            tail: !self.no_tail,
            diagnostics: self.list_shards,
            bias: self.bias,
            min_shard_ms: self.min_ms,
            max_shard_ms: self.max_ms,
            seed: self.seed,
            ..ShatterConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("shatter").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_positional_arguments() {
        let cli = parse(&["in.wav", "out.wav", "10", "4"]);
        let config = cli.to_config();

        assert_eq!(cli.infile, PathBuf::from("in.wav"));
        assert_eq!(cli.outfile, PathBuf::from("out.wav"));
        assert_eq!(config.length_secs, 10.0);
        assert_eq!(config.layers, 4);
        assert_eq!(config.split_mode, SplitMode::ExactZero);
        assert_eq!(config.bias, 0.75);
        assert!(config.tail);
        assert!(!config.diagnostics);
    }

    #[test]
    fn test_attached_flag_values() {
        let cli = parse(&[
            "-n0.05", "-s0.5", "-e2", "-t", "-l", "-b0.5", "-m100", "-x200", "in.wav", "out.wav",
            "3.5", "2",
        ]);
        let config = cli.to_config();

        assert_eq!(config.split_mode, SplitMode::NearZero(0.05));
        assert_eq!(config.search_start_secs, Some(0.5));
        assert_eq!(config.search_end_secs, Some(2.0));
        assert!(!config.tail);
        assert!(config.diagnostics);
        assert_eq!(config.bias, 0.5);
        assert_eq!(config.min_shard_ms, 100.0);
        assert_eq!(config.max_shard_ms, 200.0);
    }

    #[test]
    fn test_unrestricted_and_seed() {
        let cli = parse(&["-z", "--seed", "42", "in.wav", "out.wav", "1", "1"]);
        let config = cli.to_config();

        assert_eq!(config.split_mode, SplitMode::Unrestricted);
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn test_z_conflicts_with_n() {
        let result = Cli::try_parse_from(["shatter", "-z", "-n0.1", "in.wav", "out.wav", "1", "1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_arguments() {
        assert!(Cli::try_parse_from(["shatter", "in.wav", "out.wav"]).is_err());
    }

    #[test]
    fn test_negative_length_reaches_validation() {
        let cli = parse(&["in.wav", "out.wav", "-1", "2"]);
        assert!(cli.to_config().validate().is_err());
    }
}
