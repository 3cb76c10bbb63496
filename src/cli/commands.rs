//! CLI Command Implementations
//!
//! Wires the WAV collaborators, the configuration and the render engine
//! together for one run.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;

use log::{error, info};
use serde::Serialize;

use crate::cli::Cli;
use crate::config::ShatterConfig;
use crate::engine::{
    load_mono, AudioSink, AudioSource, Engine, RenderSummary, WavSink, WavSource,
};
use crate::error::{Result, ShatterError};

/// Every error raised during a failed run, in the order they happened
#[derive(Debug)]
pub struct RunErrors(pub Vec<ShatterError>);

impl RunErrors {
    pub fn count(&self) -> usize {
        self.0.len()
    }

    /// Log each error with its code and recovery hint
    pub fn report(&self) {
        for err in &self.0 {
            error!("[{}] {}", err.error_code(), err);
            let mut source = std::error::Error::source(err);
            while let Some(cause) = source {
                error!("  caused by: {}", cause);
                source = std::error::Error::source(cause);
            }
            error!("  hint: {}", err.recovery_hint());
        }
    }
}

impl fmt::Display for RunErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error(s)", self.0.len())
    }
}

impl std::error::Error for RunErrors {}

impl From<ShatterError> for RunErrors {
    fn from(err: ShatterError) -> Self {
        RunErrors(vec![err])
    }
}

#[derive(Serialize)]
struct RunReport<'a> {
    infile: String,
    outfile: String,
    config: &'a ShatterConfig,
    summary: &'a RenderSummary,
}

/// Shatter `cli.infile` into `cli.outfile`
///
/// The sink is closed even when rendering fails; a failed close is counted
/// as one more error. All other resources are released on drop.
pub fn shatter(
    cli: &Cli,
    cancel: Option<&AtomicBool>,
) -> std::result::Result<RenderSummary, RunErrors> {
    println!("SHATTER: shatters an audio file over a number of layers");

    let config = cli.to_config();
    config.validate()?;

    let mut source = WavSource::open(&cli.infile)?;
    if source.channels() != 1 {
        return Err(ShatterError::UnsupportedChannels {
            channels: source.channels(),
        }
        .into());
    }
    let settings = config.engine_settings(source.sample_rate(), source.frame_count())?;
    info!(
        "Input: {} ({} frames at {} Hz)",
        cli.infile.display(),
        source.frame_count(),
        source.sample_rate()
    );

    let spec = source.spec();
    let buffer = load_mono(&mut source)?;
    drop(source);

    let mut engine = Engine::with_seed(buffer, settings, config.seed)?;
    let mut sink = WavSink::create(&cli.outfile, spec)?;

    let rendered = engine.run(&mut sink, cancel);
    let summary = close_after_render(rendered, &mut sink)?;

    if cli.list_shards {
        print_shards(&summary);
    }
    if let Some(path) = &cli.report {
        write_report(path, cli, &config, &summary)?;
    }

    if summary.cancelled {
        println!(
            "Cancelled. Partial output ({:.2}s) saved to {}",
            summary.duration_secs(),
            cli.outfile.display()
        );
    } else {
        println!(
            "Done. {:.2}s written, output saved to {}",
            summary.duration_secs(),
            cli.outfile.display()
        );
    }

    Ok(summary)
}

/// Close `sink` whatever the render outcome was
///
/// A failed close is reported after the render error, if there was one.
pub fn close_after_render(
    rendered: Result<RenderSummary>,
    sink: &mut dyn AudioSink,
) -> std::result::Result<RenderSummary, RunErrors> {
    match (rendered, sink.close()) {
        (Ok(summary), Ok(())) => Ok(summary),
        (Err(e), Ok(())) | (Ok(_), Err(e)) => Err(e.into()),
        (Err(render_err), Err(close_err)) => Err(RunErrors(vec![render_err, close_err])),
    }
}

/// Print one line per shard, in retirement order
pub fn print_shards(summary: &RenderSummary) {
    println!("{:-<60}", "");
    for event in &summary.shards {
        println!(
            "layer {:>2}: {:>8.3}s - {:>8.3}s ({:>7.1} ms), {} passes",
            event.layer, event.start_secs, event.end_secs, event.length_ms, event.passes
        );
    }
    println!("{:-<60}", "");
    println!(
        "{} shards, {} reshuffles",
        summary.shards.len(),
        summary.reshuffles
    );
}

fn write_report(
    path: &Path,
    cli: &Cli,
    config: &ShatterConfig,
    summary: &RenderSummary,
) -> Result<()> {
    let report = RunReport {
        infile: cli.infile.display().to_string(),
        outfile: cli.outfile.display().to_string(),
        config,
        summary,
    };
    let json = serde_json::to_string_pretty(&report)?;
    fs::write(path, json)?;
    info!("Report written to {}", path.display());
    Ok(())
}
