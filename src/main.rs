//! Shatter CLI
//!
//! Command-line entry point: shatters a mono WAV file over a number of
//! looping layers.

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{info, warn};

use shatter::cli::{commands, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("Shatter v{}", env!("CARGO_PKG_VERSION"));

    let cancel = Arc::new(AtomicBool::new(false));
    if let Err(e) = install_cancel_handler(&cancel) {
        warn!("{:#}", e);
    }

    match commands::shatter(&cli, Some(cancel.as_ref())) {
        Ok(_) => ExitCode::SUCCESS,
        Err(errors) => {
            errors.report();
            eprintln!("{}", errors);
            ExitCode::FAILURE
        }
    }
}

/// Ctrl-C sets the flag; the engine stops at the next block boundary
fn install_cancel_handler(flag: &Arc<AtomicBool>) -> anyhow::Result<()> {
    let flag = Arc::clone(flag);
    ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
        .context("failed to install Ctrl-C handler, interrupting will drop unfinished output")?;
    Ok(())
}
