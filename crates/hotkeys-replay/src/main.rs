#![warn(missing_docs)]

//! Entry point for the `hotkeys-replay` binary.

mod cli;

use std::{io, process};

use clap::Parser;
use hotkeys_replay::{Result, Script, replay};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, registry};

use crate::cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = run().await {
        error!("{err}");
        eprintln!("error: {err}");
        process::exit(1);
    }
}

/// Parse CLI arguments, install logging, and replay the script.
async fn run() -> Result<()> {
    let Cli {
        log,
        script,
        fired_only,
    } = Cli::parse();
    let log_spec = log.spec();
    let env_filter = logging::env_filter_from_spec(&log_spec);
    registry()
        .with(env_filter)
        .with(fmt::layer().without_time().with_writer(io::stderr))
        .try_init()
        .ok();

    let parsed = Script::load(&script)?;
    info!(
        "replaying {} with {} contexts and {} steps",
        script.display(),
        parsed.contexts.len(),
        parsed.steps.len()
    );
    let lines = replay(&parsed).await?;
    let fired = lines.iter().filter(|l| l.fired()).count();
    for line in lines.iter().filter(|l| !fired_only || l.fired()) {
        println!("{line}");
    }
    info!("{fired} hotkeys fired");
    Ok(())
}
