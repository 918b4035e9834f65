//! Plasmaterm - music turned into liquid light in your terminal
//!
//! Nine frequency bands become nine glowing strands or plasma beams that
//! wander, flicker and blend as the spectrum shifts.

mod cli;
mod host;

use std::fs::File;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt,
};

use cli::Args;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    if args.list_devices {
        for name in plasmaterm::audio::list_input_devices()? {
            println!("{}", name);
        }
        return Ok(());
    }

    match args.headless {
        Some(frames) => host::run_headless(&args, frames),
        None => host::run(&args),
    }
}

/// Install a subscriber only where log lines cannot corrupt the screen:
/// a log file, or stderr when running headless
fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(); // RUST_LOG env var takes precedence

    if let Some(path) = &args.log_file {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file: {:?}", path))?;
        fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    } else if args.headless.is_some() || args.list_devices {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
    Ok(())
}
