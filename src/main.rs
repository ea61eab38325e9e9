//! Progress stream - render a JSON progress stream
//!
//! CLI entry point: reads messages from a file or stdin and renders them to
//! stdout.

// Allow multiple crate versions from dependencies (can't easily control)
#![allow(clippy::multiple_crate_versions)]

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use env_logger::{Env, Target};

use progress_stream::{DisplayConfig, Message, OutputMode, StreamMultiplexer, TerminalOutput};

/// Render a JSON progress stream
///
/// Reads one JSON message per object from the input and draws it as a live
/// per-operation display on a terminal, or as a plain log otherwise.
#[derive(Parser, Debug)]
#[command(name = "progress-stream", version, about)]
struct Cli {
    /// Display configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read messages from this file instead of stdin
    #[arg(long)]
    input: Option<PathBuf>,

    /// Terminal type used instead of $TERM
    #[arg(long)]
    term: Option<String>,

    /// Fixed output width in columns
    #[arg(long)]
    width: Option<usize>,

    /// Never move the cursor, even on a terminal
    #[arg(long)]
    plain: bool,
}

/// Load the configuration file, if any, and apply command-line overrides.
fn load_config(cli: &Cli) -> Result<DisplayConfig> {
    let mut config = match &cli.config {
        Some(path) => DisplayConfig::from_path(path)
            .with_context(|| format!("Failed to load config from '{}'", path.display()))?,
        None => DisplayConfig::default(),
    };
    if cli.term.is_some() {
        config.term.clone_from(&cli.term);
    }
    if cli.width.is_some() {
        config.width = cli.width;
    }
    if cli.plain {
        config.mode = OutputMode::Plain;
    }
    Ok(config)
}

fn open_input(path: Option<&PathBuf>) -> Result<Box<dyn Read>> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open input '{}'", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(io::stdin().lock())),
    }
}

/// Print an out-of-band payload as one compact JSON line on stderr.
fn print_aux(message: &Message) {
    if let Some(aux) = &message.aux {
        eprintln!("{aux}");
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .target(Target::Stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let input = open_input(cli.input.as_ref())?;

    let stdout = io::stdout();
    let is_terminal = config.mode.use_terminal(TerminalOutput::is_terminal(&stdout));
    let width_query = stdout.width_query();

    let mut mux = StreamMultiplexer::new(stdout.lock())
        .with_width_query(width_query)
        .with_aux_callback(print_aux);
    if is_terminal {
        mux = mux.terminal(config.capabilities());
    }
    if let Some(width) = config.width {
        mux = mux.with_width(width);
    }

    if let Err(err) = mux.display(input) {
        eprintln!("{} {err}", "Error:".red().bold());
        std::process::exit(1);
    }
    Ok(())
}
