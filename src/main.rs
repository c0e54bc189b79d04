//! keysym-replay - Keyboard Decoder Replay Tool
//!
//! Feeds scripted key events through the decoder and prints the committed
//! text, or dumps the keymap the decoder would use.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

use keysym_decoder::config::{Config, LoggingConfig};
use keysym_decoder::input::{Decoder, KeyEvent, KeymapFile};
use keysym_decoder::utils::format_user_error;

/// Command-line arguments for keysym-replay
#[derive(Parser, Debug)]
#[command(name = "keysym-replay")]
#[command(version, about = "Replay key events through the keysym decoder", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, env = "KEYSYM_DECODER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Keymap file (overrides the configured source)
    #[arg(short, long, env = "KEYSYM_DECODER_KEYMAP")]
    pub keymap: Option<PathBuf>,

    /// Auto-repeat policy (suppress|emit)
    #[arg(long)]
    pub repeat: Option<String>,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Write logs to file (in addition to stderr)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// keysym-replay subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a script of `<down|up|repeat> <keycode>` lines
    Replay {
        /// Events file, `-` for stdin
        #[arg(short, long, default_value = "-")]
        events: String,
    },

    /// Print the loaded keymap as a TOML keymap file
    DumpKeymap {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// One committed text, printed as a JSON line
#[derive(Serialize)]
struct CommitRecord<'a> {
    event: u64,
    keycode: u32,
    text: &'a str,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let result = run(args);
    if let Err(e) = &result {
        eprintln!("{}", format_user_error(e));
    }
    result
}

fn run(args: Args) -> Result<()> {
    let config = Config::load_or_default(args.config.as_deref())?
        .with_overrides(args.keymap.clone(), args.repeat.clone());
    config.validate()?;

    let _guard = init_logging(&args, &config.logging)?;

    info!("════════════════════════════════════════════════════════");
    info!("  keysym-replay v{}", env!("CARGO_PKG_VERSION"));
    info!("  Built: {} {}", env!("BUILD_DATE"), env!("BUILD_TIME"));
    info!("  Commit: {}", env!("GIT_HASH"));
    info!("════════════════════════════════════════════════════════");
    debug!("Config: {:?}", config);

    match &args.command {
        Command::Replay { events } => replay(&config, events),
        Command::DumpKeymap { output } => dump_keymap(&config, output.as_deref()),
    }
}

fn replay(config: &Config, events: &str) -> Result<()> {
    let tables = config.load_tables()?;
    let mut decoder = Decoder::new(&tables).with_repeat_policy(config.repeat_policy());

    let reader: Box<dyn BufRead> = if events == "-" {
        Box::new(io::stdin().lock())
    } else {
        let file = File::open(events).context(format!("Failed to open events file: {}", events))?;
        Box::new(BufReader::new(file))
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut index = 0u64;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read events file")?;
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let event: KeyEvent = line
            .parse()
            .with_context(|| format!("Invalid key event on line {}", line_no + 1))?;
        index += 1;

        if let Some(commit) = decoder.handle_event(event) {
            let record = CommitRecord {
                event: index,
                keycode: event.keycode,
                text: &commit.text,
            };
            serde_json::to_writer(&mut out, &record)?;
            writeln!(out)?;
        }
    }

    out.flush()?;

    let stats = decoder.stats();
    debug!(
        "Replay finished: {} events, {} commits, {} lookup misses, {} rejected, {} truncated",
        stats.events, stats.commits, stats.lookup_misses, stats.rejected, stats.truncated
    );
    Ok(())
}

fn dump_keymap(config: &Config, output: Option<&Path>) -> Result<()> {
    let tables = config.load_tables()?;
    let text = KeymapFile::from_tables(&tables)
        .to_toml()
        .context("Failed to serialize keymap")?;

    match output {
        Some(path) => {
            std::fs::write(path, text)
                .context(format!("Failed to write keymap file: {}", path.display()))?;
            info!("Keymap written to {}", path.display());
        }
        None => io::stdout().write_all(text.as_bytes())?,
    }
    Ok(())
}

fn init_logging(args: &Args, logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let log_level = match args.verbose {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "keysym_decoder={level},keysym_replay={level},warn",
            level = log_level
        ))
    });

    let log_format = args.log_format.as_deref().unwrap_or(&logging.format);

    // stdout carries the replay output, logs go to stderr
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    layers.push(match log_format {
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(io::stderr)
            .boxed(),
        "pretty" => tracing_subscriber::fmt::layer()
            .pretty()
            .with_writer(io::stderr)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(io::stderr)
            .boxed(),
    });

    let mut guard = None;
    if let Some(log_file) = args.log_file.as_ref().or(logging.file.as_ref()) {
        let dir = log_file
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let file_name = log_file
            .file_name()
            .context(format!("Invalid log file path: {}", log_file.display()))?;

        let file_appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);

        layers.push(match log_format {
            "json" => tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_ansi(false)
                .boxed(),
            _ => tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .boxed(),
        });
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();

    if let Some(log_file) = args.log_file.as_ref().or(logging.file.as_ref()) {
        info!("Logging to file: {}", log_file.display());
    }

    Ok(guard)
}
