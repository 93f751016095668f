//! `mediapick` CLI - pick a playback backend for a media source

mod cmd;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use mediapick::MediapickConfig;

#[derive(Parser)]
#[command(name = "mediapick")]
#[command(about = "Choose a playback backend for a media URL")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/mediapick/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Full selection: cache, detection, capability ranking
    Select {
        /// Media source (URL, path or scheme-prefixed id)
        source: String,

        /// Confirm verdicts with a trial load
        #[arg(short, long)]
        load_test: bool,

        /// Evaluate these backends first (repeatable)
        #[arg(short, long = "prefer")]
        prefer: Vec<String>,

        /// Fail instead of falling back to native playback
        #[arg(long)]
        no_fallback: bool,

        /// URL heuristics only, no metadata probe
        #[arg(long)]
        offline: bool,
    },

    /// Heuristic-only selection (no network)
    Fast {
        source: String,
    },

    /// Detect the content type of a source
    Detect {
        source: String,

        /// URL heuristics only
        #[arg(long)]
        offline: bool,
    },

    /// Trial-load a source
    Verify {
        source: String,

        /// Per-attempt timeout in milliseconds
        #[arg(short, long)]
        timeout_ms: Option<u64>,

        /// Retries after the first attempt
        #[arg(short, long)]
        retries: Option<u32>,

        /// Skip security screening
        #[arg(long)]
        no_security: bool,

        /// Load until play-through instead of metadata
        #[arg(long)]
        full: bool,

        /// Single attempt, pass/fail only
        #[arg(short, long)]
        quick: bool,
    },

    /// Trial-load every source listed in a file (one per line, # comments)
    Batch {
        file: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "mediapick=debug" } else { "mediapick=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<MediapickConfig> {
    match path {
        Some(path) => MediapickConfig::load_from(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => MediapickConfig::load().context("loading default config"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Select {
            source,
            load_test,
            prefer,
            no_fallback,
            offline,
        } => {
            if offline {
                config.detect.network_probe = false;
            }
            if load_test {
                config.select.load_test = true;
            }
            if no_fallback {
                config.select.fallback_to_native = false;
            }
            if !prefer.is_empty() {
                config.select.preferred = prefer;
            }
            cmd::cmd_select(&config, &source, cli.format).await?;
        }
        Commands::Fast { source } => {
            cmd::cmd_fast(&config, &source, cli.format)?;
        }
        Commands::Detect { source, offline } => {
            if offline {
                config.detect.network_probe = false;
            }
            cmd::cmd_detect(&config, &source, cli.format).await?;
        }
        Commands::Verify {
            source,
            timeout_ms,
            retries,
            no_security,
            full,
            quick,
        } => {
            if let Some(ms) = timeout_ms {
                config.verify.timeout_ms = ms;
            }
            if let Some(n) = retries {
                config.verify.max_retries = n;
            }
            if no_security {
                config.verify.security_check = false;
            }
            if full {
                config.verify.preload = mediapick::Preload::Full;
            }
            cmd::cmd_verify(&config, &source, quick, cli.format).await?;
        }
        Commands::Batch { file } => {
            cmd::cmd_batch(&config, &file, cli.format).await?;
        }
    }

    Ok(())
}
