//! `lifeline` command-line tool.
//!
//! - `lifeline validate <FILE>`: load and validate a config file
//! - `lifeline simulate [--config FILE] <EVENTS>`: replay a success/failure
//!   sequence through a degradation tracker

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use lifeline_core::LifelineConfig;

mod simulate;

#[derive(Parser)]
#[command(name = "lifeline", version, about = "Fallback and graceful-degradation toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a config file, validate it and print the effective settings
    Validate {
        /// Path to a YAML or JSON config file
        file: PathBuf,

        #[arg(long, value_enum, default_value_t = ConfigFormat::Yaml)]
        format: ConfigFormat,
    },

    /// Replay events through a degradation tracker
    Simulate {
        /// Events: `s` for success, `f` for failure (e.g. "ffsfss")
        events: String,

        /// Config file providing thresholds (defaults apply when absent)
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
}

/// Output format for simulation steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Yaml,
    Json,
}

/// Output format for a validated config, which has no table form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ConfigFormat {
    Yaml,
    Json,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Validate { file, format } => validate(&file, format),
        Command::Simulate {
            events,
            config,
            format,
        } => run_simulation(&events, config.as_deref(), format),
    }
}

fn load_config(path: &std::path::Path) -> Result<LifelineConfig> {
    LifelineConfig::from_file(path)
        .with_context(|| format!("failed to load config from {}", path.display()))
}

fn validate(file: &std::path::Path, format: ConfigFormat) -> Result<()> {
    let config = load_config(file)?;
    tracing::info!(path = %file.display(), "Config is valid");

    match format {
        ConfigFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        ConfigFormat::Yaml => print!("{}", serde_yaml::to_string(&config)?),
    }
    Ok(())
}

fn run_simulation(events: &str, config: Option<&std::path::Path>, format: Format) -> Result<()> {
    let degradation = match config {
        Some(path) => load_config(path)?.degradation,
        None => LifelineConfig::default().degradation,
    };

    let events = simulate::parse_events(events)?;
    let steps = simulate::run(degradation, &events)?;

    match format {
        Format::Table => print!("{}", simulate::render_table(&steps)),
        Format::Json => println!("{}", serde_json::to_string_pretty(&steps)?),
        Format::Yaml => print!("{}", serde_yaml::to_string(&steps)?),
    }
    Ok(())
}
