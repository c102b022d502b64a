// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tracekit CLI
//!
//! Command-line host for Tracekit: runs the exposure-notification core
//! against a simulated radio and file-based diagnosis key exports.

mod commands;
mod config;
mod display;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::EnvFilter;

use config::CliConfig;

#[derive(Parser)]
#[command(name = "tracekit")]
#[command(version, about = "Decentralized exposure notification")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Data directory (default: platform data dir)
    #[arg(long, global = true, env = "TRACEKIT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Hex public key of a health authority whose signed keys are accepted
    #[arg(
        long = "authority",
        global = true,
        env = "TRACEKIT_AUTHORITIES",
        value_delimiter = ','
    )]
    authorities: Vec<String>,

    /// Answer yes to every prompt
    #[arg(short, long, global = true)]
    yes: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Trace against simulated nearby devices
    Run {
        /// Number of simulated peers
        #[arg(long, default_value = "3")]
        peers: usize,

        /// How long to run
        #[arg(long, default_value = "10")]
        minutes: u64,

        /// Diagnosis key export to check before stopping
        #[arg(long, env = "TRACEKIT_FEED")]
        feed: Option<PathBuf>,
    },

    /// Show stored data and consent
    Status,

    /// Manage your daily keys
    #[command(subcommand)]
    Keys(KeyCommands),

    /// Check a diagnosis key export for exposures
    Provide {
        /// Export file written by 'tracekit keys share'
        feed: PathBuf,
    },

    /// Inspect exposure records
    #[command(subcommand)]
    Exposures(ExposureCommands),

    /// Delete all tracing data
    Uninstall,

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum KeyCommands {
    /// List stored daily keys
    List,

    /// Share past daily keys as a diagnosis key export
    Share {
        /// Output file path
        output: PathBuf,

        /// Transmission risk level assigned to the keys (0-7)
        #[arg(long, default_value = "4", value_parser = clap::value_parser!(u8).range(0..=7))]
        risk_level: u8,

        /// Hex seed of the authority signing key
        #[arg(long, env = "TRACEKIT_AUTHORITY_SEED", hide_env_values = true)]
        sign_seed: Option<String>,
    },
}

#[derive(Subcommand)]
enum ExposureCommands {
    /// List possible exposures
    List,

    /// Delete all exposure records
    Clear,

    /// Show or replace the risk scoring configuration
    Config {
        /// JSON file with a new configuration
        #[arg(long)]
        set: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tracekit=info")),
        )
        .init();

    if let Err(err) = run(Cli::parse()).await {
        display::error(&format!("{:#}", err));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Resolve data directory
    let data_dir = cli.data_dir.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tracekit")
    });

    let config = CliConfig::new(data_dir, &cli.authorities, cli.yes)?;

    match cli.command {
        Commands::Run {
            peers,
            minutes,
            feed,
        } => commands::run::run(&config, peers, minutes, feed).await?,
        Commands::Status => commands::status::show(&config)?,
        Commands::Keys(cmd) => match cmd {
            KeyCommands::List => commands::keys::list(&config)?,
            KeyCommands::Share {
                output,
                risk_level,
                sign_seed,
            } => {
                commands::keys::share(&config, &output, risk_level, sign_seed.as_deref()).await?;
            }
        },
        Commands::Provide { feed } => commands::provide::run(&config, &feed).await?,
        Commands::Exposures(cmd) => match cmd {
            ExposureCommands::List => commands::exposures::list(&config).await?,
            ExposureCommands::Clear => commands::exposures::clear(&config)?,
            ExposureCommands::Config { set } => {
                commands::exposures::configuration(&config, set.as_deref())?;
            }
        },
        Commands::Uninstall => commands::uninstall::run(&config).await?,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "tracekit", &mut io::stdout());
        }
    }

    Ok(())
}
