// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lc` — a thin operator CLI over the scheduling engine. Every subcommand
//! except `lc daemon run` opens the engine against the durable WAL/snapshot
//! on disk, performs one read or mutation, checkpoints, and exits; only
//! `daemon run` keeps the engine (and its job queue) alive across calls.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lc_adapters::{CredentialCipher, FixedKeyCipher, MockDriver, TargetSiteDriver};
use lc_core::SystemClock;
use lc_engine::{DaemonConfig, Engine};
use lc_queue::{Broker, InMemoryBroker};
use output::OutputFormat;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "lc", version, about = "Scheduled posting automation operator CLI")]
struct Cli {
    /// Path to a TOML config file; defaults to `<base-dir>/lc-engine.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format for read commands.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon loop: scheduler tick, stuck-run sweep, worker pool.
    Daemon {
        #[command(subcommand)]
        command: commands::daemon::DaemonCommand,
    },
    /// Schedule inspection and control.
    Schedule {
        #[command(subcommand)]
        command: commands::schedule::ScheduleCommand,
    },
    /// Credential registration and removal.
    Credential {
        #[command(subcommand)]
        command: commands::credential::CredentialCommand,
    },
    /// Job inspection and control.
    Job {
        #[command(subcommand)]
        command: commands::job::JobCommand,
    },
    /// Run inspection.
    Run {
        #[command(subcommand)]
        command: commands::run::RunCommand,
    },
    /// Session inspection and recovery.
    Session {
        #[command(subcommand)]
        command: commands::session::SessionCommand,
    },
    /// Queue introspection.
    Queue {
        #[command(subcommand)]
        command: commands::queue::QueueCommand,
    },
}

/// Build an engine against the XOR placeholder cipher and the mock
/// target-site driver. A real deployment supplies its own `CredentialCipher`
/// and `TargetSiteDriver`; neither ships from this workspace (see
/// `lc-adapters`).
pub(crate) fn build_engine(config: DaemonConfig) -> Result<Engine<SystemClock>> {
    let key = std::env::var("LC_CIPHER_KEY").unwrap_or_else(|_| "insecure-dev-only-key".to_string());
    let cipher: Arc<dyn CredentialCipher> = Arc::new(FixedKeyCipher::new(key.into_bytes()));
    let driver: Arc<dyn TargetSiteDriver> = Arc::new(MockDriver::new());
    let broker: Arc<dyn Broker<lc_core::JobId>> = Arc::new(InMemoryBroker::new());
    Ok(Engine::open(config, broker, driver, cipher, SystemClock)?)
}

fn load_config(path: Option<PathBuf>) -> Result<DaemonConfig> {
    match path {
        Some(path) => Ok(DaemonConfig::load(&path)?),
        None => {
            let default = DaemonConfig::default();
            let inferred = default.base_dir.join("lc-engine.toml");
            Ok(DaemonConfig::load(&inferred)?)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Daemon { command } => commands::daemon::handle(command, config).await,
        Commands::Schedule { command } => {
            let engine = build_engine(config)?;
            commands::schedule::handle(command, &engine, cli.output).await
        }
        Commands::Credential { command } => {
            let engine = build_engine(config)?;
            commands::credential::handle(command, &engine, cli.output).await
        }
        Commands::Job { command } => {
            let engine = build_engine(config)?;
            commands::job::handle(command, &engine, cli.output).await
        }
        Commands::Run { command } => {
            let engine = build_engine(config)?;
            commands::run::handle(command, &engine, cli.output).await
        }
        Commands::Session { command } => {
            let engine = build_engine(config)?;
            commands::session::handle(command, &engine, cli.output).await
        }
        Commands::Queue { command } => {
            let engine = build_engine(config)?;
            commands::queue::handle(command, &engine, cli.output).await
        }
    }
}
