// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lc daemon run` - the one long-running subcommand. Everything else opens
//! the engine, does one thing, checkpoints, and exits.

use anyhow::Result;
use clap::Subcommand;
use lc_engine::DaemonConfig;
use tracing::info;

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the scheduler tick, stuck-run sweep, and worker pool. Runs
    /// until Ctrl-C.
    Run,
}

pub async fn handle(command: DaemonCommand, config: DaemonConfig) -> Result<()> {
    match command {
        DaemonCommand::Run => run(config).await,
    }
}

async fn run(config: DaemonConfig) -> Result<()> {
    let engine = crate::build_engine(config)?;
    engine.reconcile_stale_jobs().await;
    let checkpoint_engine = engine.clone();
    let handles = engine.spawn();

    info!("daemon started");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    handles.abort_all();
    checkpoint_engine.checkpoint()?;
    Ok(())
}
