// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lc queue stats` - queue depth and throughput.
//!
//! A one-shot CLI invocation never shares a process with the running
//! `lc daemon run` broker (no IPC between processes in this workspace), so
//! stats are derived from durable job status counts rather than a live
//! `Broker::introspect`. Pause/resume are daemon-process operations and are
//! not exposed here.

use crate::output::{format_or_json, OutputFormat};
use anyhow::Result;
use clap::Subcommand;
use lc_core::{Clock, JobStatus};
use lc_engine::Engine;
use lc_queue::QueueStats;
use lc_storage::MaterializedState;
use std::time::Duration;

#[derive(Subcommand)]
pub enum QueueCommand {
    /// Counts per job status plus recent completion throughput.
    Stats,
}

pub async fn handle<C: Clock>(command: QueueCommand, engine: &Engine<C>, format: OutputFormat) -> Result<()> {
    match command {
        QueueCommand::Stats => stats(engine, format),
    }
}

fn stats<C: Clock>(engine: &Engine<C>, format: OutputFormat) -> Result<()> {
    let state = engine.state();
    let queue = stats_from_state(&state, engine.now_ms());
    format_or_json(format, &queue, || {
        println!(
            "waiting={} active={} completed={} failed={} completions/min={}",
            queue.waiting, queue.active, queue.completed, queue.failed, queue.completions_per_min
        );
    })
}

pub(crate) fn stats_from_state(state: &MaterializedState, now_ms: u64) -> QueueStats {
    let one_minute_ago = now_ms.saturating_sub(Duration::from_secs(60).as_millis() as u64);
    let mut stats = QueueStats::default();
    for job in state.jobs.values() {
        match job.status {
            JobStatus::Pending => stats.waiting += 1,
            JobStatus::Processing => stats.active += 1,
            JobStatus::Completed => {
                stats.completed += 1;
                if job.completed_at_ms.is_some_and(|t| t >= one_minute_ago) {
                    stats.completions_per_min += 1;
                }
            }
            JobStatus::Failed => stats.failed += 1,
            JobStatus::Cancelled => {}
        }
    }
    stats
}
