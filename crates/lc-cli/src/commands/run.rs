// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lc run` - list and inspect per-schedule, per-day runs.

use crate::output::{format_or_json, format_time_ago, handle_list, OutputFormat};
use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use lc_core::{Clock, RunId, RunStatus, ScheduleId};
use lc_engine::Engine;
use lc_wire::{ActiveRunEntry, ActiveRunsSnapshot, RunSummary, FLASH_PERSISTENCE_MS};

#[derive(Subcommand)]
pub enum RunCommand {
    /// List runs, optionally scoped to one schedule.
    Ls(LsArgs),
    /// Only the currently in-flight runs, plus queue depth/throughput.
    Active,
    /// Show one run in full.
    Show { id: String },
}

#[derive(Args)]
pub struct LsArgs {
    #[arg(long)]
    schedule: Option<String>,
}

pub async fn handle<C: Clock>(command: RunCommand, engine: &Engine<C>, format: OutputFormat) -> Result<()> {
    match command {
        RunCommand::Ls(args) => ls(engine, args, format),
        RunCommand::Active => active(engine, format).await,
        RunCommand::Show { id } => show(engine, &id, format),
    }
}

fn ls<C: Clock>(engine: &Engine<C>, args: LsArgs, format: OutputFormat) -> Result<()> {
    let state = engine.state();
    let mut runs: Vec<_> = state.runs.values().collect();
    if let Some(schedule) = &args.schedule {
        let schedule_id: ScheduleId = schedule.as_str().into();
        runs.retain(|r| r.schedule_id == schedule_id);
    }
    runs.sort_by_key(|r| r.run_date);
    let summaries: Vec<RunSummary> = runs.iter().map(|r| RunSummary::from(*r)).collect();

    handle_list(format, &summaries, "No runs", |rows| {
        println!("{:<24}  DATE        STATUS      DONE/TOTAL  BLOCK", "RUN ID");
        for r in rows {
            println!(
                "{:<24}  {}  {:<10}  {}/{}        {}",
                r.id,
                r.run_date,
                r.status,
                r.completed_jobs + r.failed_jobs + r.skipped_jobs,
                r.total_jobs,
                r.block_code.as_deref().unwrap_or("-")
            );
        }
    })
}

async fn active<C: Clock>(engine: &Engine<C>, format: OutputFormat) -> Result<()> {
    let state = engine.state();
    let now_ms = engine.now_ms();

    let mut runs: Vec<_> = state
        .runs
        .values()
        .filter(|r| {
            matches!(r.status, RunStatus::Running | RunStatus::Queued)
                || (matches!(r.status, RunStatus::Completed | RunStatus::Failed)
                    && r.finished_at_ms.is_some_and(|t| now_ms.saturating_sub(t) <= FLASH_PERSISTENCE_MS))
        })
        .collect();
    runs.sort_by_key(|r| r.triggered_at_ms);

    let entries: Vec<ActiveRunEntry> = runs
        .into_iter()
        .map(|run| {
            let jobs = state.jobs_for_schedule(&run.schedule_id);
            let jobs: Vec<_> = jobs.into_iter().filter(|j| j.run_id == run.id).collect();
            ActiveRunEntry::new(RunSummary::from(run), &jobs)
        })
        .collect();

    // A one-shot CLI process has no live broker to introspect (there's no
    // IPC to the running `lc daemon run` process in this workspace), so
    // queue depth is derived from durable job status counts instead.
    let queue = crate::commands::queue::stats_from_state(&state, now_ms);
    let snapshot = ActiveRunsSnapshot::new(entries, queue);
    format_or_json(format, &snapshot, || {
        println!("{} active run(s)", snapshot.runs.len());
        for e in &snapshot.runs {
            let r = &e.run;
            println!("  {}  {}  {}/{}", r.id, r.status, r.completed_jobs + r.failed_jobs + r.skipped_jobs, r.total_jobs);
            for j in &e.recent_jobs {
                println!("      seq={:?}  {}  {}", j.sequence_number, j.outcome, j.error_code.as_deref().unwrap_or("-"));
            }
        }
        println!(
            "queue: waiting={} delayed={} active={} completions/min={}",
            snapshot.queue_waiting, snapshot.queue_delayed, snapshot.queue_active, snapshot.completions_per_min
        );
    })
}

fn show<C: Clock>(engine: &Engine<C>, id: &str, format: OutputFormat) -> Result<()> {
    let state = engine.state();
    let run_id: RunId = id.into();
    let Some(run) = state.runs.get(&run_id) else {
        bail!("run {id} not found");
    };
    let summary = RunSummary::from(run);
    format_or_json(format, &summary, || println!("{:#?}", summary))
}
