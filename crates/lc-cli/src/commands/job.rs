// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lc job` - list, inspect, tail logs for, and cancel jobs.

use crate::output::{format_or_json, format_time_ago, handle_list, OutputFormat};
use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use lc_core::{Clock, Event, JobDeleteFilter, JobId, JobStatus, ScheduleId, TenantId};
use lc_engine::Engine;
use lc_wire::{JobDetail, JobLogLine, JobSummary};

#[derive(Subcommand)]
pub enum JobCommand {
    /// List jobs, optionally scoped to one schedule.
    Ls(LsArgs),
    /// Show one job in full, including its rendered payload.
    Show { id: String },
    /// Print the append-only log for one job.
    Logs { id: String },
    /// Cancel a job that hasn't completed yet.
    Rm { id: String },
    /// Bulk-delete terminal jobs for one tenant. Never touches PENDING or
    /// PROCESSING jobs regardless of the selector.
    Delete(DeleteArgs),
}

#[derive(Args)]
pub struct LsArgs {
    #[arg(long)]
    schedule: Option<String>,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Tenant the jobs belong to.
    #[arg(long)]
    owner: String,
    /// Delete exactly these job ids (still filtered to terminal jobs).
    #[arg(long, value_delimiter = ',')]
    ids: Vec<String>,
    /// Delete every terminal job (COMPLETED, FAILED, or CANCELLED).
    #[arg(long, conflicts_with_all = ["ids", "completed", "failed", "older_than_days"])]
    all_terminal: bool,
    /// Delete only COMPLETED jobs.
    #[arg(long, conflicts_with_all = ["ids", "all_terminal", "failed", "older_than_days"])]
    completed: bool,
    /// Delete only FAILED jobs.
    #[arg(long, conflicts_with_all = ["ids", "all_terminal", "completed", "older_than_days"])]
    failed: bool,
    /// Delete terminal jobs created more than this many days ago.
    #[arg(long, conflicts_with_all = ["ids", "all_terminal", "completed", "failed"])]
    older_than_days: Option<u32>,
}

pub async fn handle<C: Clock>(command: JobCommand, engine: &Engine<C>, format: OutputFormat) -> Result<()> {
    match command {
        JobCommand::Ls(args) => ls(engine, args, format),
        JobCommand::Show { id } => show(engine, &id, format),
        JobCommand::Logs { id } => logs(engine, &id, format),
        JobCommand::Rm { id } => rm(engine, &id, format).await,
        JobCommand::Delete(args) => delete(engine, args),
    }
}

fn ls<C: Clock>(engine: &Engine<C>, args: LsArgs, format: OutputFormat) -> Result<()> {
    let state = engine.state();
    let mut jobs: Vec<_> = match &args.schedule {
        Some(schedule) => {
            let schedule_id: ScheduleId = schedule.as_str().into();
            state.jobs_for_schedule(&schedule_id)
        }
        None => state.jobs.values().collect(),
    };
    jobs.sort_by_key(|j| j.created_at_ms);
    let summaries: Vec<JobSummary> = jobs.iter().map(|j| JobSummary::from(*j)).collect();

    handle_list(format, &summaries, "No jobs", |rows| {
        println!("{:<24}  TYPE          STATUS      ATTEMPT  CREATED", "JOB ID");
        for r in rows {
            println!(
                "{:<24}  {:<12}  {:<10}  {}/{}      {}",
                r.id,
                r.job_type,
                r.status,
                r.attempt,
                r.max_attempts,
                format_time_ago(Some(r.created_at_ms))
            );
        }
    })
}

fn show<C: Clock>(engine: &Engine<C>, id: &str, format: OutputFormat) -> Result<()> {
    let state = engine.state();
    let job_id: JobId = id.into();
    let Some(job) = state.jobs.get(&job_id) else {
        bail!("job {id} not found");
    };
    let detail = JobDetail::from(job);
    format_or_json(format, &detail, || println!("{:#?}", detail))
}

fn logs<C: Clock>(engine: &Engine<C>, id: &str, format: OutputFormat) -> Result<()> {
    let state = engine.state();
    let job_id: JobId = id.into();
    let lines: Vec<JobLogLine> = state.job_logs_for(&job_id).iter().map(JobLogLine::from).collect();

    handle_list(format, &lines, "No log entries", |rows| {
        for r in rows {
            println!("[{}] {} {}", format_time_ago(Some(r.at_ms)), r.level, r.message);
        }
    })
}

async fn rm<C: Clock>(engine: &Engine<C>, id: &str, format: OutputFormat) -> Result<()> {
    let job_id: JobId = id.into();
    let Some(job) = engine.state().jobs.get(&job_id).cloned() else {
        bail!("job {id} not found");
    };
    if job.status.is_terminal() {
        bail!("job {id} is already {}", job.status);
    }

    engine.apply(Event::JobStatusForced { id: job_id, status: JobStatus::Cancelled, at_ms: engine.now_ms() });
    engine.checkpoint()?;
    show(engine, id, format)
}

fn delete<C: Clock>(engine: &Engine<C>, args: DeleteArgs) -> Result<()> {
    let owner_id: TenantId = args.owner.as_str().into();
    let state = engine.state();

    let ids = if !args.ids.is_empty() {
        let requested: Vec<JobId> = args.ids.iter().map(|id| id.as_str().into()).collect();
        state.jobs_matching_ids(&owner_id, &requested)
    } else if args.all_terminal {
        state.jobs_matching_filter(&owner_id, JobDeleteFilter::AllTerminal)
    } else if args.completed {
        state.jobs_matching_filter(&owner_id, JobDeleteFilter::Completed)
    } else if args.failed {
        state.jobs_matching_filter(&owner_id, JobDeleteFilter::Failed)
    } else if let Some(days) = args.older_than_days {
        let before_ms = engine.now_ms().saturating_sub(u64::from(days) * 24 * 60 * 60 * 1000);
        state.jobs_matching_filter(&owner_id, JobDeleteFilter::OlderThan { before_ms })
    } else {
        bail!("specify --ids, --all-terminal, --completed, --failed, or --older-than-days");
    };

    let count = ids.len();
    engine.apply(Event::JobsDeleted { owner_id, ids });
    engine.checkpoint()?;
    println!("deleted {count} job(s)");
    Ok(())
}
