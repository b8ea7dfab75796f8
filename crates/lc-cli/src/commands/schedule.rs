// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `lc schedule` - list, inspect, enable/disable, and force-run schedules.

use crate::output::{format_time_ago, handle_list, format_or_json, OutputFormat};
use anyhow::{bail, Result};
use lc_core::{Clock, Event, ScheduleId};
use lc_engine::Engine;
use lc_wire::ScheduleSummary;
use clap::{Args, Subcommand};

#[derive(Subcommand)]
pub enum ScheduleCommand {
    /// List schedules.
    Ls(LsArgs),
    /// Show one schedule in full.
    Show { id: String },
    /// Enable or disable the user-facing switch on a schedule.
    Toggle { id: String, #[arg(value_enum)] state: ToggleState },
    /// Force the schedule's next post to be due immediately.
    RunNow { id: String },
}

#[derive(Args)]
pub struct LsArgs {
    /// Only schedules owned by this tenant.
    #[arg(long)]
    owner: Option<String>,
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum ToggleState {
    On,
    Off,
}

pub async fn handle<C: Clock>(command: ScheduleCommand, engine: &Engine<C>, format: OutputFormat) -> Result<()> {
    match command {
        ScheduleCommand::Ls(args) => ls(engine, args, format),
        ScheduleCommand::Show { id } => show(engine, &id, format),
        ScheduleCommand::Toggle { id, state } => toggle(engine, &id, state, format).await,
        ScheduleCommand::RunNow { id } => run_now(engine, &id, format).await,
    }
}

fn ls<C: Clock>(engine: &Engine<C>, args: LsArgs, format: OutputFormat) -> Result<()> {
    let state = engine.state();
    let mut schedules: Vec<_> = match &args.owner {
        Some(owner) => {
            let owner_id: lc_core::TenantId = owner.as_str().into();
            state.schedules_for_owner(&owner_id)
        }
        None => state.schedules.values().collect(),
    };
    schedules.sort_by_key(|s| s.name.clone());
    let summaries: Vec<ScheduleSummary> = schedules.iter().map(|s| ScheduleSummary::from(*s)).collect();

    handle_list(format, &summaries, "No schedules", |rows| {
        let name_width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0).max("NAME".len());
        println!("{:<name_width$}  KIND     ADMIN         ENABLED  NEXT POST", "NAME");
        for r in rows {
            println!(
                "{:<name_width$}  {:<7}  {:<12}  {:<7}  {}",
                r.name,
                r.schedule_kind,
                r.admin_status,
                r.user_enabled,
                format_time_ago(r.next_post_at_ms)
            );
        }
    })
}

fn show<C: Clock>(engine: &Engine<C>, id: &str, format: OutputFormat) -> Result<()> {
    let state = engine.state();
    let schedule_id: ScheduleId = id.into();
    let Some(schedule) = state.schedules.get(&schedule_id) else {
        bail!("schedule {id} not found");
    };
    let summary = ScheduleSummary::from(schedule);
    format_or_json(format, &summary, || {
        println!("{:#?}", summary);
    })
}

async fn toggle<C: Clock>(engine: &Engine<C>, id: &str, state: ToggleState, format: OutputFormat) -> Result<()> {
    let schedule_id: ScheduleId = id.into();
    if engine.state().schedules.get(&schedule_id).is_none() {
        bail!("schedule {id} not found");
    }
    let enabled = matches!(state, ToggleState::On);
    engine.apply(Event::ScheduleUserEnabledSet { id: schedule_id, enabled });
    engine.checkpoint()?;
    show(engine, id, format)
}

async fn run_now<C: Clock>(engine: &Engine<C>, id: &str, format: OutputFormat) -> Result<()> {
    let schedule_id: ScheduleId = id.into();
    engine.run_schedule_now(schedule_id).await?;
    engine.checkpoint()?;
    show(engine, id, format)
}
