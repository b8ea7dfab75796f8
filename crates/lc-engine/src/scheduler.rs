// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JIT Scheduler Loop: one tick selects every due schedule and emits at
//! most one job each. Implemented as a pure function over an immutable
//! [`MaterializedState`] snapshot — the tick body never yields, so there is
//! no intra-tick race to defend against; cross-replica contention (two
//! processes racing the same schedule) is out of scope for this
//! single-process engine (recorded in DESIGN.md).

use crate::admin_gate::{self, AutoSuspendDecision};
use crate::aggregator;
use chrono::{DateTime, Utc};
use lc_core::schedule::{daily_reset, next_post_at};
use lc_core::{AdminStatus, Event, JobType, RunMode, Schedule};
use lc_storage::MaterializedState;
use std::collections::HashMap;
use tracing::{info, info_span};

const CONSECUTIVE_FAILURES_FOR_DEBUG_MODE: u32 = 3;

/// Run one tick, returning every event produced. The caller (the engine) is
/// responsible for applying them to `MaterializedState`, persisting them to
/// the WAL, and enqueuing any `JobCreated` onto the broker.
pub fn tick(state: &MaterializedState, now: DateTime<Utc>) -> Vec<Event> {
    let span = info_span!("scheduler_tick", tick_ms = now.timestamp_millis());
    let _enter = span.enter();

    let mut events = Vec::new();
    let now_ms = now.timestamp_millis() as u64;

    for schedule in state.schedules.values() {
        events.extend(tick_one_schedule(state, schedule, now, now_ms));
    }

    events.extend(aggregator::sweep_stuck_runs(state, now_ms));
    events
}

fn tick_one_schedule(
    state: &MaterializedState,
    schedule: &Schedule,
    now: DateTime<Utc>,
    now_ms: u64,
) -> Vec<Event> {
    let mut events = Vec::new();

    // Step 1: daily reset / migration. Applies to every schedule so a
    // blocked (unapproved/disabled) schedule still gets a fresh nextPostAt
    // to drive step 4's block recording — see S4 in the testable-scenarios
    // section.
    let (today_posted_count, last_run_date, next_post_at_ms) = daily_reset(schedule, now);
    if (today_posted_count, last_run_date, next_post_at_ms)
        != (schedule.today_posted_count, schedule.last_run_date, schedule.next_post_at_ms)
    {
        events.push(Event::ScheduleDailyReset {
            id: schedule.id,
            today_posted_count,
            last_run_date,
            next_post_at_ms,
        });
    }

    // Step 2: candidate selection.
    let due = next_post_at_ms.is_some_and(|t| t <= now_ms);
    if !due || today_posted_count >= schedule.daily_post_count {
        return events;
    }

    // Step 3: executability gate.
    let executability = admin_gate::executability(schedule);

    if !executability.can_execute {
        events.extend(handle_blocked(state, schedule, now, now_ms));
        return events;
    }

    events.extend(emit_job(state, schedule, today_posted_count, now, now_ms));
    events
}

fn handle_blocked(
    state: &MaterializedState,
    schedule: &Schedule,
    now: DateTime<Utc>,
    now_ms: u64,
) -> Vec<Event> {
    let mut events = Vec::new();
    let code = admin_gate::block_code_for(schedule);
    let reason = format!("schedule not executable: {code}");

    let (_run_id, block_events) = aggregator::record_block(
        state,
        &schedule.owner_id,
        &schedule.id,
        now.date_naive(),
        code,
        reason,
        now_ms,
    );
    events.extend(block_events);

    // Avoid busy-looping the block.
    let next = now + chrono::Duration::minutes(i64::from(schedule.post_interval_minutes));
    events.push(Event::ScheduleAdvanced {
        id: schedule.id,
        today_posted_count: schedule.today_posted_count,
        next_post_at_ms: Some(next.timestamp_millis() as u64),
    });

    if code.counts_toward_auto_suspend() {
        let consecutive_failures = schedule.consecutive_failures + 1;
        events.push(Event::ScheduleFailureRecorded { id: schedule.id, consecutive_failures });

        let AutoSuspendDecision { should_suspend, reason } =
            admin_gate::auto_suspend_decision(schedule, consecutive_failures);
        if should_suspend {
            info!(%schedule.id, consecutive_failures, "auto-suspending schedule");
            events.push(Event::ScheduleAdminStatusSet {
                id: schedule.id,
                status: AdminStatus::Suspended,
                reason: Some(reason.to_string()),
                at_ms: now_ms,
            });
        }
    }

    events
}

fn emit_job(
    state: &MaterializedState,
    schedule: &Schedule,
    observed_today_posted_count: u32,
    now: DateTime<Utc>,
    now_ms: u64,
) -> Vec<Event> {
    let mut events = Vec::new();

    // Step 5.1/5.2: the conditional-update emulation. Single-process, so
    // "winning the race" just means we're the only caller.
    let sequence_number = observed_today_posted_count + 1;
    let today_run_time = schedule.today_run_time(now);
    let next = next_post_at(sequence_number, schedule.daily_post_count, schedule.post_interval_minutes, today_run_time, now);

    events.push(Event::ScheduleAdvanced {
        id: schedule.id,
        today_posted_count: sequence_number,
        next_post_at_ms: Some(next.timestamp_millis() as u64),
    });

    // Step 5.4: findOrCreateRun, totalJobs on first creation.
    let run_date = now.date_naive();
    let (run_id, run_events) = aggregator::find_or_create_run(
        state,
        &schedule.owner_id,
        &schedule.id,
        run_date,
        schedule.daily_post_count,
        now_ms,
    );
    events.extend(run_events);

    // Step 5.5: render the payload.
    let template = state.templates.get(&schedule.template_id);
    let fixed_fields = template.map(|t| t.fixed_fields.clone()).unwrap_or_default();
    let (subject_pattern, body_pattern) = template
        .map(|t| (t.subject_pattern.as_str(), t.body_pattern.as_str()))
        .unwrap_or(("", ""));
    let subject = lc_core::render::render(subject_pattern, now, &extra_vars(schedule, &fixed_fields));
    let body = lc_core::render::render(body_pattern, now, &extra_vars(schedule, &fixed_fields));

    // Step 5.6: createJob.
    let job_key = lc_core::Run::job_key_for(&run_id, sequence_number);
    let run_mode = if schedule.consecutive_failures >= CONSECUTIVE_FAILURES_FOR_DEBUG_MODE {
        RunMode::Debug
    } else {
        RunMode::Headless
    };
    let max_attempts = lc_queue::RetryPolicy::for_job_type(JobType::CreatePost).max_attempts;
    let job_id = lc_core::JobId::new();

    info!(%schedule.id, %run_id, sequence_number, "emitting job");

    events.push(Event::JobCreated {
        owner_id: schedule.owner_id,
        run_id,
        schedule_id: schedule.id,
        id: job_id,
        job_type: JobType::CreatePost,
        job_key,
        run_mode,
        max_attempts,
        sequence_number: Some(sequence_number),
        at_ms: now_ms,
    });
    events.push(Event::JobRenderedPayloadSet { id: job_id, subject, body });

    // Step 5.7: attach whatever session this credential currently has so
    // the worker can dispatch without a blind re-login. There's at most
    // one non-terminal session per credential, so the first match is it.
    if let Some(session) = state.sessions_for_credential(&schedule.credential_id).first() {
        events.push(Event::JobSessionAssigned { id: job_id, session_id: session.id });
    }

    events
}

fn extra_vars(_schedule: &Schedule, fixed_fields: &HashMap<String, String>) -> HashMap<String, String> {
    fixed_fields.clone()
}
