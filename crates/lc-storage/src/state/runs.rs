// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run event handlers.

use lc_core::{Event, Run};

use super::MaterializedState;

pub(crate) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::RunCreated { owner_id, schedule_id, id, run_date, total_jobs, at_ms } => {
            if !state.runs.contains_key(id) {
                let mut run = Run::new(owner_id.clone(), schedule_id.clone(), *run_date, *at_ms);
                run.id = id.clone();
                run.total_jobs = *total_jobs;
                state.runs.insert(id.clone(), run);
                state
                    .runs_by_schedule_date
                    .entry((schedule_id.clone(), *run_date))
                    .or_insert_with(|| id.clone());
            }
        }

        Event::RunPromoted { id, total_jobs, at_ms } => {
            if let Some(run) = state.runs.get_mut(id) {
                if run.can_promote() {
                    run.promote(*total_jobs, *at_ms);
                }
            }
        }

        Event::RunStatusSet { id, status, at_ms } => {
            if let Some(run) = state.runs.get_mut(id) {
                run.status = *status;
                if status.is_terminal() {
                    run.finished_at_ms = Some(*at_ms);
                }
            }
        }

        Event::RunBlocked { id, code, reason, at_ms } => {
            if let Some(run) = state.runs.get_mut(id) {
                run.block(*code, reason.clone(), *at_ms);
            }
        }

        Event::RunTotalsUpdated { id, completed_jobs, failed_jobs, skipped_jobs, at_ms } => {
            if let Some(run) = state.runs.get_mut(id) {
                run.completed_jobs = *completed_jobs;
                run.failed_jobs = *failed_jobs;
                run.skipped_jobs = *skipped_jobs;
                run.recompute_status(*at_ms);
            }
        }

        _ => {}
    }
}
