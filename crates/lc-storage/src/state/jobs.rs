// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job and job-log event handlers.

use lc_core::{Event, Job};

use super::MaterializedState;

pub(crate) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::JobCreated {
            owner_id,
            run_id,
            schedule_id,
            id,
            job_type,
            job_key,
            run_mode,
            max_attempts,
            sequence_number,
            at_ms,
        } => {
            if state.jobs.contains_key(id) {
                return;
            }
            let job = Job::new(
                owner_id.clone(),
                run_id.clone(),
                schedule_id.clone(),
                *job_type,
                job_key.clone(),
                *run_mode,
                *max_attempts,
                *sequence_number,
                *at_ms,
            );
            let mut job = job;
            job.id = id.clone();
            state.jobs.insert(id.clone(), job);
            state.jobs_by_schedule.entry(schedule_id.clone()).or_default().push(id.clone());
            state.job_keys.entry(job_key.clone()).or_insert_with(|| id.clone());
        }

        Event::JobSessionAssigned { id, session_id } => {
            if let Some(job) = state.jobs.get_mut(id) {
                job.session_id = Some(session_id.clone());
            }
        }

        Event::JobRenderedPayloadSet { id, subject, body } => {
            if let Some(job) = state.jobs.get_mut(id) {
                job.rendered_subject = Some(subject.clone());
                job.rendered_body = Some(body.clone());
            }
        }

        Event::JobStarted { id, at_ms } => {
            if let Some(job) = state.jobs.get_mut(id) {
                job.start(*at_ms);
            }
        }

        Event::JobCompleted { id, at_ms } => {
            if let Some(job) = state.jobs.get_mut(id) {
                job.complete(*at_ms);
            }
        }

        Event::JobFailed { id, code, message, at_ms } => {
            if let Some(job) = state.jobs.get_mut(id) {
                job.fail(code.clone(), message.clone(), *at_ms);
            }
        }

        Event::JobStatusForced { id, status, at_ms } => {
            if let Some(job) = state.jobs.get_mut(id) {
                job.status = *status;
                job.updated_at_ms = *at_ms;
                if status.is_terminal() {
                    job.completed_at_ms = Some(*at_ms);
                }
            }
        }

        Event::JobLogAppended(log) => {
            state.job_logs.entry(log.job_id.clone()).or_default().push((**log).clone());
        }

        Event::JobsDeleted { ids, .. } => {
            for id in ids {
                let Some(job) = state.jobs.remove(id) else { continue };
                state.job_logs.remove(id);
                state.job_keys.remove(&job.job_key);
                if let Some(siblings) = state.jobs_by_schedule.get_mut(&job.schedule_id) {
                    siblings.retain(|j| j != id);
                }
            }
        }

        _ => {}
    }
}
