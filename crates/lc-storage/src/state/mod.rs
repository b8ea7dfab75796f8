// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state built by replaying the event log.

mod credentials;
mod jobs;
mod runs;
mod schedules;
mod sessions;
mod templates;

use lc_core::{
    Credential, CredentialId, Event, Job, JobId, JobLog, Run, RunId, Schedule, ScheduleId, Session,
    SessionId, Template, TemplateId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The full in-memory view derived from the event log. Cheap to rebuild:
/// load the last snapshot, then fold every subsequent WAL entry through
/// [`MaterializedState::apply_event`].
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MaterializedState {
    pub credentials: HashMap<CredentialId, Credential>,
    pub sessions: HashMap<SessionId, Session>,
    pub templates: HashMap<TemplateId, Template>,
    pub schedules: HashMap<ScheduleId, Schedule>,
    pub runs: HashMap<RunId, Run>,
    pub jobs: HashMap<JobId, Job>,
    #[serde(default)]
    pub job_logs: HashMap<JobId, Vec<JobLog>>,
    /// Secondary index: schedule -> job ids, newest last. Lets the job
    /// store answer "jobs for schedule X" without a full scan.
    #[serde(default)]
    pub jobs_by_schedule: HashMap<ScheduleId, Vec<JobId>>,
    /// Dedup guard: job_key -> job id, so a schedule can never double-emit
    /// the same (run, sequence) pair even across a crash/replay.
    #[serde(default)]
    pub job_keys: HashMap<String, JobId>,
    /// Upsert key for `findOrCreateRun`: one run per (schedule, calendar day).
    #[serde(default)]
    pub runs_by_schedule_date: HashMap<(ScheduleId, NaiveDate), RunId>,
}

impl MaterializedState {
    /// Apply a single domain event, mutating state in place.
    ///
    /// Handlers must be idempotent: replaying the same event twice (once at
    /// append time for immediate visibility, once during WAL replay) must
    /// leave state identical to applying it once.
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::CredentialRegistered(_)
            | Event::CredentialLoginOutcomeRecorded { .. }
            | Event::CredentialDeleted { .. } => credentials::apply(self, event),

            Event::SessionOpened { .. }
            | Event::SessionTransitioned { .. }
            | Event::SessionErrorMarked { .. }
            | Event::SessionNicknameSet { .. } => sessions::apply(self, event),

            Event::TemplateRegistered(_) => templates::apply(self, event),

            Event::ScheduleCreated(_)
            | Event::ScheduleUserEnabledSet { .. }
            | Event::ScheduleAdminStatusSet { .. }
            | Event::ScheduleDailyReset { .. }
            | Event::ScheduleAdvanced { .. }
            | Event::ScheduleFailureRecorded { .. }
            | Event::ScheduleFailureReset { .. }
            | Event::ScheduleDeleted { .. } => schedules::apply(self, event),

            Event::RunCreated { .. }
            | Event::RunPromoted { .. }
            | Event::RunStatusSet { .. }
            | Event::RunBlocked { .. }
            | Event::RunTotalsUpdated { .. } => runs::apply(self, event),

            Event::JobCreated { .. }
            | Event::JobSessionAssigned { .. }
            | Event::JobRenderedPayloadSet { .. }
            | Event::JobStarted { .. }
            | Event::JobCompleted { .. }
            | Event::JobFailed { .. }
            | Event::JobStatusForced { .. }
            | Event::JobLogAppended(_)
            | Event::JobsDeleted { .. } => jobs::apply(self, event),
        }
    }

    pub fn schedules_for_owner(&self, owner: &lc_core::TenantId) -> Vec<&Schedule> {
        let mut v: Vec<&Schedule> = self.schedules.values().filter(|s| &s.owner_id == owner).collect();
        v.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        v
    }

    pub fn jobs_for_schedule(&self, schedule_id: &ScheduleId) -> Vec<&Job> {
        self.jobs_by_schedule
            .get(schedule_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.jobs.get(id))
            .collect()
    }

    pub fn sessions_for_credential(&self, credential_id: &CredentialId) -> Vec<&Session> {
        self.sessions.values().filter(|s| &s.credential_id == credential_id).collect()
    }

    pub fn job_logs_for(&self, job_id: &JobId) -> &[JobLog] {
        self.job_logs.get(job_id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn run_for_date(&self, schedule_id: &ScheduleId, run_date: NaiveDate) -> Option<&Run> {
        self.runs_by_schedule_date.get(&(schedule_id.clone(), run_date)).and_then(|id| self.runs.get(id))
    }

    /// `deleteJobs(ownerId, {byIds})`: intersect the requested ids with the
    /// owner's terminal jobs. Non-terminal and cross-tenant ids are
    /// silently dropped rather than erroring — the bulk operation is
    /// best-effort over whatever in the set actually qualifies.
    pub fn jobs_matching_ids(&self, owner_id: &lc_core::TenantId, ids: &[JobId]) -> Vec<JobId> {
        ids.iter()
            .filter(|id| self.jobs.get(id).is_some_and(|j| &j.owner_id == owner_id && j.status.is_terminal()))
            .cloned()
            .collect()
    }

    /// `deleteJobs(ownerId, {byFilter})`: every one of the owner's jobs
    /// matching the filter (which already excludes non-terminal jobs).
    pub fn jobs_matching_filter(&self, owner_id: &lc_core::TenantId, filter: lc_core::JobDeleteFilter) -> Vec<JobId> {
        self.jobs
            .values()
            .filter(|j| &j.owner_id == owner_id && filter.matches(j))
            .map(|j| j.id)
            .collect()
    }

    /// Startup reconciliation: `PENDING` jobs older than `stale_after_ms`
    /// whose `jobKey` never made it into the broker (crash between the DB
    /// write and the enqueue call) need to be re-enqueued.
    pub fn stale_pending_jobs(&self, now_ms: u64, stale_after_ms: u64) -> Vec<&Job> {
        self.jobs
            .values()
            .filter(|j| j.status == lc_core::JobStatus::Pending && now_ms.saturating_sub(j.created_at_ms) >= stale_after_ms)
            .collect()
    }

    /// Runs stuck in `RUNNING` with every job accounted for — the worker
    /// crashed between writing the last job's outcome and updating totals.
    pub fn stuck_runs(&self) -> Vec<&Run> {
        self.runs
            .values()
            .filter(|r| r.status == lc_core::RunStatus::Running && r.total_jobs > 0 && r.processed() >= r.total_jobs)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lc_core::{JobDeleteFilter, JobType, RunId, RunMode, TenantId};

    fn job_created(owner_id: TenantId, schedule_id: ScheduleId, job_key: &str, at_ms: u64) -> Event {
        Event::JobCreated {
            owner_id,
            run_id: RunId::new(),
            schedule_id,
            id: JobId::new(),
            job_type: JobType::CreatePost,
            job_key: job_key.to_string(),
            run_mode: RunMode::Headless,
            max_attempts: 3,
            sequence_number: Some(1),
            at_ms,
        }
    }

    #[test]
    fn jobs_matching_filter_excludes_pending_and_other_owners() {
        let mut state = MaterializedState::default();
        let owner = TenantId::new();
        let other_owner = TenantId::new();
        let schedule_id = ScheduleId::new();

        state.apply_event(&job_created(owner, schedule_id, "k1", 0));
        state.apply_event(&job_created(owner, schedule_id, "k2", 0));
        state.apply_event(&job_created(other_owner, schedule_id, "k3", 0));

        let ids: Vec<JobId> = state.jobs.keys().cloned().collect();
        let id_completed = *state.job_keys.get("k1").unwrap();
        state.apply_event(&Event::JobCompleted { id: id_completed, at_ms: 1 });

        let matching = state.jobs_matching_filter(&owner, JobDeleteFilter::Completed);
        assert_eq!(matching, vec![id_completed]);

        let matching_all = state.jobs_matching_filter(&owner, JobDeleteFilter::AllTerminal);
        assert_eq!(matching_all, vec![id_completed]);
        assert!(!ids.is_empty());
    }

    #[test]
    fn jobs_deleted_cascades_to_logs_and_indexes() {
        let mut state = MaterializedState::default();
        let owner = TenantId::new();
        let schedule_id = ScheduleId::new();
        state.apply_event(&job_created(owner, schedule_id, "k1", 0));
        let id = *state.job_keys.get("k1").unwrap();
        state.apply_event(&Event::JobCompleted { id, at_ms: 1 });
        state.apply_event(&Event::JobLogAppended(Box::new(lc_core::JobLog {
            job_id: id,
            level: lc_core::JobLogLevel::Info,
            message: "done".to_string(),
            at_ms: 1,
        })));

        state.apply_event(&Event::JobsDeleted { owner_id: owner, ids: vec![id] });

        assert!(!state.jobs.contains_key(&id));
        assert!(state.job_logs_for(&id).is_empty());
        assert!(!state.job_keys.contains_key("k1"));
        assert!(!state.jobs_by_schedule[&schedule_id].contains(&id));
    }

    #[test]
    fn stale_pending_jobs_honors_the_age_threshold() {
        let mut state = MaterializedState::default();
        let owner = TenantId::new();
        let schedule_id = ScheduleId::new();
        state.apply_event(&job_created(owner, schedule_id, "k1", 0));

        assert!(state.stale_pending_jobs(1_000, 5_000).is_empty());
        assert_eq!(state.stale_pending_jobs(5_000, 5_000).len(), 1);
    }

    #[test]
    fn credential_deleted_removes_it_from_state() {
        let mut state = MaterializedState::default();
        let credential = lc_core::Credential::new(TenantId::new(), "user", vec![1, 2, 3], "display");
        let id = credential.id;
        state.apply_event(&Event::CredentialRegistered(Box::new(credential)));
        assert!(state.credentials.contains_key(&id));

        state.apply_event(&Event::CredentialDeleted { id });
        assert!(!state.credentials.contains_key(&id));
    }

    #[test]
    fn stale_pending_jobs_ignores_non_pending() {
        let mut state = MaterializedState::default();
        let owner = TenantId::new();
        let schedule_id = ScheduleId::new();
        state.apply_event(&job_created(owner, schedule_id, "k1", 0));
        let id = *state.job_keys.get("k1").unwrap();
        state.apply_event(&Event::JobStarted { id, at_ms: 1 });

        assert!(state.stale_pending_jobs(10_000, 1).is_empty());
    }
}
