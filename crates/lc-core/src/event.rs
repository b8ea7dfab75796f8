// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The append-only domain event log. Every mutation to materialized state
//! goes through one of these variants; `lc-storage::MaterializedState`
//! knows how to fold each one back into the in-memory view.

use crate::credential::Credential;
use crate::ids::{CredentialId, JobId, RunId, ScheduleId, SessionId, TenantId};
use crate::job::{JobLog, JobStatus, JobType, RunMode};
use crate::run::{BlockCode, RunStatus};
use crate::schedule::{AdminStatus, Schedule};
use crate::session::{SessionTransitionEvent};
use crate::template::Template;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    CredentialRegistered(Box<Credential>),
    CredentialLoginOutcomeRecorded { id: CredentialId, outcome: String, at_ms: u64 },
    CredentialDeleted { id: CredentialId },

    SessionOpened { id: SessionId, credential_id: CredentialId, profile_handle: String, at_ms: u64 },
    SessionTransitioned { id: SessionId, event: SessionTransitionEvent, at_ms: u64 },
    SessionErrorMarked { id: SessionId, code: String, message: String },
    SessionNicknameSet { id: SessionId, nickname: String },

    TemplateRegistered(Box<Template>),

    ScheduleCreated(Box<Schedule>),
    ScheduleUserEnabledSet { id: ScheduleId, enabled: bool },
    ScheduleAdminStatusSet { id: ScheduleId, status: AdminStatus, reason: Option<String>, at_ms: u64 },
    ScheduleDailyReset { id: ScheduleId, today_posted_count: u32, last_run_date: chrono::NaiveDate, next_post_at_ms: Option<u64> },
    ScheduleAdvanced { id: ScheduleId, today_posted_count: u32, next_post_at_ms: Option<u64> },
    ScheduleFailureRecorded { id: ScheduleId, consecutive_failures: u32 },
    ScheduleFailureReset { id: ScheduleId },
    ScheduleDeleted { id: ScheduleId },

    RunCreated { owner_id: TenantId, schedule_id: ScheduleId, id: RunId, run_date: chrono::NaiveDate, total_jobs: u32, at_ms: u64 },
    RunPromoted { id: RunId, total_jobs: u32, at_ms: u64 },
    RunStatusSet { id: RunId, status: RunStatus, at_ms: u64 },
    RunBlocked { id: RunId, code: BlockCode, reason: String, at_ms: u64 },
    RunTotalsUpdated { id: RunId, completed_jobs: u32, failed_jobs: u32, skipped_jobs: u32, at_ms: u64 },

    JobCreated {
        owner_id: TenantId,
        run_id: RunId,
        schedule_id: ScheduleId,
        id: JobId,
        job_type: JobType,
        job_key: String,
        run_mode: RunMode,
        max_attempts: u32,
        sequence_number: Option<u32>,
        at_ms: u64,
    },
    JobSessionAssigned { id: JobId, session_id: SessionId },
    JobRenderedPayloadSet { id: JobId, subject: String, body: String },
    JobStarted { id: JobId, at_ms: u64 },
    JobCompleted { id: JobId, at_ms: u64 },
    JobFailed { id: JobId, code: String, message: String, at_ms: u64 },
    JobStatusForced { id: JobId, status: JobStatus, at_ms: u64 },
    JobLogAppended(Box<JobLog>),
    /// Bulk delete: cascades to each job's log entries. `ids` is always
    /// pre-filtered to exclude `PENDING`/`PROCESSING` jobs by the caller.
    JobsDeleted { owner_id: TenantId, ids: Vec<JobId> },
}
