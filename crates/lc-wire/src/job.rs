// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use lc_core::{Job, JobId, JobLog, RunId, ScheduleId, SessionId, TenantId};
use serde::{Deserialize, Serialize};

/// Row shape for `job ls`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobSummary {
    pub id: JobId,
    pub owner_id: TenantId,
    pub run_id: RunId,
    pub schedule_id: ScheduleId,
    pub job_type: String,
    pub status: String,
    pub run_mode: String,
    pub sequence_number: Option<u32>,
    pub attempt: u32,
    pub max_attempts: u32,
    pub created_at_ms: u64,
    pub completed_at_ms: Option<u64>,
}

impl From<&Job> for JobSummary {
    fn from(j: &Job) -> Self {
        Self {
            id: j.id,
            owner_id: j.owner_id,
            run_id: j.run_id,
            schedule_id: j.schedule_id,
            job_type: j.job_type.to_string(),
            status: j.status.to_string(),
            run_mode: j.run_mode.to_string(),
            sequence_number: j.sequence_number,
            attempt: j.attempt,
            max_attempts: j.max_attempts,
            created_at_ms: j.created_at_ms,
            completed_at_ms: j.completed_at_ms,
        }
    }
}

/// Full shape for `job show`, including the rendered payload and error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobDetail {
    pub summary: JobSummary,
    pub session_id: Option<SessionId>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub rendered_subject: Option<String>,
    pub rendered_body: Option<String>,
    pub started_at_ms: Option<u64>,
}

impl From<&Job> for JobDetail {
    fn from(j: &Job) -> Self {
        Self {
            summary: JobSummary::from(j),
            session_id: j.session_id,
            error_code: j.error_code.clone(),
            error_message: j.error_message.clone(),
            rendered_subject: j.rendered_subject.clone(),
            rendered_body: j.rendered_body.clone(),
            started_at_ms: j.started_at_ms,
        }
    }
}

/// One line of `job logs`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobLogLine {
    pub level: String,
    pub message: String,
    pub at_ms: u64,
}

impl From<&JobLog> for JobLogLine {
    fn from(l: &JobLog) -> Self {
        Self { level: l.level.to_string(), message: l.message.clone(), at_ms: l.at_ms }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lc_core::{JobType, RunMode};

    fn job() -> Job {
        Job::new(
            TenantId::new(),
            RunId::new(),
            ScheduleId::new(),
            JobType::CreatePost,
            "run_seq1".to_string(),
            RunMode::Headless,
            3,
            Some(1),
            1_000,
        )
    }

    #[test]
    fn summary_flattens_enum_display_strings() {
        let j = job();
        let summary = JobSummary::from(&j);
        assert_eq!(summary.job_type, "CREATE_POST");
        assert_eq!(summary.status, "PENDING");
    }

    #[test]
    fn detail_carries_rendered_payload() {
        let mut j = job();
        j.rendered_subject = Some("subject".to_string());
        let detail = JobDetail::from(&j);
        assert_eq!(detail.rendered_subject.as_deref(), Some("subject"));
    }
}
