// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job entity: a single unit of dispatchable work handed to the Worker
//! Runtime, plus its append-only log.

use crate::ids::{JobId, RunId, ScheduleId, SessionId, TenantId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    InitSession,
    VerifySession,
    CreatePost,
    SyncPosts,
    DeletePost,
}

crate::simple_display! {
    JobType {
        InitSession => "INIT_SESSION",
        VerifySession => "VERIFY_SESSION",
        CreatePost => "CREATE_POST",
        SyncPosts => "SYNC_POSTS",
        DeletePost => "DELETE_POST",
    }
}

impl JobType {
    pub const ALL: [JobType; 5] =
        [JobType::InitSession, JobType::VerifySession, JobType::CreatePost, JobType::SyncPosts, JobType::DeletePost];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display! {
    JobStatus {
        Pending => "PENDING",
        Processing => "PROCESSING",
        Completed => "COMPLETED",
        Failed => "FAILED",
        Cancelled => "CANCELLED",
    }
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }
}

/// Whether a job runs against a real browser driver or a headless/no-UI
/// harness. Surfaced to the target-site driver so it can decide whether to
/// keep the window visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunMode {
    Headless,
    Debug,
}

crate::simple_display! {
    RunMode {
        Headless => "HEADLESS",
        Debug => "DEBUG",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobLogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

crate::simple_display! {
    JobLogLevel {
        Debug => "DEBUG",
        Info => "INFO",
        Warn => "WARN",
        Error => "ERROR",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobLog {
    pub job_id: JobId,
    pub level: JobLogLevel,
    pub message: String,
    pub at_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub owner_id: TenantId,
    pub run_id: RunId,
    pub schedule_id: ScheduleId,
    pub session_id: Option<SessionId>,
    pub job_type: JobType,
    pub status: JobStatus,
    pub run_mode: RunMode,
    pub job_key: String,
    /// Position within the owning Run, 1..dailyPostCount. `None` for
    /// standalone jobs (e.g. `session reconnect`) that have no Run.
    pub sequence_number: Option<u32>,
    pub attempt: u32,
    pub max_attempts: u32,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub rendered_subject: Option<String>,
    pub rendered_body: Option<String>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub completed_at_ms: Option<u64>,
}

/// `deleteJobs(ownerId, selector)`'s filter half. `ByIds` is handled by the
/// caller directly; the `ByFilter` variants are evaluated here against one
/// job at a time. A matching job is only actually deleted if it's terminal
/// — `PENDING`/`PROCESSING` jobs are never removed by a bulk operation,
/// regardless of which selector is used.
#[derive(Debug, Clone, Copy)]
pub enum JobDeleteFilter {
    AllTerminal,
    Completed,
    Failed,
    OlderThan { before_ms: u64 },
}

impl JobDeleteFilter {
    pub fn matches(self, job: &Job) -> bool {
        if !job.status.is_terminal() {
            return false;
        }
        match self {
            JobDeleteFilter::AllTerminal => true,
            JobDeleteFilter::Completed => job.status == JobStatus::Completed,
            JobDeleteFilter::Failed => job.status == JobStatus::Failed,
            JobDeleteFilter::OlderThan { before_ms } => job.created_at_ms < before_ms,
        }
    }
}

impl Job {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner_id: TenantId,
        run_id: RunId,
        schedule_id: ScheduleId,
        job_type: JobType,
        job_key: impl Into<String>,
        run_mode: RunMode,
        max_attempts: u32,
        sequence_number: Option<u32>,
        now_ms: u64,
    ) -> Self {
        Self {
            id: JobId::new(),
            owner_id,
            run_id,
            schedule_id,
            session_id: None,
            job_type,
            status: JobStatus::Pending,
            run_mode,
            job_key: job_key.into(),
            sequence_number,
            attempt: 0,
            max_attempts,
            error_code: None,
            error_message: None,
            rendered_subject: None,
            rendered_body: None,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
            started_at_ms: None,
            completed_at_ms: None,
        }
    }

    pub fn start(&mut self, now_ms: u64) {
        self.status = JobStatus::Processing;
        self.attempt += 1;
        self.started_at_ms = Some(now_ms);
        self.updated_at_ms = now_ms;
    }

    pub fn complete(&mut self, now_ms: u64) {
        self.status = JobStatus::Completed;
        self.error_code = None;
        self.error_message = None;
        self.updated_at_ms = now_ms;
        self.completed_at_ms = Some(now_ms);
    }

    pub fn fail(&mut self, code: impl Into<String>, message: impl Into<String>, now_ms: u64) {
        self.status = JobStatus::Failed;
        self.error_code = Some(code.into());
        self.error_message = Some(message.into());
        self.updated_at_ms = now_ms;
        self.completed_at_ms = Some(now_ms);
    }

    pub fn exhausted_retries(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_job() -> Job {
        Job::new(
            TenantId::new(),
            RunId::new(),
            ScheduleId::new(),
            JobType::CreatePost,
            "run-1_seq1",
            RunMode::Headless,
            3,
            Some(1),
            0,
        )
    }

    #[test]
    fn start_increments_attempt() {
        let mut job = new_job();
        job.start(10);
        assert_eq!(job.attempt, 1);
        assert_eq!(job.status, JobStatus::Processing);
        job.fail("TIMEOUT", "worker timed out", 20);
        job.start(30);
        assert_eq!(job.attempt, 2);
    }

    #[test]
    fn exhausted_retries_after_max_attempts() {
        let mut job = new_job();
        for t in 0..3 {
            job.start(t);
            job.fail("ERR", "boom", t + 1);
        }
        assert!(job.exhausted_retries());
    }

    #[test]
    fn complete_clears_error_fields() {
        let mut job = new_job();
        job.start(1);
        job.fail("ERR", "boom", 2);
        job.start(3);
        job.complete(4);
        assert!(job.error_code.is_none());
        assert!(job.error_message.is_none());
    }

    #[test]
    fn delete_filter_never_matches_pending_or_processing() {
        let mut job = new_job();
        assert!(!JobDeleteFilter::AllTerminal.matches(&job));
        job.start(1);
        assert!(!JobDeleteFilter::AllTerminal.matches(&job));
    }

    #[test]
    fn delete_filter_completed_and_failed_are_disjoint() {
        let mut completed = new_job();
        completed.start(1);
        completed.complete(2);
        let mut failed = new_job();
        failed.start(1);
        failed.fail("ERR", "boom", 2);

        assert!(JobDeleteFilter::Completed.matches(&completed));
        assert!(!JobDeleteFilter::Completed.matches(&failed));
        assert!(JobDeleteFilter::Failed.matches(&failed));
        assert!(!JobDeleteFilter::Failed.matches(&completed));
        assert!(JobDeleteFilter::AllTerminal.matches(&completed));
        assert!(JobDeleteFilter::AllTerminal.matches(&failed));
    }

    #[test]
    fn delete_filter_older_than_compares_created_at() {
        let mut job = new_job();
        job.start(1);
        job.complete(2);
        assert!(JobDeleteFilter::OlderThan { before_ms: 1 }.matches(&job));
        assert!(!JobDeleteFilter::OlderThan { before_ms: 0 }.matches(&job));
    }
}
