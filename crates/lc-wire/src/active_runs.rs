// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::RunSummary;
use lc_core::{Job, JobStatus};
use lc_queue::QueueStats;
use serde::{Deserialize, Serialize};

/// How long a just-finished Run still counts as "active" for this snapshot
/// — long enough that a dashboard polling every few seconds doesn't see a
/// run disappear the instant its last job completes.
pub const FLASH_PERSISTENCE_MS: u64 = 30_000;

/// One of a Run's last 5 terminal jobs, the detail an operator dashboard
/// shows inline instead of making the caller fetch each job separately.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunJobOutcome {
    pub sequence_number: Option<u32>,
    pub outcome: String,
    pub error_code: Option<String>,
    pub finished_at_ms: u64,
}

impl RunJobOutcome {
    fn from_job(job: &Job) -> Option<Self> {
        let finished_at_ms = job.completed_at_ms?;
        let outcome = match job.status {
            JobStatus::Completed => "SUCCESS",
            JobStatus::Failed | JobStatus::Cancelled => "FAILED",
            JobStatus::Pending | JobStatus::Processing => return None,
        };
        Some(Self {
            sequence_number: job.sequence_number,
            outcome: outcome.to_string(),
            error_code: job.error_code.clone(),
            finished_at_ms,
        })
    }
}

/// One Run in the snapshot, plus its last 5 terminal jobs by `finishedAt`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveRunEntry {
    pub run: RunSummary,
    pub recent_jobs: Vec<RunJobOutcome>,
}

impl ActiveRunEntry {
    /// `jobs` may be in any order and may include non-terminal jobs;
    /// this keeps only the 5 most recently finished.
    pub fn new(run: RunSummary, jobs: &[&Job]) -> Self {
        let mut recent_jobs: Vec<RunJobOutcome> = jobs.iter().filter_map(|j| RunJobOutcome::from_job(j)).collect();
        recent_jobs.sort_by(|a, b| b.finished_at_ms.cmp(&a.finished_at_ms));
        recent_jobs.truncate(5);
        Self { run, recent_jobs }
    }
}

/// A point-in-time view of everything currently in flight: every Run in
/// `{RUNNING, QUEUED}` plus any `{COMPLETED, FAILED}` Run that finished
/// within [`FLASH_PERSISTENCE_MS`], so a polling dashboard doesn't flicker
/// a run out of view the instant it terminates. Plus queue depth/
/// throughput, the way `lc-cli run ls --active` renders it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveRunsSnapshot {
    pub runs: Vec<ActiveRunEntry>,
    pub queue_waiting: usize,
    pub queue_delayed: usize,
    pub queue_active: usize,
    pub completions_per_min: usize,
}

impl ActiveRunsSnapshot {
    pub fn new(runs: Vec<ActiveRunEntry>, queue: QueueStats) -> Self {
        Self {
            runs,
            queue_waiting: queue.waiting,
            queue_delayed: queue.delayed,
            queue_active: queue.active,
            completions_per_min: queue.completions_per_min,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RunSummary;
    use lc_core::{JobId, JobType, RunId, RunMode, ScheduleId, TenantId};

    fn terminal_job(seq: u32, status: JobStatus, finished_at_ms: u64) -> Job {
        let mut j = Job::new(TenantId::new(), RunId::new(), ScheduleId::new(), JobType::CreatePost, "k", RunMode::Headless, 3, Some(seq), 0);
        j.id = JobId::new();
        j.status = status;
        j.completed_at_ms = Some(finished_at_ms);
        j
    }

    #[test]
    fn keeps_only_the_five_most_recently_finished() {
        let run = RunSummary::from(&lc_core::Run::new(TenantId::new(), ScheduleId::new(), chrono::Utc::now().date_naive(), 0));
        let jobs: Vec<Job> = (1..=7).map(|seq| terminal_job(seq, JobStatus::Completed, seq as u64 * 1000)).collect();
        let refs: Vec<&Job> = jobs.iter().collect();

        let entry = ActiveRunEntry::new(run, &refs);
        assert_eq!(entry.recent_jobs.len(), 5);
        assert_eq!(entry.recent_jobs[0].sequence_number, Some(7));
        assert_eq!(entry.recent_jobs[4].sequence_number, Some(3));
    }

    #[test]
    fn non_terminal_jobs_are_excluded() {
        let run = RunSummary::from(&lc_core::Run::new(TenantId::new(), ScheduleId::new(), chrono::Utc::now().date_naive(), 0));
        let mut pending = terminal_job(1, JobStatus::Completed, 1000);
        pending.status = JobStatus::Pending;
        pending.completed_at_ms = None;
        let jobs = vec![pending];
        let refs: Vec<&Job> = jobs.iter().collect();

        let entry = ActiveRunEntry::new(run, &refs);
        assert!(entry.recent_jobs.is_empty());
    }
}
