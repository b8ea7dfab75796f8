// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable typed FIFO queue: delayed delivery, per-type retry policy, and
//! deterministic dedup on `jobKey`.

mod memory;

use async_trait::async_trait;
use lc_core::JobType;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("job key already present: {0}")]
    DuplicateJobKey(String),
    #[error("job {0} is not in a removable state")]
    NotRemovable(String),
}

/// Retry policy for one job type.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self { max_attempts, base_backoff }
    }

    /// Exponential backoff starting at `base_backoff`: attempt 1 waits
    /// `base_backoff`, attempt 2 waits `2 * base_backoff`, and so on.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        self.base_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    /// Session-init job types retry at most once: retrying against the same
    /// credential while it is mid-challenge is counter-productive.
    pub fn for_job_type(job_type: JobType) -> Self {
        match job_type {
            JobType::InitSession => Self::new(1, Duration::from_secs(5)),
            _ => Self::new(3, Duration::from_secs(5)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueItemState {
    Waiting,
    Delayed,
    Active,
    Completed,
    Failed,
}

/// Counts per state plus a rolling throughput metric, for `queue stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QueueStats {
    pub waiting: usize,
    pub delayed: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
    /// Completions observed in the last 60 seconds.
    pub completions_per_min: usize,
}

#[derive(Debug, Clone)]
pub struct EnqueueOpts {
    pub job_key: String,
    pub delay: Duration,
    pub max_attempts: u32,
}

#[derive(Debug, Clone)]
pub struct QueueItem<T> {
    pub job_key: String,
    pub job_type: JobType,
    pub payload: T,
    pub state: QueueItemState,
    pub attempt: u32,
    pub max_attempts: u32,
}

/// A durable typed queue. Implementations must guarantee at-least-once
/// delivery and dedup strictly on `job_key`.
#[async_trait]
pub trait Broker<T: Send + Sync + Clone + 'static>: Send + Sync {
    async fn enqueue(&self, job_type: JobType, payload: T, opts: EnqueueOpts) -> Result<(), BrokerError>;

    /// Claim the next ready item of `job_type`, if any, transitioning it to
    /// `Active`. Pull-based: callers poll rather than registering a handler,
    /// matching the worker pool's fixed-size task model.
    async fn try_claim(&self, job_type: JobType) -> Option<QueueItem<T>>;

    async fn complete(&self, job_key: &str);

    /// Mark failed. If attempts remain, reschedule with exponential
    /// backoff; otherwise the item is retained (7 days) in `Failed`.
    async fn fail(&self, job_key: &str, retryable: bool, backoff_base: Duration);

    /// Remove a job that hasn't started yet. Fails if the job is `Active`
    /// or already terminal.
    async fn remove(&self, job_key: &str) -> Result<(), BrokerError>;

    async fn pause(&self, job_type: JobType);
    async fn resume(&self, job_type: JobType);

    /// Drop terminal entries past their retention window. Completed jobs
    /// retain 24h, failed jobs 7d.
    async fn collect_garbage(&self, now: std::time::SystemTime);

    /// Counts per state across every job type, plus a rolling throughput
    /// metric, for admin/CLI introspection.
    async fn introspect(&self) -> QueueStats;
}

pub use memory::InMemoryBroker;
