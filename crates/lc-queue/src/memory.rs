// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process broker implementation. Durability here means "survives for
//! the life of the daemon process" — actual crash durability comes from the
//! event log in `lc-storage`, which a real deployment would use to replay
//! `enqueue` calls on restart.

use crate::{Broker, BrokerError, EnqueueOpts, QueueItem, QueueItemState, QueueStats};
use async_trait::async_trait;
use lc_core::JobType;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant, SystemTime};

const COMPLETED_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);
const FAILED_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const THROUGHPUT_WINDOW: Duration = Duration::from_secs(60);

struct Entry<T> {
    job_type: JobType,
    payload: T,
    state: QueueItemState,
    attempt: u32,
    max_attempts: u32,
    ready_at: Instant,
    terminal_at: Option<SystemTime>,
}

pub struct InMemoryBroker<T> {
    entries: Mutex<HashMap<String, Entry<T>>>,
    paused: Mutex<HashSet<JobType>>,
    completions: Mutex<VecDeque<Instant>>,
}

impl<T> Default for InMemoryBroker<T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            paused: Mutex::new(HashSet::new()),
            completions: Mutex::new(VecDeque::new()),
        }
    }
}

impl<T> InMemoryBroker<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<T: Send + Sync + Clone + 'static> Broker<T> for InMemoryBroker<T> {
    async fn enqueue(&self, job_type: JobType, payload: T, opts: EnqueueOpts) -> Result<(), BrokerError> {
        let mut entries = self.entries.lock();
        if entries.contains_key(&opts.job_key) {
            tracing::debug!(job_key = %opts.job_key, "enqueue is a no-op: key already present");
            return Ok(());
        }
        let state = if opts.delay.is_zero() { QueueItemState::Waiting } else { QueueItemState::Delayed };
        entries.insert(
            opts.job_key.clone(),
            Entry {
                job_type,
                payload,
                state,
                attempt: 0,
                max_attempts: opts.max_attempts,
                ready_at: Instant::now() + opts.delay,
                terminal_at: None,
            },
        );
        Ok(())
    }

    async fn try_claim(&self, job_type: JobType) -> Option<QueueItem<T>> {
        let paused = self.paused.lock().contains(&job_type);
        if paused {
            return None;
        }
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let job_key = entries
            .iter()
            .filter(|(_, e)| {
                e.job_type == job_type
                    && matches!(e.state, QueueItemState::Waiting | QueueItemState::Delayed)
                    && e.ready_at <= now
            })
            .min_by_key(|(_, e)| e.ready_at)
            .map(|(k, _)| k.clone())?;

        let entry = entries.get_mut(&job_key)?;
        entry.state = QueueItemState::Active;
        entry.attempt += 1;
        Some(QueueItem {
            job_key: job_key.clone(),
            job_type: entry.job_type,
            payload: entry.payload.clone(),
            state: entry.state,
            attempt: entry.attempt,
            max_attempts: entry.max_attempts,
        })
    }

    async fn complete(&self, job_key: &str) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(job_key) {
            entry.state = QueueItemState::Completed;
            entry.terminal_at = Some(SystemTime::now());
            self.completions.lock().push_back(Instant::now());
        }
    }

    async fn fail(&self, job_key: &str, retryable: bool, backoff_base: Duration) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(job_key) {
            if retryable && entry.attempt < entry.max_attempts {
                entry.state = QueueItemState::Delayed;
                let backoff = backoff_base * 2u32.saturating_pow(entry.attempt.saturating_sub(1));
                entry.ready_at = Instant::now() + backoff;
            } else {
                entry.state = QueueItemState::Failed;
                entry.terminal_at = Some(SystemTime::now());
            }
        }
    }

    async fn remove(&self, job_key: &str) -> Result<(), BrokerError> {
        let mut entries = self.entries.lock();
        match entries.get(job_key).map(|e| e.state) {
            Some(QueueItemState::Waiting) | Some(QueueItemState::Delayed) => {
                entries.remove(job_key);
                Ok(())
            }
            Some(_) => Err(BrokerError::NotRemovable(job_key.to_string())),
            None => Ok(()),
        }
    }

    async fn pause(&self, job_type: JobType) {
        self.paused.lock().insert(job_type);
    }

    async fn resume(&self, job_type: JobType) {
        self.paused.lock().remove(&job_type);
    }

    async fn collect_garbage(&self, now: SystemTime) {
        let mut entries = self.entries.lock();
        entries.retain(|_, e| match (e.state, e.terminal_at) {
            (QueueItemState::Completed, Some(at)) => {
                now.duration_since(at).map(|age| age < COMPLETED_RETENTION).unwrap_or(true)
            }
            (QueueItemState::Failed, Some(at)) => {
                now.duration_since(at).map(|age| age < FAILED_RETENTION).unwrap_or(true)
            }
            _ => true,
        });
    }

    async fn introspect(&self) -> QueueStats {
        let entries = self.entries.lock();
        let mut stats = QueueStats::default();
        for entry in entries.values() {
            match entry.state {
                QueueItemState::Waiting => stats.waiting += 1,
                QueueItemState::Delayed => stats.delayed += 1,
                QueueItemState::Active => stats.active += 1,
                QueueItemState::Completed => stats.completed += 1,
                QueueItemState::Failed => stats.failed += 1,
            }
        }
        drop(entries);

        let now = Instant::now();
        let mut completions = self.completions.lock();
        completions.retain(|at| now.duration_since(*at) < THROUGHPUT_WINDOW);
        stats.completions_per_min = completions.len();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn opts(key: &str) -> EnqueueOpts {
        EnqueueOpts { job_key: key.to_string(), delay: Duration::ZERO, max_attempts: 3 }
    }

    #[tokio::test]
    async fn enqueue_same_job_key_is_a_no_op() {
        let broker: InMemoryBroker<u32> = InMemoryBroker::new();
        broker.enqueue(JobType::CreatePost, 1, opts("run-1_seq1")).await.unwrap();
        broker.enqueue(JobType::CreatePost, 2, opts("run-1_seq1")).await.unwrap();
        let claimed = broker.try_claim(JobType::CreatePost).await.unwrap();
        assert_eq!(claimed.payload, 1);
        assert!(broker.try_claim(JobType::CreatePost).await.is_none());
    }

    #[tokio::test]
    async fn claim_is_exclusive() {
        let broker: InMemoryBroker<u32> = InMemoryBroker::new();
        broker.enqueue(JobType::CreatePost, 1, opts("k1")).await.unwrap();
        let first = broker.try_claim(JobType::CreatePost).await;
        assert!(first.is_some());
        let second = broker.try_claim(JobType::CreatePost).await;
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn remove_fails_once_active() {
        let broker: InMemoryBroker<u32> = InMemoryBroker::new();
        broker.enqueue(JobType::CreatePost, 1, opts("k1")).await.unwrap();
        broker.try_claim(JobType::CreatePost).await;
        let result = broker.remove("k1").await;
        assert!(matches!(result, Err(BrokerError::NotRemovable(_))));
    }

    #[tokio::test]
    async fn remove_succeeds_while_waiting() {
        let broker: InMemoryBroker<u32> = InMemoryBroker::new();
        broker.enqueue(JobType::CreatePost, 1, opts("k1")).await.unwrap();
        assert!(broker.remove("k1").await.is_ok());
        assert!(broker.try_claim(JobType::CreatePost).await.is_none());
    }

    #[tokio::test]
    async fn paused_type_yields_nothing() {
        let broker: InMemoryBroker<u32> = InMemoryBroker::new();
        broker.enqueue(JobType::CreatePost, 1, opts("k1")).await.unwrap();
        broker.pause(JobType::CreatePost).await;
        assert!(broker.try_claim(JobType::CreatePost).await.is_none());
        broker.resume(JobType::CreatePost).await;
        assert!(broker.try_claim(JobType::CreatePost).await.is_some());
    }

    #[test]
    fn retry_policy_backoff_doubles() {
        let policy = crate::RetryPolicy::new(3, Duration::from_secs(5));
        assert_eq!(policy.backoff_for_attempt(1), Duration::from_secs(5));
        assert_eq!(policy.backoff_for_attempt(2), Duration::from_secs(10));
        assert_eq!(policy.backoff_for_attempt(3), Duration::from_secs(20));
    }

    #[test]
    fn session_init_caps_at_one_attempt() {
        let policy = crate::RetryPolicy::for_job_type(JobType::InitSession);
        assert_eq!(policy.max_attempts, 1);
    }

    #[tokio::test]
    async fn introspect_counts_each_state() {
        let broker: InMemoryBroker<u32> = InMemoryBroker::new();
        broker.enqueue(JobType::CreatePost, 1, opts("k1")).await.unwrap();
        broker.enqueue(JobType::CreatePost, 2, opts("k2")).await.unwrap();
        broker.try_claim(JobType::CreatePost).await;
        broker.complete("k1").await;

        let stats = broker.introspect().await;
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.waiting, 1);
        assert_eq!(stats.completions_per_min, 1);
    }
}
