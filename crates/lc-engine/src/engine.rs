// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine: wires storage (WAL + snapshot + `MaterializedState`), the
//! queue broker, the target-site adapters, the scheduler tick, and the
//! worker pool into one runnable unit. This is the daemon's `Runtime`
//! equivalent.

use crate::config::DaemonConfig;
use crate::worker::{self, JobContext};
use crate::{aggregator, scheduler};
use lc_adapters::{CredentialCipher, TargetSiteDriver};
use lc_core::{Clock, Credential, CredentialId, Event, JobId, JobType, ScheduleId, SessionId, TenantId};
use lc_queue::{Broker, EnqueueOpts, RetryPolicy};
use lc_storage::{load_snapshot, Checkpointer, MaterializedState, SnapshotError, Wal, WalError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, info_span, warn};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
    #[error("credential for session {0} not found")]
    SessionCredentialMissing(SessionId),
    #[error("credential {0} not found")]
    CredentialNotFound(CredentialId),
    #[error("schedule {0} not found")]
    ScheduleNotFound(ScheduleId),
}

/// Shared engine state. Cloned cheaply (everything inside is `Arc`'d); the
/// clone is what gets moved into each spawned task.
pub struct Engine<C: Clock> {
    state: Arc<Mutex<MaterializedState>>,
    wal: Arc<Mutex<Wal>>,
    broker: Arc<dyn Broker<JobId>>,
    driver: Arc<dyn TargetSiteDriver>,
    cipher: Arc<dyn CredentialCipher>,
    clock: C,
    config: DaemonConfig,
}

impl<C: Clock> Clone for Engine<C> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            wal: self.wal.clone(),
            broker: self.broker.clone(),
            driver: self.driver.clone(),
            cipher: self.cipher.clone(),
            clock: self.clock.clone(),
            config: self.config.clone(),
        }
    }
}

impl<C: Clock> Engine<C> {
    /// Load the last snapshot, replay the WAL on top of it, and return a
    /// ready-to-run engine. Mirrors the daemon startup sequence: lock
    /// file is the caller's concern (single-process assumption for this
    /// workspace), load snapshot, open WAL + replay, wire adapters.
    pub fn open(
        config: DaemonConfig,
        broker: Arc<dyn Broker<JobId>>,
        driver: Arc<dyn TargetSiteDriver>,
        cipher: Arc<dyn CredentialCipher>,
        clock: C,
    ) -> Result<Self, EngineError> {
        std::fs::create_dir_all(&config.base_dir).map_err(WalError::Io)?;

        let (snapshot_seq, mut state) = load_snapshot(&config.snapshot_path())?;
        let mut wal = Wal::open(&config.wal_path(), snapshot_seq)?;
        for entry in wal.entries_after(snapshot_seq)? {
            state.apply_event(&entry.event);
        }

        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            wal: Arc::new(Mutex::new(wal)),
            broker,
            driver,
            cipher,
            clock,
            config,
        })
    }

    /// Apply an event to the shared state and append it to the WAL.
    fn record(&self, event: Event) {
        self.state.lock().apply_event(&event);
        let mut wal = self.wal.lock();
        if let Err(e) = wal.append(&event) {
            error!(error = %e, "failed to append event to WAL");
            return;
        }
        if wal.needs_flush() {
            if let Err(e) = wal.flush() {
                error!(error = %e, "failed to flush WAL");
            }
        }
    }

    fn snapshot_state(&self) -> MaterializedState {
        self.state.lock().clone()
    }

    /// A consistent point-in-time read of everything the engine knows, for
    /// an operator surface to render.
    pub fn state(&self) -> MaterializedState {
        self.snapshot_state()
    }

    /// Current engine time, for operator surfaces constructing events.
    pub fn now_ms(&self) -> u64 {
        self.clock.epoch_ms()
    }

    /// Apply and durably record a single event. Exposed so an operator
    /// surface can drive one-off state transitions (session reconnect,
    /// forcing a schedule's next run) without going through the job queue.
    pub fn apply(&self, event: Event) {
        self.record(event);
    }

    /// Persist a fresh snapshot and truncate the WAL ahead of it.
    pub fn checkpoint(&self) -> Result<(), EngineError> {
        let mut wal = self.wal.lock();
        wal.flush()?;
        let seq = wal.write_seq();
        let state = self.state.lock().clone();
        let checkpointer = Checkpointer::new(self.config.snapshot_path());
        checkpointer.save(seq, &state)?;
        wal.truncate_before(seq)?;
        Ok(())
    }

    /// `createCredential`: register a new login credential. The secret is
    /// encrypted before it ever touches the WAL.
    pub fn create_credential(
        &self,
        owner_id: TenantId,
        login_name: impl Into<String>,
        plaintext_secret: &str,
        display_name: impl Into<String>,
    ) -> CredentialId {
        let secret_cipher = self.cipher.encrypt(plaintext_secret);
        let credential = Credential::new(owner_id, login_name, secret_cipher, display_name);
        let id = credential.id;
        self.record(Event::CredentialRegistered(Box::new(credential)));
        id
    }

    /// `deleteCredential`: drop a credential from the registry. Any session
    /// already opened against it is left alone — session cleanup is a
    /// separate operator action.
    pub fn delete_credential(&self, credential_id: CredentialId) -> Result<(), EngineError> {
        let snapshot = self.snapshot_state();
        if !snapshot.credentials.contains_key(&credential_id) {
            return Err(EngineError::CredentialNotFound(credential_id));
        }
        self.record(Event::CredentialDeleted { id: credential_id });
        Ok(())
    }

    /// `beginSessionInit(credentialId) -> sessionId`: open a fresh session
    /// for a credential and drive the first login attempt immediately,
    /// bypassing the job queue the same way [`Engine::reconnect_session`]
    /// does — there's no Run/Schedule to hang an `INIT_SESSION` job off of
    /// at registration time. Reuses the credential's existing session
    /// (there is at most one live session per credential) instead of
    /// opening a second one if `beginSessionInit` is called twice.
    pub async fn begin_session_init(&self, credential_id: CredentialId) -> Result<SessionId, EngineError> {
        let now_ms = self.clock.epoch_ms();
        let snapshot = self.snapshot_state();
        let credential =
            snapshot.credentials.get(&credential_id).cloned().ok_or(EngineError::CredentialNotFound(credential_id))?;

        let existing = snapshot.sessions_for_credential(&credential_id).first().map(|s| (*s).clone());
        let session = match existing {
            Some(session) => session,
            None => {
                let session_id = SessionId::new();
                let profile_handle = format!("profile-{session_id}");
                self.record(Event::SessionOpened { id: session_id, credential_id, profile_handle: profile_handle.clone(), at_ms: now_ms });
                lc_core::Session::new(session_id, credential_id, profile_handle, &self.clock)
            }
        };

        let events = worker::attempt_login(&*self.driver, &*self.cipher, session.id, &session.profile_handle, &credential, now_ms).await;
        for event in events {
            self.record(event);
        }
        Ok(session.id)
    }

    /// Drive a session back to `PENDING` and retry login, bypassing the
    /// job queue since a bare credential operation has no Run/Schedule to
    /// attach a job to.
    pub async fn reconnect_session(&self, session_id: SessionId) -> Result<(), EngineError> {
        let now_ms = self.clock.epoch_ms();
        let snapshot = self.snapshot_state();
        let session = snapshot.sessions.get(&session_id).cloned().ok_or(EngineError::SessionNotFound(session_id))?;
        let credential = snapshot
            .credentials
            .get(&session.credential_id)
            .cloned()
            .ok_or(EngineError::SessionCredentialMissing(session_id))?;

        let events = worker::reconnect_session(&*self.driver, &*self.cipher, &session, &credential, now_ms).await;
        for event in events {
            self.record(event);
        }
        Ok(())
    }

    /// Run a bare verify probe against a session, outside the job queue.
    pub async fn verify_session(&self, session_id: SessionId) -> Result<(), EngineError> {
        let now_ms = self.clock.epoch_ms();
        let snapshot = self.snapshot_state();
        let session = snapshot.sessions.get(&session_id).cloned().ok_or(EngineError::SessionNotFound(session_id))?;

        let events = worker::probe_session(&*self.driver, &session, now_ms).await;
        for event in events {
            self.record(event);
        }
        Ok(())
    }

    /// Force a schedule's next post to be due immediately, then run a
    /// normal tick so it goes through the same candidate-selection and
    /// admin-gate path as a naturally due schedule would.
    pub async fn run_schedule_now(&self, schedule_id: ScheduleId) -> Result<(), EngineError> {
        let now_ms = self.clock.epoch_ms();
        let snapshot = self.snapshot_state();
        let schedule = snapshot.schedules.get(&schedule_id).ok_or(EngineError::ScheduleNotFound(schedule_id))?;

        self.record(Event::ScheduleAdvanced {
            id: schedule_id,
            today_posted_count: schedule.today_posted_count,
            next_post_at_ms: Some(now_ms),
        });
        self.tick().await;
        Ok(())
    }

    /// Startup reconciliation: `createJob`'s DB write and broker enqueue
    /// aren't atomic, so a crash in between can leave a `PENDING` job the
    /// broker never saw. Re-enqueue every `PENDING` job older than
    /// `stale_pending_job_secs`; the broker's deterministic `jobKey` makes
    /// this safe to call even for jobs that *did* make it onto the broker
    /// — `enqueue` with an existing key is a no-op.
    pub async fn reconcile_stale_jobs(&self) {
        let now_ms = self.clock.epoch_ms();
        let stale_after_ms = self.config.stale_pending_job_ms();
        let snapshot = self.snapshot_state();
        let stale = snapshot.stale_pending_jobs(now_ms, stale_after_ms);
        if stale.is_empty() {
            return;
        }
        info!(count = stale.len(), "reconciling stale pending jobs");
        for job in stale {
            let opts = EnqueueOpts { job_key: job.job_key.clone(), delay: Duration::ZERO, max_attempts: job.max_attempts };
            if let Err(e) = self.broker.enqueue(job.job_type, job.id, opts).await {
                warn!(error = %e, job_id = %job.id, "failed to re-enqueue stale pending job");
            }
        }
    }

    /// Run one scheduler tick: compute due schedules, record every event,
    /// and enqueue newly created jobs onto the broker.
    pub async fn tick(&self) {
        let now = self.clock.now_utc();
        let span = info_span!("tick", tick_ms = now.timestamp_millis());
        let _enter = span.enter();

        let snapshot = self.snapshot_state();
        let events = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| scheduler::tick(&snapshot, now)));
        let events = match events {
            Ok(events) => events,
            Err(_) => {
                error!("scheduler tick panicked; skipping this tick");
                return;
            }
        };

        for event in events {
            if let Event::JobCreated { job_type, job_key, max_attempts, id, .. } = &event {
                let opts = EnqueueOpts { job_key: job_key.clone(), delay: Duration::ZERO, max_attempts: *max_attempts };
                if let Err(e) = self.broker.enqueue(*job_type, *id, opts).await {
                    warn!(error = %e, "failed to enqueue job");
                }
            }
            self.record(event);
        }
    }

    /// Spawn the tick ticker, the stuck-run sweep, and the worker pool.
    /// Returns their join handles so the caller can await/abort them.
    pub fn spawn(self) -> EngineHandles
    where
        C: 'static,
    {
        let tick_engine = self.clone();
        let tick_interval = self.config.tick_interval();
        let tick_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_interval);
            loop {
                interval.tick().await;
                tick_engine.tick().await;
            }
        });

        let sweep_engine = self.clone();
        let sweep_interval = self.config.stuck_run_sweep_interval();
        let sweep_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            loop {
                interval.tick().await;
                sweep_engine.sweep_stuck_runs();
            }
        });

        let worker_tasks = (0..self.config.worker_concurrency)
            .map(|worker_id| {
                let engine = self.clone();
                tokio::spawn(async move { engine.worker_loop(worker_id).await })
            })
            .collect();

        EngineHandles { tick_task, sweep_task, worker_tasks }
    }

    fn sweep_stuck_runs(&self) {
        let now_ms = self.clock.epoch_ms();
        let snapshot = self.snapshot_state();
        for event in aggregator::sweep_stuck_runs(&snapshot, now_ms) {
            self.record(event);
        }
    }

    async fn worker_loop(&self, worker_id: usize) {
        loop {
            let mut claimed = false;
            for job_type in JobType::ALL {
                if let Some(item) = self.broker.try_claim(job_type).await {
                    claimed = true;
                    self.run_claimed_job(worker_id, item).await;
                }
            }
            if !claimed {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        }
    }

    async fn run_claimed_job(&self, worker_id: usize, item: lc_queue::QueueItem<JobId>) {
        let job_id = item.payload;
        let now_ms = self.clock.epoch_ms();
        self.record(Event::JobStarted { id: job_id, at_ms: now_ms });

        let snapshot = self.snapshot_state();
        let Some(job) = snapshot.jobs.get(&job_id).cloned() else {
            warn!(%job_id, "claimed job vanished from state");
            self.broker.complete(&item.job_key).await;
            return;
        };
        let schedule = snapshot.schedules.get(&job.schedule_id);
        let session = job.session_id.and_then(|id| snapshot.sessions.get(&id));
        // The session (if any) carries the credential that logged it in;
        // fall back to the schedule's configured credential when no
        // session has been assigned to this job yet (e.g. the first job
        // ever emitted for a schedule, before any session exists).
        let credential = session
            .and_then(|s| snapshot.credentials.get(&s.credential_id))
            .or_else(|| schedule.and_then(|s| snapshot.credentials.get(&s.credential_id)));
        let template = schedule.and_then(|s| snapshot.templates.get(&s.template_id));

        let ctx = JobContext { job: &job, schedule, session, credential, template };
        let span = info_span!("job", %worker_id, %job_id, job_type = %job.job_type);
        let _enter = span.enter();

        let outcome = tokio::time::timeout(self.config.job_timeout(), worker::dispatch(&*self.driver, &*self.cipher, ctx, now_ms)).await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("job exceeded hard timeout");
                worker::timeout_outcome(&job, self.clock.epoch_ms())
            }
        };

        let retryable = outcome.retryable;
        for event in outcome.events {
            self.record(event);
        }

        if retryable {
            let backoff = RetryPolicy::for_job_type(job.job_type).base_backoff;
            self.broker.fail(&item.job_key, true, backoff).await;
        } else {
            let final_status = self.state.lock().jobs.get(&job_id).map(|j| j.status);
            match final_status {
                Some(lc_core::JobStatus::Failed) => self.broker.fail(&item.job_key, false, Duration::ZERO).await,
                _ => self.broker.complete(&item.job_key).await,
            }
        }

        info!(%job_id, "job finished");
    }
}

pub struct EngineHandles {
    pub tick_task: tokio::task::JoinHandle<()>,
    pub sweep_task: tokio::task::JoinHandle<()>,
    pub worker_tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl EngineHandles {
    pub fn abort_all(&self) {
        self.tick_task.abort();
        self.sweep_task.abort();
        for task in &self.worker_tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lc_adapters::{FixedKeyCipher, MockDriver};
    use lc_core::{FakeClock, ScheduleKind, TemplateId, TenantId};
    use lc_queue::InMemoryBroker;

    fn test_engine() -> (Engine<FakeClock>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DaemonConfig::default();
        config.base_dir = dir.path().to_path_buf();
        config.tick_interval_secs = 1;

        let broker: Arc<dyn Broker<JobId>> = Arc::new(InMemoryBroker::new());
        let driver: Arc<dyn TargetSiteDriver> = Arc::new(MockDriver::new());
        let cipher: Arc<dyn CredentialCipher> = Arc::new(FixedKeyCipher::new(b"a-sixteen-byte-k".to_vec()));
        let clock = FakeClock::at(1_772_000_000_000);

        let engine = Engine::open(config, broker, driver, cipher, clock).unwrap();
        (engine, dir)
    }

    #[tokio::test]
    async fn open_with_empty_dir_starts_from_fresh_state() {
        let (engine, _dir) = test_engine();
        assert!(engine.snapshot_state().schedules.is_empty());
    }

    #[tokio::test]
    async fn tick_emits_job_for_an_executable_immediate_schedule() {
        let (engine, _dir) = test_engine();
        let now = engine.clock.now_utc();
        let schedule = lc_core::Schedule::new(
            TenantId::new(),
            lc_core::CredentialId::new(),
            TemplateId::new(),
            "s",
            ScheduleKind::Immediate,
            now.time(),
            1,
            5,
            now,
        );
        let mut schedule = schedule;
        schedule.admin_status = lc_core::AdminStatus::Approved;
        engine.record(Event::ScheduleCreated(Box::new(schedule)));

        engine.tick().await;
        let state = engine.snapshot_state();
        assert_eq!(state.jobs.len(), 1);
    }

    #[tokio::test]
    async fn checkpoint_then_reopen_recovers_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DaemonConfig::default();
        config.base_dir = dir.path().to_path_buf();
        let broker: Arc<dyn Broker<JobId>> = Arc::new(InMemoryBroker::new());
        let driver: Arc<dyn TargetSiteDriver> = Arc::new(MockDriver::new());
        let cipher: Arc<dyn CredentialCipher> = Arc::new(FixedKeyCipher::new(b"a-sixteen-byte-k".to_vec()));
        let clock = FakeClock::at(1_772_000_000_000);

        let engine = Engine::open(config.clone(), broker.clone(), driver.clone(), cipher.clone(), clock.clone()).unwrap();
        let schedule = lc_core::Schedule::new(TenantId::new(), lc_core::CredentialId::new(), TemplateId::new(), "s", ScheduleKind::Timed, chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(), 3, 5, engine.clock.now_utc());
        let schedule_id = schedule.id;
        engine.record(Event::ScheduleCreated(Box::new(schedule)));
        engine.checkpoint().unwrap();

        let reopened = Engine::open(config, broker, driver, cipher, clock).unwrap();
        assert!(reopened.snapshot_state().schedules.contains_key(&schedule_id));
    }

    #[tokio::test]
    async fn reconnect_session_drives_expired_session_back_to_healthy() {
        let (engine, _dir) = test_engine();
        let cipher = FixedKeyCipher::new(b"a-sixteen-byte-k".to_vec());
        let credential = lc_core::Credential::new(TenantId::new(), "user", cipher.encrypt("hunter2"), "display");
        let credential_id = credential.id;
        let session_id = lc_core::SessionId::new();

        engine.record(Event::CredentialRegistered(Box::new(credential)));
        engine.record(Event::SessionOpened {
            id: session_id,
            credential_id,
            profile_handle: "profile-1".to_string(),
            at_ms: engine.clock.epoch_ms(),
        });
        engine.record(Event::SessionTransitioned {
            id: session_id,
            event: lc_core::SessionTransitionEvent::InitSuccess,
            at_ms: engine.clock.epoch_ms(),
        });
        engine.record(Event::SessionTransitioned {
            id: session_id,
            event: lc_core::SessionTransitionEvent::CookieExpired,
            at_ms: engine.clock.epoch_ms(),
        });

        engine.reconnect_session(session_id).await.unwrap();
        let state = engine.snapshot_state();
        assert_eq!(state.sessions.get(&session_id).map(|s| s.status), Some(lc_core::SessionStatus::Healthy));
    }

    #[tokio::test]
    async fn reconnect_session_errors_on_unknown_session() {
        let (engine, _dir) = test_engine();
        let err = engine.reconnect_session(lc_core::SessionId::new()).await.unwrap_err();
        assert!(matches!(err, EngineError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn create_credential_registers_an_encrypted_secret() {
        let (engine, _dir) = test_engine();
        let owner_id = TenantId::new();

        let credential_id = engine.create_credential(owner_id, "user", "hunter2", "display");

        let state = engine.snapshot_state();
        let credential = state.credentials.get(&credential_id).unwrap();
        assert_eq!(credential.login_name, "user");
        assert_ne!(credential.secret_cipher, b"hunter2".to_vec());
    }

    #[tokio::test]
    async fn delete_credential_removes_it_and_errors_on_repeat() {
        let (engine, _dir) = test_engine();
        let credential_id = engine.create_credential(TenantId::new(), "user", "hunter2", "display");

        engine.delete_credential(credential_id).unwrap();
        assert!(!engine.snapshot_state().credentials.contains_key(&credential_id));

        let err = engine.delete_credential(credential_id).unwrap_err();
        assert!(matches!(err, EngineError::CredentialNotFound(_)));
    }

    #[tokio::test]
    async fn begin_session_init_opens_a_session_and_logs_in() {
        let (engine, _dir) = test_engine();
        let credential_id = engine.create_credential(TenantId::new(), "user", "hunter2", "display");

        let session_id = engine.begin_session_init(credential_id).await.unwrap();

        let state = engine.snapshot_state();
        let session = state.sessions.get(&session_id).unwrap();
        assert_eq!(session.credential_id, credential_id);
        assert_eq!(session.status, lc_core::SessionStatus::Healthy);
    }

    #[tokio::test]
    async fn begin_session_init_reuses_the_credential_s_existing_session() {
        let (engine, _dir) = test_engine();
        let credential_id = engine.create_credential(TenantId::new(), "user", "hunter2", "display");

        let first = engine.begin_session_init(credential_id).await.unwrap();
        let second = engine.begin_session_init(credential_id).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(engine.snapshot_state().sessions_for_credential(&credential_id).len(), 1);
    }

    #[tokio::test]
    async fn begin_session_init_errors_on_unknown_credential() {
        let (engine, _dir) = test_engine();
        let err = engine.begin_session_init(lc_core::CredentialId::new()).await.unwrap_err();
        assert!(matches!(err, EngineError::CredentialNotFound(_)));
    }

    #[tokio::test]
    async fn reconcile_stale_jobs_re_enqueues_a_job_the_broker_never_saw() {
        let (engine, _dir) = test_engine();
        let now_ms = engine.clock.epoch_ms();
        let old_ms = now_ms - DaemonConfig::default().stale_pending_job_ms() - 1;

        engine.record(Event::JobCreated {
            owner_id: TenantId::new(),
            run_id: lc_core::RunId::new(),
            schedule_id: ScheduleId::new(),
            id: JobId::new(),
            job_type: JobType::CreatePost,
            job_key: "stale_seq1".to_string(),
            run_mode: lc_core::RunMode::Headless,
            max_attempts: 3,
            sequence_number: Some(1),
            at_ms: old_ms,
        });

        engine.reconcile_stale_jobs().await;
        let claimed = engine.broker.try_claim(JobType::CreatePost).await;
        assert!(claimed.is_some());
    }

    #[tokio::test]
    async fn run_schedule_now_creates_a_job_for_a_not_yet_due_timed_schedule() {
        let (engine, _dir) = test_engine();
        let now = engine.clock.now_utc();
        let far_future = (now + chrono::Duration::hours(5)).time();
        let mut schedule =
            lc_core::Schedule::new(TenantId::new(), lc_core::CredentialId::new(), TemplateId::new(), "s", ScheduleKind::Timed, far_future, 1, 5, now);
        schedule.admin_status = lc_core::AdminStatus::Approved;
        let schedule_id = schedule.id;
        engine.record(Event::ScheduleCreated(Box::new(schedule)));

        engine.run_schedule_now(schedule_id).await.unwrap();
        let state = engine.snapshot_state();
        assert_eq!(state.jobs.len(), 1);
    }
}
