// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker Runtime: per-`JobType` handlers executed by the engine's worker
//! pool. Handlers are async (the target-site driver is async) but take
//! their dependencies as explicit arguments rather than reaching into
//! shared state, so they're unit-testable against `MockDriver` alone. The
//! 10-minute hard timeout and the claim/dispatch/record loop live in
//! [`crate::engine`], which owns the shared `MaterializedState` and WAL.

use lc_adapters::{CredentialCipher, ErrorCategory, PostPayload, TargetSiteDriver};
use lc_core::{BlockCode, Credential, Event, Job, JobType, RunId, Schedule, Session, SessionId, SessionTransitionEvent, Template};

/// Everything a handler needs to act on one job. Optional fields are
/// populated by the caller based on `job.job_type`.
pub struct JobContext<'a> {
    pub job: &'a Job,
    pub schedule: Option<&'a Schedule>,
    pub session: Option<&'a Session>,
    pub credential: Option<&'a Credential>,
    pub template: Option<&'a Template>,
}

/// Result of dispatching one job: events to fold into state plus whether
/// the broker should retry on failure.
pub struct JobOutcome {
    pub events: Vec<Event>,
    pub retryable: bool,
}

impl JobOutcome {
    fn ok(events: Vec<Event>) -> Self {
        Self { events, retryable: false }
    }

    fn failed(events: Vec<Event>, retryable: bool) -> Self {
        Self { events, retryable }
    }
}

pub async fn dispatch(
    driver: &dyn TargetSiteDriver,
    cipher: &dyn CredentialCipher,
    ctx: JobContext<'_>,
    now_ms: u64,
) -> JobOutcome {
    match ctx.job.job_type {
        JobType::InitSession => init_session(driver, cipher, &ctx, now_ms).await,
        JobType::VerifySession => verify_session(driver, &ctx, now_ms).await,
        JobType::CreatePost => create_post(driver, cipher, &ctx, now_ms).await,
        JobType::SyncPosts => sync_posts(driver, &ctx, now_ms).await,
        JobType::DeletePost => delete_post(driver, &ctx, now_ms).await,
    }
}

async fn init_session(
    driver: &dyn TargetSiteDriver,
    cipher: &dyn CredentialCipher,
    ctx: &JobContext<'_>,
    now_ms: u64,
) -> JobOutcome {
    let (Some(session), Some(credential)) = (ctx.session, ctx.credential) else {
        return JobOutcome::failed(vec![fail_job(ctx.job, "NOT_FOUND", "session or credential missing", now_ms)], false);
    };

    let plain = match cipher.decrypt(&credential.secret_cipher) {
        Ok(p) => p,
        Err(_) => {
            let mut events = vec![session_transition_event(session.id, SessionTransitionEvent::InitError, now_ms)];
            events.push(fail_job(ctx.job, "CREDENTIAL_CORRUPT", "credential could not be decrypted", now_ms));
            return JobOutcome::failed(events, false);
        }
    };

    if driver.open_profile(&session.profile_handle).await.is_err() {
        let events = vec![
            session_transition_event(session.id, SessionTransitionEvent::InitError, now_ms),
            fail_job(ctx.job, "DRIVER_ERROR", "open_profile failed", now_ms),
        ];
        return JobOutcome::failed(events, true);
    }

    match driver.login(&credential.login_name, &plain).await {
        Ok(outcome) if outcome.ok => {
            let mut events = vec![session_transition_event(session.id, SessionTransitionEvent::InitSuccess, now_ms)];
            if let Some(nick) = outcome.nickname {
                events.push(Event::SessionNicknameSet { id: session.id, nickname: nick });
            }
            events.push(complete_job(ctx.job, now_ms));
            JobOutcome::ok(events)
        }
        Ok(outcome) if outcome.challenge => {
            let events = vec![
                session_transition_event(session.id, SessionTransitionEvent::InitChallenge, now_ms),
                fail_job(ctx.job, "SESSION_CHALLENGE", "login requires manual challenge", now_ms),
            ];
            // INIT_SESSION never retries on CHALLENGE_REQUIRED.
            JobOutcome::failed(events, false)
        }
        Ok(_) => {
            let events = vec![
                session_transition_event(session.id, SessionTransitionEvent::InitError, now_ms),
                fail_job(ctx.job, "SESSION_ERROR", "login rejected", now_ms),
            ];
            JobOutcome::failed(events, false)
        }
        Err(e) => {
            let events = vec![
                session_transition_event(session.id, SessionTransitionEvent::InitError, now_ms),
                fail_job(ctx.job, "DRIVER_ERROR", &e.to_string(), now_ms),
            ];
            JobOutcome::failed(events, true)
        }
    }
}

/// A verify success only demotes `HEALTHY` to `EXPIRING` once the session
/// has gone unverified for at least this long; a fresher success just
/// refreshes `lastVerifiedAt` and the session stays `HEALTHY`.
const VERIFY_AGE_THRESHOLD_MS: u64 = 24 * 3600 * 1000;

fn verify_ok_event(session: &Session, now_ms: u64) -> SessionTransitionEvent {
    if session.status == lc_core::SessionStatus::Expiring {
        return SessionTransitionEvent::VerifyOk;
    }
    let last_verified = session.last_verified_at_ms.unwrap_or(0);
    if now_ms.saturating_sub(last_verified) >= VERIFY_AGE_THRESHOLD_MS {
        SessionTransitionEvent::VerifyOkAged
    } else {
        SessionTransitionEvent::VerifyOk
    }
}

async fn verify_session(driver: &dyn TargetSiteDriver, ctx: &JobContext<'_>, now_ms: u64) -> JobOutcome {
    let Some(session) = ctx.session else {
        return JobOutcome::failed(vec![fail_job(ctx.job, "NOT_FOUND", "session missing", now_ms)], false);
    };

    match driver.verify_login().await {
        Ok(outcome) if outcome.ok => {
            let ev = verify_ok_event(session, now_ms);
            JobOutcome::ok(vec![session_transition_event(session.id, ev, now_ms), complete_job(ctx.job, now_ms)])
        }
        Ok(_) | Err(_) => {
            let ev = if session.status == lc_core::SessionStatus::Expiring {
                SessionTransitionEvent::VerifyFail
            } else {
                SessionTransitionEvent::CookieExpired
            };
            let events = vec![
                session_transition_event(session.id, ev, now_ms),
                fail_job(ctx.job, "SESSION_EXPIRED", "verify probe failed", now_ms),
            ];
            JobOutcome::failed(events, false)
        }
    }
}

async fn create_post(
    driver: &dyn TargetSiteDriver,
    cipher: &dyn CredentialCipher,
    ctx: &JobContext<'_>,
    now_ms: u64,
) -> JobOutcome {
    let Some(schedule) = ctx.schedule else {
        return JobOutcome::failed(vec![fail_job(ctx.job, "NOT_FOUND", "schedule missing", now_ms)], false);
    };

    let usable = ctx.session.is_some_and(|s| s.status.is_dispatch_usable());
    if !usable {
        // In-line re-login attempt using the stored credential; the
        // profile is already open from a prior INIT_SESSION.
        let relogin_ok = match ctx.credential {
            Some(credential) => match cipher.decrypt(&credential.secret_cipher) {
                Ok(plain) => driver.login(&credential.login_name, &plain).await.map(|o| o.ok).unwrap_or(false),
                Err(_) => false,
            },
            None => false,
        };

        if !relogin_ok {
            let block_code = match ctx.session.map(|s| s.status) {
                Some(lc_core::SessionStatus::ChallengeRequired) => BlockCode::SessionChallenge,
                Some(lc_core::SessionStatus::Error) => BlockCode::SessionError,
                _ => BlockCode::SessionExpired,
            };
            return session_blocked_outcome(ctx, schedule, block_code, now_ms);
        }
    }

    let mut images = ctx.template.map(|t| t.images.clone()).unwrap_or_default();
    images.sort_by_key(|i| i.order);
    let image_paths = images.into_iter().map(|i| i.path).collect::<Vec<_>>();

    let payload = PostPayload {
        subject: ctx.job.rendered_subject.clone().unwrap_or_default(),
        body: ctx.job.rendered_body.clone().unwrap_or_default(),
        image_paths,
    };

    let mut outcome = driver.create_post(payload.clone()).await;

    // Auto-recovery: ambiguous (non-ok, uncategorized) result gets one
    // 2s-delayed re-probe before being treated as a genuine failure.
    if let Ok(o) = &outcome {
        if !o.ok && o.error_category.is_none() {
            tokio::time::sleep(std::time::Duration::from_secs(2)).await;
            outcome = driver.create_post(payload).await;
        }
    }

    match outcome {
        Ok(o) if o.ok => {
            let events = vec![
                complete_job(ctx.job, now_ms),
                run_totals_delta(ctx.job.run_id, 1, 0, 0, now_ms),
                Event::ScheduleFailureReset { id: schedule.id },
            ];
            JobOutcome::ok(events)
        }
        Ok(o) => {
            let category = o.error_category.unwrap_or(ErrorCategory::Unknown);
            let retryable = !matches!(category, ErrorCategory::PermissionDenied | ErrorCategory::CafeNotFound);
            let events = vec![fail_job(ctx.job, &category.to_string(), "create_post failed", now_ms), run_totals_delta(ctx.job.run_id, 0, 1, 0, now_ms)];
            JobOutcome::failed(events, retryable)
        }
        Err(e) => {
            let events = vec![fail_job(ctx.job, "DRIVER_ERROR", &e.to_string(), now_ms), run_totals_delta(ctx.job.run_id, 0, 1, 0, now_ms)];
            JobOutcome::failed(events, true)
        }
    }
}

fn session_blocked_outcome(ctx: &JobContext<'_>, schedule: &Schedule, code: BlockCode, now_ms: u64) -> JobOutcome {
    let mut events = vec![
        fail_job(ctx.job, &code.to_string(), "session not usable", now_ms),
        run_totals_delta(ctx.job.run_id, 0, 0, 1, now_ms),
        Event::RunBlocked { id: ctx.job.run_id, code, reason: format!("session not usable: {code}"), at_ms: now_ms },
    ];

    let consecutive_failures = schedule.consecutive_failures + 1;
    events.push(Event::ScheduleFailureRecorded { id: schedule.id, consecutive_failures });
    let decision = crate::admin_gate::auto_suspend_decision(schedule, consecutive_failures);
    if decision.should_suspend {
        events.push(Event::ScheduleAdminStatusSet {
            id: schedule.id,
            status: lc_core::AdminStatus::Suspended,
            reason: Some(decision.reason.to_string()),
            at_ms: now_ms,
        });
    }

    JobOutcome::failed(events, false)
}

async fn sync_posts(driver: &dyn TargetSiteDriver, ctx: &JobContext<'_>, now_ms: u64) -> JobOutcome {
    match driver.sync_my_posts().await {
        Ok(()) => JobOutcome::ok(vec![complete_job(ctx.job, now_ms)]),
        Err(e) => JobOutcome::failed(vec![fail_job(ctx.job, "DRIVER_ERROR", &e.to_string(), now_ms)], true),
    }
}

async fn delete_post(driver: &dyn TargetSiteDriver, ctx: &JobContext<'_>, now_ms: u64) -> JobOutcome {
    // DELETE_POST carries its single string argument (the target article
    // id) in the generic rendered-subject slot; maintenance job types are
    // intentionally out of scope for a dedicated payload shape.
    let article_id = ctx.job.rendered_subject.clone().unwrap_or_default();
    match driver.delete_post(&article_id).await {
        Ok(()) => JobOutcome::ok(vec![complete_job(ctx.job, now_ms)]),
        Err(e) => JobOutcome::failed(vec![fail_job(ctx.job, "DRIVER_ERROR", &e.to_string(), now_ms)], true),
    }
}

/// Operator-triggered reconnect (`lc-cli session reconnect`): moves a
/// terminal session back to `PENDING` and immediately retries login, the
/// two `EXPIRED|ERROR|CHALLENGE_REQUIRED → PENDING → {HEALTHY,...}` steps
/// an INIT_SESSION job would otherwise perform. There's no Run/Schedule to
/// hang a job off of for a bare credential-level operation, so this skips
/// the queue and drives the driver calls directly.
pub async fn reconnect_session(
    driver: &dyn TargetSiteDriver,
    cipher: &dyn CredentialCipher,
    session: &Session,
    credential: &Credential,
    now_ms: u64,
) -> Vec<Event> {
    let to_pending = match session.status {
        lc_core::SessionStatus::ChallengeRequired => SessionTransitionEvent::ManualLoginOk,
        _ => SessionTransitionEvent::Reconnect,
    };
    let mut events = vec![session_transition_event(session.id, to_pending, now_ms)];
    events.extend(attempt_login(driver, cipher, session.id, &session.profile_handle, credential, now_ms).await);
    events
}

/// Decrypt, open the driver profile, and attempt login, emitting the
/// matching `InitSuccess`/`InitChallenge`/`InitError` transition (plus a
/// nickname event on success). Shared by [`reconnect_session`] and
/// `Engine::begin_session_init`, both of which drive a login attempt
/// outside the job queue.
pub async fn attempt_login(
    driver: &dyn TargetSiteDriver,
    cipher: &dyn CredentialCipher,
    session_id: SessionId,
    profile_handle: &str,
    credential: &Credential,
    now_ms: u64,
) -> Vec<Event> {
    let plain = match cipher.decrypt(&credential.secret_cipher) {
        Ok(p) => p,
        Err(_) => return vec![session_transition_event(session_id, SessionTransitionEvent::InitError, now_ms)],
    };

    if driver.open_profile(profile_handle).await.is_err() {
        return vec![session_transition_event(session_id, SessionTransitionEvent::InitError, now_ms)];
    }

    match driver.login(&credential.login_name, &plain).await {
        Ok(outcome) if outcome.ok => {
            let mut events = vec![session_transition_event(session_id, SessionTransitionEvent::InitSuccess, now_ms)];
            if let Some(nick) = outcome.nickname {
                events.push(Event::SessionNicknameSet { id: session_id, nickname: nick });
            }
            events
        }
        Ok(outcome) if outcome.challenge => {
            vec![session_transition_event(session_id, SessionTransitionEvent::InitChallenge, now_ms)]
        }
        Ok(_) | Err(_) => vec![session_transition_event(session_id, SessionTransitionEvent::InitError, now_ms)],
    }
}

/// Operator-triggered verify probe (`lc-cli session verify`), mirroring
/// [`verify_session`] without a job envelope.
pub async fn probe_session(driver: &dyn TargetSiteDriver, session: &Session, now_ms: u64) -> Vec<Event> {
    let ok = matches!(driver.verify_login().await, Ok(outcome) if outcome.ok);
    let event = if ok {
        verify_ok_event(session, now_ms)
    } else if session.status == lc_core::SessionStatus::Expiring {
        SessionTransitionEvent::VerifyFail
    } else {
        SessionTransitionEvent::CookieExpired
    };
    vec![session_transition_event(session.id, event, now_ms)]
}

fn session_transition_event(id: SessionId, event: SessionTransitionEvent, at_ms: u64) -> Event {
    Event::SessionTransitioned { id, event, at_ms }
}

fn complete_job(job: &Job, at_ms: u64) -> Event {
    Event::JobCompleted { id: job.id, at_ms }
}

fn fail_job(job: &Job, code: &str, message: &str, at_ms: u64) -> Event {
    Event::JobFailed { id: job.id, code: code.to_string(), message: message.to_string(), at_ms }
}

fn run_totals_delta(run_id: RunId, completed: u32, failed: u32, skipped: u32, at_ms: u64) -> Event {
    // The caller folds this against the run's current totals; see
    // `crate::aggregator::update_totals` for the read-then-emit version
    // used when a fresh `MaterializedState` snapshot is available.
    Event::RunTotalsUpdated { id: run_id, completed_jobs: completed, failed_jobs: failed, skipped_jobs: skipped, at_ms }
}

/// `errorCode=TIMEOUT` path: the engine's worker loop calls this directly
/// when `tokio::time::timeout` elapses around [`dispatch`], since the
/// in-flight future is dropped and cannot report its own outcome.
pub fn timeout_outcome(job: &Job, now_ms: u64) -> JobOutcome {
    JobOutcome::failed(vec![fail_job(job, "TIMEOUT", "worker exceeded the 10-minute hard cap", now_ms), run_totals_delta(job.run_id, 0, 1, 0, now_ms)], true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Utc};
    use lc_adapters::{FixedKeyCipher, LoginOutcome, MockDriver, PostOutcome};
    use lc_core::{RunMode, ScheduleId, ScheduleKind, SessionStatus, TemplateId, TenantId};

    fn cipher() -> FixedKeyCipher {
        FixedKeyCipher::new(b"a-sixteen-byte-k".to_vec())
    }

    fn job(job_type: JobType) -> Job {
        Job::new(TenantId::new(), RunId::new(), ScheduleId::new(), job_type, "run_seq1", RunMode::Headless, 3, Some(1), 0)
    }

    fn credential(cipher: &FixedKeyCipher) -> Credential {
        Credential::new(TenantId::new(), "user", cipher.encrypt("hunter2"), "display")
    }

    fn healthy_session() -> Session {
        let mut s = Session::new(SessionId::new(), lc_core::CredentialId::new(), "profile-1", &lc_core::FakeClock::new());
        s.status = SessionStatus::Healthy;
        s
    }

    #[tokio::test]
    async fn init_session_succeeds_against_mock_driver() {
        let driver = MockDriver::new();
        let cipher = cipher();
        let cred = credential(&cipher);
        let session = Session::new(SessionId::new(), cred.id, "profile-1", &lc_core::FakeClock::new());
        let j = job(JobType::InitSession);
        let ctx = JobContext { job: &j, schedule: None, session: Some(&session), credential: Some(&cred), template: None };

        let outcome = dispatch(&driver, &cipher, ctx, 0).await;
        assert!(outcome.events.iter().any(|e| matches!(e, Event::SessionTransitioned { event: SessionTransitionEvent::InitSuccess, .. })));
        assert!(outcome.events.iter().any(|e| matches!(e, Event::JobCompleted { .. })));
    }

    #[tokio::test]
    async fn init_session_challenge_is_not_retryable() {
        let driver = MockDriver::new();
        let cipher = cipher();
        let cred = credential(&cipher);
        driver.seed_login("user", LoginOutcome { ok: false, nickname: None, challenge: true });
        let session = Session::new(SessionId::new(), cred.id, "profile-1", &lc_core::FakeClock::new());
        let j = job(JobType::InitSession);
        let ctx = JobContext { job: &j, schedule: None, session: Some(&session), credential: Some(&cred), template: None };

        let outcome = dispatch(&driver, &cipher, ctx, 0).await;
        assert!(!outcome.retryable);
        assert!(outcome.events.iter().any(|e| matches!(e, Event::SessionTransitioned { event: SessionTransitionEvent::InitChallenge, .. })));
    }

    #[tokio::test]
    async fn create_post_succeeds_with_healthy_session() {
        let driver = MockDriver::new();
        let cipher = cipher();
        let cred = credential(&cipher);
        let session = healthy_session();
        let mut schedule = Schedule::new(TenantId::new(), cred.id, TemplateId::new(), "s", ScheduleKind::Timed, NaiveTime::from_hms_opt(9, 0, 0).unwrap(), 3, 5, Utc::now());
        schedule.admin_status = lc_core::AdminStatus::Approved;
        let mut j = job(JobType::CreatePost);
        j.rendered_subject = Some("hello".into());
        j.rendered_body = Some("world".into());
        let ctx = JobContext { job: &j, schedule: Some(&schedule), session: Some(&session), credential: Some(&cred), template: None };

        let outcome = dispatch(&driver, &cipher, ctx, 0).await;
        assert!(outcome.events.iter().any(|e| matches!(e, Event::JobCompleted { .. })));
        assert!(outcome.events.iter().any(|e| matches!(e, Event::RunTotalsUpdated { completed_jobs: 1, .. })));
    }

    #[tokio::test]
    async fn create_post_with_no_usable_session_blocks_the_run() {
        let driver = MockDriver::new();
        driver.seed_login("user", LoginOutcome { ok: false, nickname: None, challenge: false });
        let cipher = cipher();
        let cred = credential(&cipher);
        let mut session = healthy_session();
        session.status = SessionStatus::Expired;
        let mut schedule = Schedule::new(TenantId::new(), cred.id, TemplateId::new(), "s", ScheduleKind::Timed, NaiveTime::from_hms_opt(9, 0, 0).unwrap(), 3, 5, Utc::now());
        schedule.admin_status = lc_core::AdminStatus::Approved;
        let j = job(JobType::CreatePost);
        let ctx = JobContext { job: &j, schedule: Some(&schedule), session: Some(&session), credential: Some(&cred), template: None };

        let outcome = dispatch(&driver, &cipher, ctx, 0).await;
        assert!(!outcome.retryable);
        assert!(outcome.events.iter().any(|e| matches!(e, Event::RunBlocked { code: BlockCode::SessionExpired, .. })));
    }

    #[tokio::test]
    async fn create_post_non_retryable_category_blocks_broker_retry() {
        let driver = MockDriver::new();
        driver.seed_posts(vec![PostOutcome { ok: false, article_id: None, article_url: None, error_category: Some(ErrorCategory::PermissionDenied) }]);
        let cipher = cipher();
        let cred = credential(&cipher);
        let session = healthy_session();
        let mut schedule = Schedule::new(TenantId::new(), cred.id, TemplateId::new(), "s", ScheduleKind::Timed, NaiveTime::from_hms_opt(9, 0, 0).unwrap(), 3, 5, Utc::now());
        schedule.admin_status = lc_core::AdminStatus::Approved;
        let j = job(JobType::CreatePost);
        let ctx = JobContext { job: &j, schedule: Some(&schedule), session: Some(&session), credential: Some(&cred), template: None };

        let outcome = dispatch(&driver, &cipher, ctx, 0).await;
        assert!(!outcome.retryable);
    }

    #[test]
    fn timeout_outcome_is_retryable_with_timeout_code() {
        let j = job(JobType::CreatePost);
        let outcome = timeout_outcome(&j, 0);
        assert!(outcome.retryable);
        assert!(outcome.events.iter().any(|e| matches!(e, Event::JobFailed { code, .. } if code == "TIMEOUT")));
    }

    #[tokio::test]
    async fn reconnect_from_expired_emits_reconnect_then_init_success() {
        let driver = MockDriver::new();
        let cipher = cipher();
        let cred = credential(&cipher);
        let mut session = Session::new(SessionId::new(), cred.id, "profile-1", &lc_core::FakeClock::new());
        session.status = SessionStatus::Expired;

        let events = reconnect_session(&driver, &cipher, &session, &cred, 0).await;
        assert!(matches!(events[0], Event::SessionTransitioned { event: SessionTransitionEvent::Reconnect, .. }));
        assert!(events.iter().any(|e| matches!(e, Event::SessionTransitioned { event: SessionTransitionEvent::InitSuccess, .. })));
    }

    #[tokio::test]
    async fn reconnect_from_challenge_required_uses_manual_login_ok() {
        let driver = MockDriver::new();
        let cipher = cipher();
        let cred = credential(&cipher);
        let mut session = Session::new(SessionId::new(), cred.id, "profile-1", &lc_core::FakeClock::new());
        session.status = SessionStatus::ChallengeRequired;

        let events = reconnect_session(&driver, &cipher, &session, &cred, 0).await;
        assert!(matches!(events[0], Event::SessionTransitioned { event: SessionTransitionEvent::ManualLoginOk, .. }));
    }

    #[tokio::test]
    async fn reconnect_login_failure_ends_in_init_error() {
        let driver = MockDriver::new();
        driver.seed_login("user", LoginOutcome { ok: false, nickname: None, challenge: false });
        let cipher = cipher();
        let cred = credential(&cipher);
        let mut session = Session::new(SessionId::new(), cred.id, "profile-1", &lc_core::FakeClock::new());
        session.status = SessionStatus::Error;

        let events = reconnect_session(&driver, &cipher, &session, &cred, 0).await;
        assert!(events.iter().any(|e| matches!(e, Event::SessionTransitioned { event: SessionTransitionEvent::InitError, .. })));
    }

    #[tokio::test]
    async fn probe_session_on_expiring_session_uses_verify_ok_or_fail() {
        let driver = MockDriver::new();
        let mut session = healthy_session();
        session.status = SessionStatus::Expiring;

        let events = probe_session(&driver, &session, 0).await;
        assert!(matches!(events[0], Event::SessionTransitioned { event: SessionTransitionEvent::VerifyOk, .. }));
    }

    #[tokio::test]
    async fn probe_session_on_freshly_verified_healthy_session_stays_healthy() {
        let driver = MockDriver::new();
        let mut session = healthy_session();
        session.last_verified_at_ms = Some(0);

        let events = probe_session(&driver, &session, 1_000).await;
        assert!(matches!(events[0], Event::SessionTransitioned { event: SessionTransitionEvent::VerifyOk, .. }));
    }

    #[tokio::test]
    async fn probe_session_on_aged_healthy_session_uses_verify_ok_aged() {
        let driver = MockDriver::new();
        let mut session = healthy_session();
        session.last_verified_at_ms = Some(0);

        let events = probe_session(&driver, &session, VERIFY_AGE_THRESHOLD_MS).await;
        assert!(matches!(events[0], Event::SessionTransitioned { event: SessionTransitionEvent::VerifyOkAged, .. }));
    }
}
