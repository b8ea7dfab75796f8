// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session entity and its state machine.
//!
//! A session tracks the lifecycle of a logged-in browser profile against
//! the target site. Only [`SessionStatus::HEALTHY`] and
//! [`SessionStatus::EXPIRING`] are "dispatch-usable" — the only states in
//! which the Worker Runtime may attempt a `CREATE_POST` without first
//! re-logging in.

use crate::clock::Clock;
use crate::ids::{CredentialId, SessionId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status of a [`Session`]. Transitions are the only legal changes — see
/// [`Session::transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Pending,
    Healthy,
    Expiring,
    Expired,
    ChallengeRequired,
    Error,
}

crate::simple_display! {
    SessionStatus {
        Pending => "PENDING",
        Healthy => "HEALTHY",
        Expiring => "EXPIRING",
        Expired => "EXPIRED",
        ChallengeRequired => "CHALLENGE_REQUIRED",
        Error => "ERROR",
    }
}

impl SessionStatus {
    /// `HEALTHY` and `EXPIRING` are the only dispatch-usable states.
    pub fn is_dispatch_usable(self) -> bool {
        matches!(self, SessionStatus::Healthy | SessionStatus::Expiring)
    }

    pub fn is_terminal_for_login(self) -> bool {
        matches!(self, SessionStatus::ChallengeRequired | SessionStatus::Error)
    }
}

/// An event driving a session transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransitionEvent {
    InitSuccess,
    InitChallenge,
    InitError,
    VerifyOkAged,
    VerifyOk,
    VerifyFail,
    CookieExpired,
    PlatformBlocks,
    Reconnect,
    ManualLoginOk,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("illegal session transition {event:?} from {from}")]
    InvalidTransition { from: SessionStatus, event: SessionTransitionEvent },
    #[error("credential is corrupt and cannot be decrypted")]
    CredentialCorrupt,
}

/// A live or historical login session against the target site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub credential_id: CredentialId,
    /// Stable for the session's lifetime; used by the automation driver to
    /// reopen the same browser profile.
    pub profile_handle: String,
    pub status: SessionStatus,
    pub last_verified_at_ms: Option<u64>,
    pub nickname: Option<String>,
    pub error_message: Option<String>,
    pub error_code: Option<String>,
    pub created_at_ms: u64,
}

impl Session {
    pub fn new(
        id: SessionId,
        credential_id: CredentialId,
        profile_handle: impl Into<String>,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id,
            credential_id,
            profile_handle: profile_handle.into(),
            status: SessionStatus::Pending,
            last_verified_at_ms: None,
            nickname: None,
            error_message: None,
            error_code: None,
            created_at_ms: clock.epoch_ms(),
        }
    }

    /// Apply a transition event, enforcing the legal-transition table.
    /// Rejects illegal transitions rather than silently clamping.
    pub fn transition(
        &mut self,
        event: SessionTransitionEvent,
        now_ms: u64,
    ) -> Result<(), SessionError> {
        use SessionStatus::*;
        use SessionTransitionEvent as E;

        let next = match (self.status, event) {
            (Pending, E::InitSuccess) => Healthy,
            (Pending, E::InitChallenge) => ChallengeRequired,
            (Pending, E::InitError) => Error,
            (Healthy, E::VerifyOkAged) => Expiring,
            (Healthy, E::CookieExpired) => Expired,
            (Healthy, E::PlatformBlocks) => ChallengeRequired,
            (Healthy, E::VerifyOk) => Healthy,
            (Expiring, E::VerifyOk) => Healthy,
            (Expiring, E::VerifyFail) => Expired,
            (Expired, E::Reconnect) => Pending,
            (ChallengeRequired, E::ManualLoginOk) => Pending,
            (Error, E::Reconnect) => Pending,
            _ => return Err(SessionError::InvalidTransition { from: self.status, event }),
        };

        self.status = next;
        if matches!(event, E::VerifyOk | E::VerifyOkAged) {
            self.last_verified_at_ms = Some(now_ms);
        }
        if matches!(next, Pending) {
            self.error_message = None;
            self.error_code = None;
        }
        Ok(())
    }

    pub fn mark_error(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.error_code = Some(code.into());
        self.error_message = Some(message.into());
    }
}
