// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use lc_core::{CredentialId, Session, SessionId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: SessionId,
    pub credential_id: CredentialId,
    pub profile_handle: String,
    pub status: String,
    pub nickname: Option<String>,
    pub last_verified_at_ms: Option<u64>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl From<&Session> for SessionSummary {
    fn from(s: &Session) -> Self {
        Self {
            id: s.id,
            credential_id: s.credential_id,
            profile_handle: s.profile_handle.clone(),
            status: s.status.to_string(),
            nickname: s.nickname.clone(),
            last_verified_at_ms: s.last_verified_at_ms,
            error_code: s.error_code.clone(),
            error_message: s.error_message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lc_core::{CredentialId, FakeClock, Session};

    #[test]
    fn flattens_status_to_display_string() {
        let clock = FakeClock::at(1_000);
        let session = Session::new(SessionId::new(), CredentialId::new(), "profile-1", &clock);
        let summary = SessionSummary::from(&session);
        assert_eq!(summary.status, "PENDING");
        assert_eq!(summary.profile_handle, "profile-1");
    }
}
