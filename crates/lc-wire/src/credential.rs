// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use lc_core::{Credential, CredentialId, TenantId};
use serde::{Deserialize, Serialize};

/// Listing/inspection view of a [`Credential`]. Never carries `secret_cipher`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialSummary {
    pub id: CredentialId,
    pub owner_id: TenantId,
    pub login_name: String,
    pub display_name: String,
    pub last_login_at_ms: Option<u64>,
    pub last_login_outcome: Option<String>,
}

impl From<&Credential> for CredentialSummary {
    fn from(c: &Credential) -> Self {
        Self {
            id: c.id,
            owner_id: c.owner_id,
            login_name: c.login_name.clone(),
            display_name: c.display_name.clone(),
            last_login_at_ms: c.last_login_at_ms,
            last_login_outcome: c.last_login_outcome.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_carries_the_cipher() {
        let credential = Credential::new(TenantId::new(), "user", vec![1, 2, 3], "display");
        let summary = CredentialSummary::from(&credential);
        assert_eq!(summary.login_name, "user");
        assert_eq!(summary.owner_id, credential.owner_id);
    }
}
