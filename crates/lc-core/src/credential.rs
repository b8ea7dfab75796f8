// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential entity. `secret_cipher` is opaque to the core — see
//! `lc-adapters::CredentialCipher` for the encrypt/decrypt contract.

use crate::ids::{CredentialId, TenantId};
use serde::{Deserialize, Serialize};

/// A stored login credential for the target site.
///
/// Invariant: `(owner_id, login_name)` is unique per tenant — enforced by
/// the storage layer, not this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub id: CredentialId,
    pub owner_id: TenantId,
    pub login_name: String,
    /// Opaque ciphertext; never decrypted outside `lc-adapters::CredentialCipher`.
    pub secret_cipher: Vec<u8>,
    pub display_name: String,
    pub last_login_at_ms: Option<u64>,
    pub last_login_outcome: Option<String>,
}

impl Credential {
    pub fn new(
        owner_id: TenantId,
        login_name: impl Into<String>,
        secret_cipher: Vec<u8>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id: CredentialId::new(),
            owner_id,
            login_name: login_name.into(),
            secret_cipher,
            display_name: display_name.into(),
            last_login_at_ms: None,
            last_login_outcome: None,
        }
    }
}
