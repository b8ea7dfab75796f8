// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential event handlers.

use lc_core::Event;

use super::MaterializedState;

pub(crate) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::CredentialRegistered(credential) => {
            state.credentials.entry(credential.id.clone()).or_insert_with(|| (**credential).clone());
        }

        Event::CredentialLoginOutcomeRecorded { id, outcome, at_ms } => {
            if let Some(credential) = state.credentials.get_mut(id) {
                credential.last_login_at_ms = Some(*at_ms);
                credential.last_login_outcome = Some(outcome.clone());
            }
        }

        Event::CredentialDeleted { id } => {
            state.credentials.remove(id);
        }

        _ => {}
    }
}
