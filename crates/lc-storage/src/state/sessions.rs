// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session event handlers.

use lc_core::clock::FakeClock;
use lc_core::{Event, Session};

use super::MaterializedState;

pub(crate) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::SessionOpened { id, credential_id, profile_handle, at_ms } => {
            state.sessions.entry(id.clone()).or_insert_with(|| {
                // the clock is only used to stamp created_at; we already
                // know the real timestamp from the event.
                let mut session =
                    Session::new(id.clone(), credential_id.clone(), profile_handle.clone(), &FakeClock::at(*at_ms));
                session.created_at_ms = *at_ms;
                session
            });
        }

        Event::SessionTransitioned { id, event: transition, at_ms } => {
            if let Some(session) = state.sessions.get_mut(id) {
                // apply_event is replay-safe: an already-applied transition
                // fails silently rather than panicking on replay.
                let _ = session.transition(*transition, *at_ms);
            }
        }

        Event::SessionErrorMarked { id, code, message } => {
            if let Some(session) = state.sessions.get_mut(id) {
                session.mark_error(code.clone(), message.clone());
            }
        }

        Event::SessionNicknameSet { id, nickname } => {
            if let Some(session) = state.sessions.get_mut(id) {
                session.nickname = Some(nickname.clone());
            }
        }

        _ => {}
    }
}
