// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Template event handlers.

use lc_core::Event;

use super::MaterializedState;

pub(crate) fn apply(state: &mut MaterializedState, event: &Event) {
    if let Event::TemplateRegistered(template) = event {
        state.templates.entry(template.id.clone()).or_insert_with(|| (**template).clone());
    }
}
