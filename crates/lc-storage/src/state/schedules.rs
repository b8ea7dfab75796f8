// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schedule event handlers.

use lc_core::Event;

use super::MaterializedState;

pub(crate) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::ScheduleCreated(schedule) => {
            state.schedules.entry(schedule.id.clone()).or_insert_with(|| (**schedule).clone());
        }

        Event::ScheduleUserEnabledSet { id, enabled } => {
            if let Some(schedule) = state.schedules.get_mut(id) {
                schedule.user_enabled = *enabled;
            }
        }

        Event::ScheduleAdminStatusSet { id, status, reason, at_ms } => {
            if let Some(schedule) = state.schedules.get_mut(id) {
                schedule.admin_status = *status;
                schedule.admin_reason = reason.clone();
                schedule.suspended_at_ms =
                    if *status == lc_core::AdminStatus::Suspended { Some(*at_ms) } else { None };
            }
        }

        Event::ScheduleDailyReset { id, today_posted_count, last_run_date, next_post_at_ms } => {
            if let Some(schedule) = state.schedules.get_mut(id) {
                schedule.today_posted_count = *today_posted_count;
                schedule.last_run_date = *last_run_date;
                schedule.next_post_at_ms = *next_post_at_ms;
            }
        }

        Event::ScheduleAdvanced { id, today_posted_count, next_post_at_ms } => {
            if let Some(schedule) = state.schedules.get_mut(id) {
                schedule.today_posted_count = *today_posted_count;
                schedule.next_post_at_ms = *next_post_at_ms;
            }
        }

        Event::ScheduleFailureRecorded { id, consecutive_failures } => {
            if let Some(schedule) = state.schedules.get_mut(id) {
                schedule.consecutive_failures = *consecutive_failures;
            }
        }

        Event::ScheduleFailureReset { id } => {
            if let Some(schedule) = state.schedules.get_mut(id) {
                schedule.consecutive_failures = 0;
            }
        }

        Event::ScheduleDeleted { id } => {
            state.schedules.remove(id);
        }

        _ => {}
    }
}
