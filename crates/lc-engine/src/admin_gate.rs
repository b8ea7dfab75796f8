// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Administrative-gate policy: whether a schedule may fire this tick, and
//! whether repeated failure should auto-suspend it. Pure functions —
//! unit-testable without a clock, queue, or storage handle.

use lc_core::{AdminStatus, BlockCode, Schedule};

pub const AUTO_SUSPEND_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Executability {
    pub can_execute: bool,
}

/// Session usability is deliberately excluded: the worker re-attempts login
/// per job, so gating here would freeze a whole day's schedule on a
/// transient network hiccup.
pub fn executability(schedule: &Schedule) -> Executability {
    Executability { can_execute: schedule.user_enabled && schedule.admin_status == AdminStatus::Approved }
}

/// Why a non-executable schedule is blocked, for the Run the scheduler
/// records against it. Only meaningful when `executability` returned false.
pub fn block_code_for(schedule: &Schedule) -> BlockCode {
    if !schedule.user_enabled {
        return BlockCode::UserDisabled;
    }
    match schedule.admin_status {
        AdminStatus::Approved => unreachable!("block_code_for called on an executable schedule"),
        AdminStatus::NeedsReview => BlockCode::AdminNotApproved,
        AdminStatus::Suspended => BlockCode::AdminSuspended,
        AdminStatus::Banned => BlockCode::AdminBanned,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoSuspendDecision {
    pub should_suspend: bool,
    pub reason: &'static str,
}

/// Whether this failure count should flip the schedule to `SUSPENDED`.
/// Only ever fires from `APPROVED` — an already-suspended or banned
/// schedule doesn't need a redundant transition.
pub fn auto_suspend_decision(schedule: &Schedule, consecutive_failures: u32) -> AutoSuspendDecision {
    let should_suspend =
        consecutive_failures >= AUTO_SUSPEND_THRESHOLD && schedule.admin_status == AdminStatus::Approved;
    AutoSuspendDecision {
        should_suspend,
        reason: "auto-suspended after 5 consecutive failures",
    }
}
