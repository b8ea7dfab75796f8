// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schedule entity: the central scheduling entity, and the pure recurrence
//! math the scheduler tick uses to drive it.

use crate::ids::{CredentialId, ScheduleId, TemplateId, TenantId};
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleKind {
    Immediate,
    Timed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminStatus {
    Approved,
    NeedsReview,
    Suspended,
    Banned,
}

crate::simple_display! {
    AdminStatus {
        Approved => "APPROVED",
        NeedsReview => "NEEDS_REVIEW",
        Suspended => "SUSPENDED",
        Banned => "BANNED",
    }
}

/// The central scheduling entity. Mutated by the tenant (identity, cadence,
/// control state) and continuously by the scheduler loop / workers (runtime
/// state — the "hot fields").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub owner_id: TenantId,
    /// Which credential's session a dispatched job should use to post.
    pub credential_id: CredentialId,
    pub template_id: TemplateId,
    pub name: String,

    pub schedule_kind: ScheduleKind,
    /// Local wall-clock HH:MM run time.
    pub run_time: NaiveTime,
    pub daily_post_count: u32,
    pub post_interval_minutes: u32,

    pub user_enabled: bool,
    pub admin_status: AdminStatus,
    pub admin_reason: Option<String>,
    pub suspended_at_ms: Option<u64>,

    pub today_posted_count: u32,
    pub last_run_date: chrono::NaiveDate,
    pub next_post_at_ms: Option<u64>,
    pub consecutive_failures: u32,
}

impl Schedule {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner_id: TenantId,
        credential_id: CredentialId,
        template_id: TemplateId,
        name: impl Into<String>,
        schedule_kind: ScheduleKind,
        run_time: NaiveTime,
        daily_post_count: u32,
        post_interval_minutes: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ScheduleId::new(),
            owner_id,
            credential_id,
            template_id,
            name: name.into(),
            schedule_kind,
            run_time,
            daily_post_count: daily_post_count.clamp(1, 100),
            post_interval_minutes: post_interval_minutes.clamp(1, 60),
            user_enabled: true,
            admin_status: AdminStatus::NeedsReview,
            admin_reason: None,
            suspended_at_ms: None,
            today_posted_count: 0,
            last_run_date: created_at.date_naive(),
            // IMMEDIATE schedules fire on the very next tick; see DESIGN.md.
            next_post_at_ms: match schedule_kind {
                ScheduleKind::Immediate => Some(created_at.timestamp_millis() as u64),
                ScheduleKind::Timed => None,
            },
            consecutive_failures: 0,
        }
    }

    pub fn is_executable(&self) -> bool {
        self.user_enabled && self.admin_status == AdminStatus::Approved
    }

    pub fn quota_met(&self) -> bool {
        self.today_posted_count >= self.daily_post_count
    }

    /// `today_run_time` is `run_time` anchored to `now`'s local calendar day.
    pub fn today_run_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.date_naive().and_time(self.run_time).and_utc()
    }
}

/// Step 1 of the scheduler tick: if the calendar day rolled over, reset the
/// daily counter and compute a fresh `next_post_at`.
///
/// Returns `(new_today_posted_count, new_last_run_date, new_next_post_at_ms)`.
pub fn daily_reset(
    schedule: &Schedule,
    now: DateTime<Utc>,
) -> (u32, chrono::NaiveDate, Option<u64>) {
    let today = now.date_naive();
    let day_rolled = schedule.today_posted_count > 0 && schedule.last_run_date < today;
    let needs_reset = day_rolled || schedule.next_post_at_ms.is_none();
    if !needs_reset {
        return (schedule.today_posted_count, schedule.last_run_date, schedule.next_post_at_ms);
    }

    let posted = if day_rolled { 0 } else { schedule.today_posted_count };
    let quota_met = posted >= schedule.daily_post_count;
    let today_run_time = today.and_time(schedule.run_time).and_utc();

    let next = if quota_met {
        today_run_time + ChronoDuration::hours(24)
    } else if now > today_run_time {
        now
    } else {
        today_run_time
    };

    (posted, today, Some(next.timestamp_millis() as u64))
}

/// The exact `next_post_at` recurrence.
///
/// `n` is the sequence number just emitted (1-based), `total` is
/// `daily_post_count`, `interval` is `post_interval_minutes`, `run_time` is
/// today's run-time instant, `now` is tick time.
pub fn next_post_at(
    n: u32,
    total: u32,
    interval_minutes: u32,
    today_run_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    if n >= total {
        today_run_time + ChronoDuration::hours(24)
    } else if now < today_run_time {
        today_run_time + ChronoDuration::minutes(i64::from(interval_minutes) * i64::from(n))
    } else {
        now + ChronoDuration::minutes(i64::from(interval_minutes))
    }
}

/// Truncate a `DateTime<Utc>` down to minute precision — `next_post_at`
/// values are always compared/stored at minute granularity since the tick
/// cadence is 60s and sub-second precision is never required.
pub fn truncate_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_second(0).and_then(|a| a.with_nanosecond(0)).unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 5, h, m, 0).single().unwrap()
    }

    #[test]
    fn s1_happy_path_grid() {
        let run_time = t(9, 0);
        // at 09:00 tick, n=1 emitted
        let n1 = next_post_at(1, 3, 5, run_time, t(9, 0));
        assert_eq!(n1, t(9, 5));
        let n2 = next_post_at(2, 3, 5, run_time, t(9, 5));
        assert_eq!(n2, t(9, 10));
        let n3 = next_post_at(3, 3, 5, run_time, t(9, 10));
        assert_eq!(n3, run_time + ChronoDuration::hours(24));
    }

    #[test]
    fn s5_catch_up_preserves_interval() {
        let run_time = t(9, 0);
        // scheduler was down until 11:30; seq=1 emitted immediately.
        let n1 = next_post_at(1, 4, 30, run_time, t(11, 30));
        assert_eq!(n1, t(12, 0), "must be now+interval, not run_time+interval");
        let n2 = next_post_at(2, 4, 30, run_time, t(12, 0));
        assert_eq!(n2, t(12, 30));
    }

    #[test]
    fn catch_up_interval_is_honoured_property() {
        // nextPostAt_after - now >= interval, whenever run_time < now at
        // emission time.
        let run_time = t(9, 0);
        let now = t(10, 45);
        let next = next_post_at(1, 5, 17, run_time, now);
        assert!(next - now >= ChronoDuration::minutes(17));
    }
}
