// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use lc_core::{CredentialId, Schedule, ScheduleId, TemplateId, TenantId};
use serde::{Deserialize, Serialize};

/// Listing/inspection view of a [`Schedule`]. Flattens the enum fields to
/// their `Display` strings so this type stays readable over JSON without
/// pulling `lc-core` into a hypothetical HTTP layer's type graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleSummary {
    pub id: ScheduleId,
    pub owner_id: TenantId,
    pub credential_id: CredentialId,
    pub template_id: TemplateId,
    pub name: String,
    pub schedule_kind: String,
    pub run_time: String,
    pub daily_post_count: u32,
    pub post_interval_minutes: u32,
    pub user_enabled: bool,
    pub admin_status: String,
    pub admin_reason: Option<String>,
    pub today_posted_count: u32,
    pub next_post_at_ms: Option<u64>,
    pub consecutive_failures: u32,
}

impl From<&Schedule> for ScheduleSummary {
    fn from(s: &Schedule) -> Self {
        Self {
            id: s.id,
            owner_id: s.owner_id,
            credential_id: s.credential_id,
            template_id: s.template_id,
            name: s.name.clone(),
            schedule_kind: s.schedule_kind.to_string(),
            run_time: s.run_time.format("%H:%M:%S").to_string(),
            daily_post_count: s.daily_post_count,
            post_interval_minutes: s.post_interval_minutes,
            user_enabled: s.user_enabled,
            admin_status: s.admin_status.to_string(),
            admin_reason: s.admin_reason.clone(),
            today_posted_count: s.today_posted_count,
            next_post_at_ms: s.next_post_at_ms,
            consecutive_failures: s.consecutive_failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Utc};
    use lc_core::ScheduleKind;

    #[test]
    fn flattens_enum_fields_to_display_strings() {
        let mut schedule = Schedule::new(
            TenantId::new(),
            CredentialId::new(),
            TemplateId::new(),
            "daily-digest",
            ScheduleKind::Timed,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            3,
            10,
            Utc::now(),
        );
        schedule.admin_status = lc_core::AdminStatus::Approved;

        let summary = ScheduleSummary::from(&schedule);
        assert_eq!(summary.name, "daily-digest");
        assert_eq!(summary.admin_status, "APPROVED");
        assert_eq!(summary.run_time, "09:00:00");
    }
}
