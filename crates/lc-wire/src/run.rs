// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::NaiveDate;
use lc_core::{Run, RunId, ScheduleId, TenantId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSummary {
    pub id: RunId,
    pub owner_id: TenantId,
    pub schedule_id: ScheduleId,
    pub run_date: NaiveDate,
    pub status: String,
    pub total_jobs: u32,
    pub completed_jobs: u32,
    pub failed_jobs: u32,
    pub skipped_jobs: u32,
    pub block_code: Option<String>,
    pub block_reason: Option<String>,
    pub triggered_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub finished_at_ms: Option<u64>,
}

impl From<&Run> for RunSummary {
    fn from(r: &Run) -> Self {
        Self {
            id: r.id,
            owner_id: r.owner_id,
            schedule_id: r.schedule_id,
            run_date: r.run_date,
            status: r.status.to_string(),
            total_jobs: r.total_jobs,
            completed_jobs: r.completed_jobs,
            failed_jobs: r.failed_jobs,
            skipped_jobs: r.skipped_jobs,
            block_code: r.block_code.map(|c| c.to_string()),
            block_reason: r.block_reason.clone(),
            triggered_at_ms: r.triggered_at_ms,
            started_at_ms: r.started_at_ms,
            finished_at_ms: r.finished_at_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lc_core::BlockCode;

    #[test]
    fn carries_block_code_as_display_string() {
        let mut run = Run::new(TenantId::new(), ScheduleId::new(), chrono::Utc::now().date_naive(), 1_000);
        run.block(BlockCode::AdminNotApproved, "needs review", 2_000);

        let summary = RunSummary::from(&run);
        assert_eq!(summary.block_code.as_deref(), Some("ADMIN_NOT_APPROVED"));
        assert_eq!(summary.status, "BLOCKED");
    }
}
