// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run entity: groups the jobs a schedule emits for one calendar day into a
//! single aggregate outcome.

use crate::ids::{RunId, ScheduleId, TenantId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Pending,
    Queued,
    Running,
    Completed,
    Failed,
    Blocked,
    Skipped,
}

crate::simple_display! {
    RunStatus {
        Pending => "PENDING",
        Queued => "QUEUED",
        Running => "RUNNING",
        Completed => "COMPLETED",
        Failed => "FAILED",
        Blocked => "BLOCKED",
        Skipped => "SKIPPED",
    }
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed | RunStatus::Blocked | RunStatus::Skipped)
    }
}

/// Why a run was blocked or skipped before (or instead of) completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockCode {
    UserDisabled,
    AdminNotApproved,
    AdminSuspended,
    AdminBanned,
    SessionExpired,
    SessionChallenge,
    SessionError,
    DailyLimit,
    Duplicate,
}

crate::simple_display! {
    BlockCode {
        UserDisabled => "USER_DISABLED",
        AdminNotApproved => "ADMIN_NOT_APPROVED",
        AdminSuspended => "ADMIN_SUSPENDED",
        AdminBanned => "ADMIN_BANNED",
        SessionExpired => "SESSION_EXPIRED",
        SessionChallenge => "SESSION_CHALLENGE",
        SessionError => "SESSION_ERROR",
        DailyLimit => "DAILY_LIMIT",
        Duplicate => "DUPLICATE",
    }
}

impl BlockCode {
    /// `USER_DISABLED` lands in `SKIPPED`; everything else is `BLOCKED`.
    pub fn terminal_status(self) -> RunStatus {
        if self == BlockCode::UserDisabled {
            RunStatus::Skipped
        } else {
            RunStatus::Blocked
        }
    }

    /// Only session-related blocks count toward the auto-suspend counter.
    pub fn counts_toward_auto_suspend(self) -> bool {
        matches!(self, BlockCode::SessionExpired | BlockCode::SessionChallenge | BlockCode::SessionError)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub owner_id: TenantId,
    pub schedule_id: ScheduleId,
    pub run_date: NaiveDate,
    pub status: RunStatus,
    pub total_jobs: u32,
    pub completed_jobs: u32,
    pub failed_jobs: u32,
    pub skipped_jobs: u32,
    pub block_code: Option<BlockCode>,
    pub block_reason: Option<String>,
    pub triggered_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub finished_at_ms: Option<u64>,
}

impl Run {
    /// Deterministic dedup key for the Nth job of this run.
    pub fn job_key_for(run_id: &RunId, sequence_number: u32) -> String {
        format!("{run_id}_seq{sequence_number}")
    }

    pub fn new(owner_id: TenantId, schedule_id: ScheduleId, run_date: NaiveDate, now_ms: u64) -> Self {
        Self {
            id: RunId::new(),
            owner_id,
            schedule_id,
            run_date,
            status: RunStatus::Pending,
            total_jobs: 0,
            completed_jobs: 0,
            failed_jobs: 0,
            skipped_jobs: 0,
            block_code: None,
            block_reason: None,
            triggered_at_ms: now_ms,
            started_at_ms: None,
            finished_at_ms: None,
        }
    }

    pub fn processed(&self) -> u32 {
        self.completed_jobs + self.failed_jobs + self.skipped_jobs
    }

    /// Promote a `BLOCKED`/`SKIPPED` run back to `RUNNING`. Rows already in
    /// `{RUNNING, COMPLETED, FAILED}` are left untouched — the caller should
    /// treat that as a no-op signal.
    pub fn can_promote(&self) -> bool {
        matches!(self.status, RunStatus::Blocked | RunStatus::Skipped)
    }

    pub fn promote(&mut self, total_jobs: u32, now_ms: u64) {
        self.status = RunStatus::Running;
        self.total_jobs = total_jobs;
        self.block_code = None;
        self.block_reason = None;
        self.started_at_ms.get_or_insert(now_ms);
    }

    pub fn block(&mut self, code: BlockCode, reason: impl Into<String>, now_ms: u64) {
        self.status = code.terminal_status();
        self.block_code = Some(code);
        self.block_reason = Some(reason.into());
        self.finished_at_ms = Some(now_ms);
    }

    /// Recompute status from job totals. Called after every job terminates
    /// and by the periodic stuck-run sweep.
    pub fn recompute_status(&mut self, now_ms: u64) {
        if self.status.is_terminal() || self.total_jobs == 0 {
            return;
        }
        if self.processed() >= self.total_jobs {
            self.status = if self.failed_jobs == 0 && self.skipped_jobs == 0 {
                RunStatus::Completed
            } else {
                RunStatus::Failed
            };
            self.finished_at_ms = Some(now_ms);
        }
    }
}
