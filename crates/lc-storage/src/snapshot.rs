// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot persistence for crash recovery.
//!
//! Snapshots store the complete materialized state at a point in time,
//! identified by the WAL sequence number. Recovery loads the snapshot and
//! replays WAL entries after that sequence.

use crate::state::MaterializedState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot version {found} is newer than the schema this binary understands ({supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "v")]
    pub version: u32,
    pub seq: u64,
    pub state: MaterializedState,
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(seq: u64, state: MaterializedState, created_at: DateTime<Utc>) -> Self {
        Self { version: CURRENT_SNAPSHOT_VERSION, seq, state, created_at }
    }

    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.version > CURRENT_SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.version,
                supported: CURRENT_SNAPSHOT_VERSION,
            });
        }
        Ok(())
    }
}
