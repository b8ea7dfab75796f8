// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ties the WAL and the snapshot file together: periodic checkpoints let
//! recovery skip straight to the last materialized point instead of
//! replaying the log from the beginning.

use crate::snapshot::{Snapshot, SnapshotError};
use crate::state::MaterializedState;
use chrono::Utc;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct Checkpointer {
    path: PathBuf,
}

impl Checkpointer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn save(&self, seq: u64, state: &MaterializedState) -> Result<(), SnapshotError> {
        let snapshot = Snapshot::new(seq, state.clone(), Utc::now());
        let json = serde_json::to_vec_pretty(&snapshot)?;
        let tmp_path = self.path.with_extension("tmp");
        {
            let mut f = fs::File::create(&tmp_path)?;
            f.write_all(&json)?;
            f.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    pub fn load(&self) -> Result<Option<Snapshot>, SnapshotError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.path)?;
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        snapshot.validate()?;
        Ok(Some(snapshot))
    }
}

/// Convenience wrapper used by daemon startup: load a snapshot if present,
/// otherwise start from an empty state at seq 0.
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<(u64, MaterializedState), SnapshotError> {
    match Checkpointer::new(path.as_ref()).load()? {
        Some(snapshot) => Ok((snapshot.seq, snapshot.state)),
        None => Ok((0, MaterializedState::default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let checkpointer = Checkpointer::new(&path);
        let state = MaterializedState::default();
        checkpointer.save(42, &state).unwrap();
        let loaded = checkpointer.load().unwrap().unwrap();
        assert_eq!(loaded.seq, 42);
    }

    #[test]
    fn load_missing_file_returns_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(Checkpointer::new(&path).load().unwrap().is_none());
    }
}
