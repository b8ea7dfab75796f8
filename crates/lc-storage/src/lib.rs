// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable storage: write-ahead log, periodic snapshots, and the
//! materialized state they reconstruct.

mod checkpoint;
mod snapshot;
mod state;
mod wal;

pub use checkpoint::{load_snapshot, Checkpointer};
pub use snapshot::{Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
pub use state::MaterializedState;
pub use wal::{Wal, WalEntry, WalError};
