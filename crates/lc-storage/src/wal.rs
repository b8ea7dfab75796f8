// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log: the durable source of truth. One JSON object per line,
//! fsynced on a count/interval threshold. [`MaterializedState`] is nothing
//! more than a cache rebuilt by replaying this log.

use lc_core::Event;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

const FLUSH_THRESHOLD: usize = 100;
const FLUSH_INTERVAL: Duration = Duration::from_secs(5);
const MAX_BAK_FILES: u32 = 3;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalEntry {
    pub seq: u64,
    pub event: Event,
}

/// Append-only event log backed by a single file.
pub struct Wal {
    path: PathBuf,
    file: File,
    write_seq: u64,
    processed_seq: u64,
    unprocessed_cursor: u64,
    pending_since_flush: usize,
    last_flush: Instant,
}

impl Wal {
    /// Open (creating if absent) the WAL at `path`. `processed_seq` is the
    /// sequence number already folded into a snapshot; replay resumes after
    /// it. Corrupt trailing lines are rotated into `.bak`/`.bak.N` files and
    /// dropped rather than causing the open to fail.
    pub fn open(path: impl AsRef<Path>, processed_seq: u64) -> Result<Self, WalError> {
        let path = path.as_ref().to_path_buf();
        let (valid_entries, had_corruption) = Self::read_valid_entries(&path)?;

        if had_corruption {
            Self::quarantine(&path)?;
            let mut file = OpenOptions::new().create(true).write(true).truncate(true).open(&path)?;
            for entry in &valid_entries {
                let line = serde_json::to_string(entry)?;
                writeln!(file, "{line}")?;
            }
            file.flush()?;
        }

        let write_seq = valid_entries.last().map(|e| e.seq).unwrap_or(0);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            file,
            write_seq,
            processed_seq,
            unprocessed_cursor: processed_seq,
            pending_since_flush: 0,
            last_flush: Instant::now(),
        })
    }

    fn read_valid_entries(path: &Path) -> Result<(Vec<WalEntry>, bool), WalError> {
        if !path.exists() {
            return Ok((Vec::new(), false));
        }
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();
        let mut corrupt = false;
        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => {
                    corrupt = true;
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<WalEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(_) => {
                    corrupt = true;
                    break;
                }
            }
        }
        Ok((entries, corrupt))
    }

    fn quarantine(path: &Path) -> Result<(), WalError> {
        let bak = |n: u32| {
            if n == 1 {
                path.with_extension("bak")
            } else {
                path.with_extension(format!("bak.{n}"))
            }
        };
        let oldest = bak(MAX_BAK_FILES);
        if oldest.exists() {
            let _ = fs::remove_file(&oldest);
        }
        for n in (1..MAX_BAK_FILES).rev() {
            let src = bak(n);
            if src.exists() {
                let _ = fs::rename(&src, bak(n + 1));
            }
        }
        fs::rename(path, bak(1))?;
        Ok(())
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }

    /// Append `event`, returning its assigned sequence number. Does not
    /// fsync — see [`Wal::flush`] / [`Wal::needs_flush`].
    pub fn append(&mut self, event: &Event) -> Result<u64, WalError> {
        self.write_seq += 1;
        let entry = WalEntry { seq: self.write_seq, event: event.clone() };
        let line = serde_json::to_string(&entry)?;
        writeln!(self.file, "{line}")?;
        self.pending_since_flush += 1;
        Ok(entry.seq)
    }

    pub fn flush(&mut self) -> Result<(), WalError> {
        self.file.flush()?;
        self.file.sync_data()?;
        self.pending_since_flush = 0;
        self.last_flush = Instant::now();
        Ok(())
    }

    pub fn needs_flush(&self) -> bool {
        self.pending_since_flush >= FLUSH_THRESHOLD || self.last_flush.elapsed() >= FLUSH_INTERVAL
    }

    /// Read and return the next unreplayed entry without advancing
    /// `processed_seq` (the caller does that via [`Wal::mark_processed`]
    /// once the event has been folded into state). Returns `None`, not an
    /// error, if the next line is corrupt or missing.
    pub fn next_unprocessed(&mut self) -> Result<Option<WalEntry>, WalError> {
        let entries = self.read_all()?;
        let next = entries.into_iter().find(|e| e.seq > self.unprocessed_cursor);
        if let Some(ref entry) = next {
            self.unprocessed_cursor = entry.seq;
        }
        Ok(next)
    }

    pub fn mark_processed(&mut self, seq: u64) {
        self.processed_seq = seq;
    }

    pub fn entries_after(&self, seq: u64) -> Result<Vec<WalEntry>, WalError> {
        Ok(self.read_all()?.into_iter().filter(|e| e.seq > seq).collect())
    }

    /// Rewrite the file keeping only entries with `seq >= floor`, used after
    /// a snapshot makes earlier entries redundant.
    pub fn truncate_before(&mut self, floor: u64) -> Result<(), WalError> {
        let keep: Vec<WalEntry> = self.read_all()?.into_iter().filter(|e| e.seq >= floor).collect();
        let mut file = OpenOptions::new().create(true).write(true).truncate(true).open(&self.path)?;
        for entry in &keep {
            let line = serde_json::to_string(entry)?;
            writeln!(file, "{line}")?;
        }
        file.flush()?;
        drop(file);
        self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<WalEntry>, WalError> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(0))?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        let mut out = Vec::new();
        for line in buf.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<WalEntry>(line) {
                Ok(entry) => out.push(entry),
                Err(_) => break,
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_event(tag: &str) -> Event {
        Event::CredentialLoginOutcomeRecorded {
            id: lc_core::CredentialId::new(),
            outcome: tag.to_string(),
            at_ms: 0,
        }
    }

    #[test]
    fn open_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");
        let wal = Wal::open(&path, 0).unwrap();
        assert!(path.exists());
        assert_eq!(wal.write_seq(), 0);
        assert_eq!(wal.processed_seq(), 0);
    }

    #[test]
    fn append_and_flush() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");
        let mut wal = Wal::open(&path, 0).unwrap();
        let seq1 = wal.append(&test_event("a")).unwrap();
        let seq2 = wal.append(&test_event("b")).unwrap();
        assert_eq!(seq1, 1);
        assert_eq!(seq2, 2);
        wal.flush().unwrap();
        assert!(fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn next_unprocessed_walks_forward() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");
        let mut wal = Wal::open(&path, 0).unwrap();
        wal.append(&test_event("a")).unwrap();
        wal.append(&test_event("b")).unwrap();
        let e1 = wal.next_unprocessed().unwrap().unwrap();
        assert_eq!(e1.seq, 1);
        let e2 = wal.next_unprocessed().unwrap().unwrap();
        assert_eq!(e2.seq, 2);
        assert!(wal.next_unprocessed().unwrap().is_none());
    }

    #[test]
    fn reopen_resumes_after_processed_seq() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");
        {
            let mut wal = Wal::open(&path, 0).unwrap();
            wal.append(&test_event("a")).unwrap();
            wal.append(&test_event("b")).unwrap();
            wal.append(&test_event("c")).unwrap();
            wal.flush().unwrap();
        }
        let mut wal = Wal::open(&path, 2).unwrap();
        let entry = wal.next_unprocessed().unwrap().unwrap();
        assert_eq!(entry.seq, 3);
        assert!(wal.next_unprocessed().unwrap().is_none());
    }

    #[test]
    fn truncate_before_keeps_floor_and_after() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");
        let mut wal = Wal::open(&path, 0).unwrap();
        wal.append(&test_event("a")).unwrap();
        wal.append(&test_event("b")).unwrap();
        wal.append(&test_event("c")).unwrap();
        wal.flush().unwrap();
        wal.truncate_before(2).unwrap();
        let entries = wal.entries_after(0).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].seq, 2);
        assert_eq!(entries[1].seq, 3);
    }

    #[test]
    fn needs_flush_threshold() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");
        let mut wal = Wal::open(&path, 0).unwrap();
        assert!(!wal.needs_flush());
        for i in 0..101 {
            wal.append(&test_event(&format!("e{i}"))).unwrap();
        }
        assert!(wal.needs_flush());
    }

    #[test]
    fn open_corrupt_wal_quarantines_and_preserves_valid_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");
        {
            let mut wal = Wal::open(&path, 0).unwrap();
            wal.append(&test_event("a")).unwrap();
            wal.append(&test_event("b")).unwrap();
            wal.flush().unwrap();
        }
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(b"not-valid-json\n").unwrap();
        }
        let wal = Wal::open(&path, 0).unwrap();
        assert_eq!(wal.write_seq(), 2);
        assert!(path.with_extension("bak").exists());
        let entries = wal.entries_after(0).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn entries_after_stops_at_corruption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");
        let wal = Wal::open(&path, 0).unwrap();
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            let line = serde_json::to_string(&WalEntry { seq: 1, event: test_event("a") }).unwrap();
            writeln!(f, "{line}").unwrap();
            f.write_all(b"garbage\n").unwrap();
        }
        let entries = wal.entries_after(0).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].seq, 1);
    }
}
