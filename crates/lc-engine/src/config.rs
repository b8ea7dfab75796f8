// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: a TOML file plus environment overrides, following
//! the same `serde`-over-`toml` posture the runbook/config loaders use
//! elsewhere in the workspace.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

/// Engine tuning knobs. Every field has a sane default so an empty/missing
/// config file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub base_dir: PathBuf,
    pub tick_interval_secs: u64,
    pub worker_concurrency: usize,
    pub job_timeout_secs: u64,
    pub auto_suspend_threshold: u32,
    pub stuck_run_sweep_secs: u64,
    /// A `PENDING` job older than this with no matching entry in the
    /// broker gets re-enqueued at startup (crash between the DB write and
    /// the enqueue call in `createJob`).
    pub stale_pending_job_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            tick_interval_secs: 60,
            worker_concurrency: 4,
            job_timeout_secs: 600,
            auto_suspend_threshold: crate::admin_gate::AUTO_SUSPEND_THRESHOLD,
            stuck_run_sweep_secs: 60,
            stale_pending_job_secs: 5 * 60,
        }
    }
}

impl DaemonConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    pub fn stuck_run_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.stuck_run_sweep_secs)
    }

    pub fn stale_pending_job_ms(&self) -> u64 {
        self.stale_pending_job_secs * 1000
    }

    pub fn wal_path(&self) -> PathBuf {
        self.base_dir.join("wal.jsonl")
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.base_dir.join("snapshot.json")
    }
}

fn default_base_dir() -> PathBuf {
    std::env::var_os("LC_STATE_DIR")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("XDG_STATE_HOME").map(|p| PathBuf::from(p).join("lc-engine")))
        .or_else(|| std::env::var_os("HOME").map(|p| PathBuf::from(p).join(".local/state/lc-engine")))
        .unwrap_or_else(|| PathBuf::from(".lc-engine"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = DaemonConfig::load(Path::new("/nonexistent/lc-engine.toml")).unwrap();
        assert_eq!(cfg.tick_interval_secs, 60);
    }

    #[test]
    fn parses_overrides_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lc-engine.toml");
        std::fs::write(&path, "tick_interval_secs = 30\nworker_concurrency = 8\n").unwrap();
        let cfg = DaemonConfig::load(&path).unwrap();
        assert_eq!(cfg.tick_interval_secs, 30);
        assert_eq!(cfg.worker_concurrency, 8);
    }
}
