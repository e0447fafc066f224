//! Sync engine configuration

use crate::{Result, SyncError};
use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Sync engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Folder-store folder to reconcile; also where downloads land
    pub target_folder_id: Option<String>,

    /// Maximum creation-time difference for a same-named pair to match (hours)
    pub tolerance_hours: u32,

    /// Descend into sub-folders of the target folder
    pub recursive_scan: bool,

    /// Directory for scratch files. Defaults to the OS temp dir.
    pub scratch_dir: Option<PathBuf>,

    /// Timeout for each download or upload call (seconds). `None` waits forever.
    pub transfer_timeout_secs: Option<u64>,

    /// Timeout for each store listing (seconds). `None` waits forever.
    pub scan_timeout_secs: Option<u64>,

    /// Capacity of the event bus created by the coordinator builder
    pub event_buffer_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            target_folder_id: None,
            tolerance_hours: 24,
            recursive_scan: true,
            scratch_dir: None,
            transfer_timeout_secs: Some(300),
            scan_timeout_secs: None,
            event_buffer_size: core_runtime::events::DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl SyncConfig {
    pub fn with_target_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.target_folder_id = Some(folder_id.into());
        self
    }

    /// Check the configuration for values the engine cannot run with
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Config` for a zero event buffer or a zero timeout.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(SyncError::Config(
                "event_buffer_size must be greater than zero".to_string(),
            ));
        }
        if self.transfer_timeout_secs == Some(0) {
            return Err(SyncError::Config(
                "transfer_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.scan_timeout_secs == Some(0) {
            return Err(SyncError::Config(
                "scan_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if matches!(&self.target_folder_id, Some(id) if id.trim().is_empty()) {
            return Err(SyncError::Config(
                "target_folder_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tolerance(&self) -> ChronoDuration {
        ChronoDuration::hours(i64::from(self.tolerance_hours))
    }

    pub fn transfer_timeout(&self) -> Option<Duration> {
        self.transfer_timeout_secs.map(Duration::from_secs)
    }

    pub fn scan_timeout(&self) -> Option<Duration> {
        self.scan_timeout_secs.map(Duration::from_secs)
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
