//! # Sync Run State Machine
//!
//! Tracks one reconciliation run from start to finish with validated
//! state transitions.
//!
//! ## State Machine
//!
//! ```text
//! Idle → ScanningLeft → ScanningRight → Reconciling ─┬→ ResolvingConflicts ─┐
//!                                                    └──────────────────────┴→ Transferring → Completed
//!
//! any non-terminal state → Cancelled
//! any non-terminal state → Failed
//! ```
//!
//! `Completed`, `Cancelled` and `Failed` are terminal. Nothing here is
//! persisted; a `SyncRun` lives for exactly one `start_sync` call.

use crate::{Result, SyncError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncJobId(Uuid);

impl SyncJobId {
    /// Create a new random sync job ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a sync job ID from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self> {
        Ok(Self(
            Uuid::parse_str(s).map_err(|e| SyncError::InvalidJobId(e.to_string()))?,
        ))
    }
}

impl Default for SyncJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SyncJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SyncJobId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<SyncJobId> for Uuid {
    fn from(id: SyncJobId) -> Self {
        id.0
    }
}

// ============================================================================
// Run State
// ============================================================================

/// Phase a run is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// No run has started yet
    #[default]
    Idle,
    ScanningLeft,
    ScanningRight,
    Reconciling,
    ResolvingConflicts,
    Transferring,
    Completed,
    Cancelled,
    Failed,
}

impl RunState {
    /// Check if this state ends a run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Cancelled | RunState::Failed
        )
    }

    /// Check if a run in this state is doing work
    pub fn is_active(&self) -> bool {
        !self.is_terminal() && *self != RunState::Idle
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::ScanningLeft => "scanning_left",
            RunState::ScanningRight => "scanning_right",
            RunState::Reconciling => "reconciling",
            RunState::ResolvingConflicts => "resolving_conflicts",
            RunState::Transferring => "transferring",
            RunState::Completed => "completed",
            RunState::Cancelled => "cancelled",
            RunState::Failed => "failed",
        }
    }
}

impl FromStr for RunState {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(RunState::Idle),
            "scanning_left" => Ok(RunState::ScanningLeft),
            "scanning_right" => Ok(RunState::ScanningRight),
            "reconciling" => Ok(RunState::Reconciling),
            "resolving_conflicts" => Ok(RunState::ResolvingConflicts),
            "transferring" => Ok(RunState::Transferring),
            "completed" => Ok(RunState::Completed),
            "cancelled" => Ok(RunState::Cancelled),
            "failed" => Ok(RunState::Failed),
            _ => Err(SyncError::InvalidState(s.to_string())),
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Counters for one run, reset at the start of every run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Items copied from the folder store to the media library
    pub uploads_left_to_right: u64,
    /// Items copied from the media library to the folder store
    pub downloads_right_to_left: u64,
    /// Conflicts a decision was obtained for
    pub conflicts_resolved: u64,
    /// Failed item transfers plus run-level failures
    pub errors: u64,
}

impl RunStats {
    /// Successful transfers in both directions
    pub fn total_transfers(&self) -> u64 {
        self.uploads_left_to_right + self.downloads_right_to_left
    }
}

// ============================================================================
// Sync Run Entity
// ============================================================================

/// One reconciliation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRun {
    pub id: SyncJobId,
    /// Folder-store folder being reconciled
    pub target_folder_id: String,
    pub state: RunState,
    pub stats: RunStats,
    /// Error message if failed
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SyncRun {
    /// Create a run in the `Idle` state
    pub fn new(target_folder_id: impl Into<String>) -> Self {
        Self {
            id: SyncJobId::new(),
            target_folder_id: target_folder_id.into(),
            state: RunState::Idle,
            stats: RunStats::default(),
            error_message: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Move to the next non-terminal phase
    ///
    /// # Errors
    ///
    /// Returns an error if the transition skips or reverses a phase, or if
    /// `to` is terminal (use `complete`, `cancel` or `fail`).
    pub fn enter(&mut self, to: RunState, at: DateTime<Utc>) -> Result<()> {
        if to.is_terminal() {
            return Err(SyncError::InvalidStateTransition {
                from: self.state.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: "Terminal states are entered through complete, cancel or fail"
                    .to_string(),
            });
        }
        self.validate_transition(to)?;
        if self.state == RunState::Idle {
            self.started_at = Some(at);
        }
        self.state = to;
        Ok(())
    }

    /// Mark the run as completed
    ///
    /// # Errors
    ///
    /// Returns an error unless the run is transferring
    pub fn complete(mut self, stats: RunStats, at: DateTime<Utc>) -> Result<Self> {
        self.validate_transition(RunState::Completed)?;
        self.state = RunState::Completed;
        self.stats = stats;
        self.finished_at = Some(at);
        Ok(self)
    }

    /// Mark the run as cancelled; finished transfers stand
    ///
    /// # Errors
    ///
    /// Returns an error if the run is already terminal
    pub fn cancel(mut self, stats: RunStats, at: DateTime<Utc>) -> Result<Self> {
        self.validate_transition(RunState::Cancelled)?;
        self.state = RunState::Cancelled;
        self.stats = stats;
        self.finished_at = Some(at);
        Ok(self)
    }

    /// Mark the run as failed
    ///
    /// # Errors
    ///
    /// Returns an error if the run is already terminal
    pub fn fail(mut self, message: String, stats: RunStats, at: DateTime<Utc>) -> Result<Self> {
        self.validate_transition(RunState::Failed)?;
        self.state = RunState::Failed;
        self.stats = stats;
        self.error_message = Some(message);
        self.finished_at = Some(at);
        Ok(self)
    }

    /// Get the duration of the run in seconds
    ///
    /// Returns None if the run hasn't started or finished yet
    pub fn duration_secs(&self) -> Option<u64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_seconds().max(0) as u64),
            _ => None,
        }
    }

    fn validate_transition(&self, to: RunState) -> Result<()> {
        use RunState::*;

        let valid = match (self.state, to) {
            (Idle, ScanningLeft) => true,
            (ScanningLeft, ScanningRight) => true,
            (ScanningRight, Reconciling) => true,
            (Reconciling, ResolvingConflicts) => true,
            (Reconciling, Transferring) => true,
            (ResolvingConflicts, Transferring) => true,
            (Transferring, Completed) => true,

            // Terminal states cannot transition
            (Completed | Cancelled | Failed, _) => false,

            (_, Cancelled) => true,
            (_, Failed) => true,

            _ => false,
        };

        if !valid {
            return Err(SyncError::InvalidStateTransition {
                from: self.state.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!(
                    "Cannot transition from {} to {}",
                    self.state.as_str(),
                    to.as_str()
                ),
            });
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
