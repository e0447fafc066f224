use bridge_traits::error::BridgeError;
use thiserror::Error;

use crate::descriptor::StoreSide;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to scan {side} store: {message}")]
    Scan { side: StoreSide, message: String },

    #[error("No target folder selected")]
    NoTargetFolder,

    #[error("Sync already in progress (job {job_id})")]
    SyncInProgress { job_id: String },

    #[error("Sync cancelled")]
    Cancelled,

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Invalid job ID: {0}")]
    InvalidJobId(String),

    #[error("Invalid run state: {0}")]
    InvalidState(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Provider error: {0}")]
    Provider(#[from] BridgeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;
