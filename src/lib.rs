//! Facade crate for the media sync workspace.
//!
//! Re-exports the engine and, behind feature flags, the native HTTP client
//! and the Google store connectors, so a host application can depend on
//! `media-sync` alone.
//!
//! - `desktop-shims`: `ReqwestHttpClient`
//! - `google`: `GoogleDriveConnector` and `GooglePhotosConnector`

pub use bridge_traits;
pub use core_runtime;
pub use core_sync;

pub use core_runtime::events::{CoreEvent, EventBus, EventStream};
pub use core_sync::{
    ConflictAdjudicator, ConflictDecision, ConflictPolicy, SyncConfig, SyncCoordinator,
    SyncError,
};

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop;

#[cfg(feature = "google")]
pub use provider_google_drive;

#[cfg(feature = "google")]
pub use provider_google_photos;
