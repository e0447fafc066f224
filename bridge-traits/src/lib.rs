//! # Host Bridge Traits
//!
//! Seams between the sync engine and everything it does not own.
//!
//! ## Overview
//!
//! The engine never talks to a network, a remote API or a host logger
//! directly. Each of those capabilities is a trait defined here and injected
//! at construction time, so hosts can swap transports and tests can swap in
//! fakes.
//!
//! ## Traits
//!
//! ### Remote stores
//! - [`FolderStore`](storage::FolderStore) - Hierarchical store (left side)
//! - [`MediaLibrary`](storage::MediaLibrary) - Flat media library (right side)
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP used by the store connectors
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! convert their own failures into it and keep the message actionable (which
//! item, which status code).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`; the engine shares them behind
//! `Arc<dyn _>` with the task that runs a sync.

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use storage::{FolderStore, MediaItem, MediaKind, MediaLibrary, RemoteFile};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, SystemClock};
