//! # Event Bus System
//!
//! Typed, ordered notifications from a sync run to whoever is watching it
//! (a GUI progress bar, a log pane, a CLI printer), carried over
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: `CoreEvent` wraps one enum per concern
//!   (`SyncEvent`, `ConflictEvent`, `TransferEvent`)
//! - **EventBus**: cloneable sender side; emitting never blocks
//! - **EventStream**: receiver wrapper with an optional predicate
//!
//! A run emits every event from its own task, so subscribers observe them
//! in emission order. The last event of every run is exactly one of
//! `SyncEvent::Completed`, `SyncEvent::Cancelled` or `SyncEvent::Failed`.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Sync(SyncEvent::Progress {
//!         job_id: "job-1".to_string(),
//!         percent: 10,
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Sync in progress");
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that fall further behind than this receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Run lifecycle, progress and user-facing messages
    Sync(SyncEvent),
    /// Conflict adjudication
    Conflict(ConflictEvent),
    /// Per-item transfer outcomes
    Transfer(TransferEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Conflict(e) => e.description(),
            CoreEvent::Transfer(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Transfer(TransferEvent::ItemFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::Cancelled { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::Started { .. })
            | CoreEvent::Sync(SyncEvent::Completed { .. })
            | CoreEvent::Sync(SyncEvent::Log { .. })
            | CoreEvent::Conflict(_) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Whether this event ends a run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CoreEvent::Sync(
                SyncEvent::Completed { .. } | SyncEvent::Cancelled { .. } | SyncEvent::Failed { .. }
            )
        )
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Sync Events
// ============================================================================

/// Events describing the lifecycle of one sync run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// A run has been accepted and is about to scan.
    Started {
        job_id: String,
        /// Left folder being reconciled.
        target_folder_id: String,
    },
    /// The run entered a new phase (e.g. "scanning_left", "transferring").
    PhaseChanged { job_id: String, phase: String },
    /// Overall progress, 0-100. Scanning and reconciling use 0-50,
    /// transfers use 50-100.
    Progress { job_id: String, percent: u8 },
    /// Short status line suitable for a status bar.
    Status { job_id: String, message: String },
    /// Detailed log line suitable for a log pane.
    Log { job_id: String, message: String },
    /// The run finished every phase.
    Completed {
        job_id: String,
        uploads_left_to_right: u64,
        downloads_right_to_left: u64,
        conflicts_resolved: u64,
        errors: u64,
        duration_secs: u64,
    },
    /// The run stopped early on request; finished transfers stand.
    Cancelled {
        job_id: String,
        uploads_left_to_right: u64,
        downloads_right_to_left: u64,
        conflicts_resolved: u64,
        errors: u64,
    },
    /// The run aborted on an unrecoverable error.
    Failed {
        job_id: String,
        message: String,
        errors: u64,
    },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Sync started",
            SyncEvent::PhaseChanged { .. } => "Sync phase changed",
            SyncEvent::Progress { .. } => "Sync in progress",
            SyncEvent::Status { .. } => "Sync status",
            SyncEvent::Log { .. } => "Sync log",
            SyncEvent::Completed { .. } => "Sync completed successfully",
            SyncEvent::Cancelled { .. } => "Sync cancelled",
            SyncEvent::Failed { .. } => "Sync failed",
        }
    }
}

// ============================================================================
// Conflict Events
// ============================================================================

/// Events emitted while same-named items with diverging dates are adjudicated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ConflictEvent {
    /// Conflicts were found and are about to be presented.
    Detected { job_id: String, count: u64 },
    /// One conflict received a decision ("same", "different" or "cancel").
    Resolved {
        job_id: String,
        name: String,
        decision: String,
    },
}

impl ConflictEvent {
    fn description(&self) -> &str {
        match self {
            ConflictEvent::Detected { .. } => "Conflicts detected",
            ConflictEvent::Resolved { .. } => "Conflict resolved",
        }
    }
}

// ============================================================================
// Transfer Events
// ============================================================================

/// Direction of a single item transfer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransferDirection {
    /// Folder store to media library (an upload)
    LeftToRight,
    /// Media library to folder store (a download)
    RightToLeft,
}

impl TransferDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferDirection::LeftToRight => "left_to_right",
            TransferDirection::RightToLeft => "right_to_left",
        }
    }
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-item transfer outcomes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum TransferEvent {
    ItemSucceeded {
        job_id: String,
        name: String,
        direction: TransferDirection,
        /// Identifier assigned by the destination store.
        new_id: String,
    },
    ItemFailed {
        job_id: String,
        name: String,
        direction: TransferDirection,
        message: String,
    },
}

impl TransferEvent {
    fn description(&self) -> &str {
        match self {
            TransferEvent::ItemSucceeded { .. } => "Item transferred",
            TransferEvent::ItemFailed { .. } => "Item transfer failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for broadcasting events to multiple subscribers.
///
/// Cloning an `EventBus` yields another handle to the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// A zero capacity is raised to one, the smallest buffer broadcast accepts.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error when nobody is subscribed. Publishers normally ignore that
    /// error with `.ok()`.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Creates a new subscriber wrapped in an [`EventStream`].
    pub fn stream(&self) -> EventStream {
        EventStream::new(self.subscribe())
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus};
///
/// let event_bus = EventBus::default();
/// let transfers = event_bus
///     .stream()
///     .filter(|event| matches!(event, CoreEvent::Transfer(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next matching event.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once every sender is gone.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Receives the next matching event without waiting.
    ///
    /// Returns `None` if no matching event is buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    /// Drains every buffered matching event.
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        while let Some(Ok(event)) = self.try_recv() {
            events.push(event);
        }
        events
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
