//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for media sync:
//! - Logging and tracing infrastructure
//! - Event bus system for run notifications
//! - Shared runtime error type
//!
//! ## Overview
//!
//! Every other crate in the workspace logs through `tracing` and publishes
//! progress through the [`events::EventBus`]. This crate owns both, so the
//! host application wires them up once and every sync run reports the same
//! way.

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
pub use events::{
    ConflictEvent, CoreEvent, EventBus, EventSeverity, EventStream, SyncEvent, TransferDirection,
    TransferEvent,
};
