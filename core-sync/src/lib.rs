//! # Media Sync Engine
//!
//! Reconciles the media of one folder in a hierarchical store with a flat
//! media library, then copies whatever exists on only one side to the other.
//!
//! ## Overview
//!
//! A run goes through these steps:
//! - Listing the target folder via `FolderStore` and keeping media files only
//! - Listing every item via `MediaLibrary`
//! - Normalizing both sides into `ItemDescriptor`s and indexing them by
//!   case-insensitive name
//! - Classifying each name as matched, left-only, right-only or conflicting
//!   (same name, creation times further apart than the tolerance)
//! - Asking a `ConflictAdjudicator` about each conflict
//! - Uploading left-only items and downloading right-only ones through a
//!   scratch directory
//!
//! Nothing is ever deleted or overwritten on either side.
//!
//! ## Components
//!
//! - **Descriptors** (`descriptor`): Store-neutral item records
//! - **Name Index** (`index`): Case-insensitive name lookup with duplicate handling
//! - **Reconciler** (`reconciler`): Four-way classification of both indexes
//! - **Conflict Resolver** (`conflict_resolver`): Decisions, policies and interactive prompts
//! - **Conflict Orchestrator** (`conflict_resolution_orchestrator`): Applies decisions in order
//! - **Transfer Executor** (`transfer`): Sequential copy of one-sided items
//! - **Run State Machine** (`job`): Run lifecycle with validated transitions
//! - **Sync Coordinator** (`coordinator`): Drives a run end to end

pub mod config;
pub mod conflict_resolution_orchestrator;
pub mod conflict_resolver;
pub mod coordinator;
pub mod descriptor;
pub mod error;
pub mod index;
pub mod job;
pub mod reconciler;
pub mod reporter;
pub mod transfer;

pub use config::SyncConfig;
pub use conflict_resolution_orchestrator::{
    ConflictResolutionOrchestrator, ConflictResolutionStats, ResolutionHalt,
};
pub use conflict_resolver::{
    ChannelAdjudicator, ConflictAdjudicator, ConflictDecision, ConflictPolicy, ConflictPrompt,
    ConflictSummary, SideSummary,
};
pub use coordinator::{SyncCoordinator, SyncCoordinatorBuilder, SyncHandle};
pub use descriptor::{ItemDescriptor, ItemDetails, StoreSide};
pub use error::{Result, SyncError};
pub use index::{index, NameIndex, NameKey};
pub use job::{RunState, RunStats, SyncJobId, SyncRun};
pub use reconciler::{
    reconcile, ConflictPair, MatchOutcome, Reconciliation, ReconciliationCounts,
};
pub use reporter::RunReporter;
pub use transfer::{TransferExecutor, TransferOutcome, TransferPlan};
