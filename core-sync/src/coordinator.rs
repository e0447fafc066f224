//! # Sync Coordinator
//!
//! Runs one reconciliation between a folder store and a media library.
//!
//! ## Overview
//!
//! The `SyncCoordinator` owns the collaborators and drives every phase of a
//! run in strict sequence:
//!
//! 1. Scan the target folder of the folder store (media only)
//! 2. Scan the media library
//! 3. Index both sides by name and reconcile
//! 4. Adjudicate conflicts, if any
//! 5. Transfer left-only and right-only items
//!
//! At most one run is active at a time. `stop()` requests cooperative
//! cancellation: it is observed at every phase boundary, before each conflict
//! and before each transfer, never in the middle of a single transfer.
//!
//! A scan failure aborts the run with `SyncError::Scan`; nothing is
//! transferred from partial data. Individual transfer failures only count
//! as errors.
//!
//! ## Events
//!
//! Progress goes through the [`EventBus`]: 10, 20 and 30 at the start of the
//! scan and reconcile phases, 50 once conflicts are settled, then 50-100
//! across transfers. Every run that got past `start_sync` ends with exactly
//! one `Completed`, `Cancelled` or `Failed` event.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{ConflictPolicy, SyncConfig, SyncCoordinator};
//! use std::sync::Arc;
//!
//! let coordinator = SyncCoordinator::builder()
//!     .config(SyncConfig::default().with_target_folder(folder_id))
//!     .folder_store(Arc::new(drive))
//!     .media_library(Arc::new(photos))
//!     .adjudicator(Arc::new(ConflictPolicy::KeepBoth))
//!     .build()?;
//!
//! let mut events = coordinator.subscribe();
//! let handle = coordinator.start_sync()?;
//! let run = handle.join.await??;
//! println!("{} uploads, {} downloads", run.stats.uploads_left_to_right, run.stats.downloads_right_to_left);
//! ```

use crate::{
    config::SyncConfig,
    conflict_resolution_orchestrator::ConflictResolutionOrchestrator,
    conflict_resolver::ConflictAdjudicator,
    descriptor::{ItemDescriptor, StoreSide},
    index::NameIndex,
    job::{RunState, RunStats, SyncJobId, SyncRun},
    reconciler::reconcile,
    reporter::RunReporter,
    transfer::{with_timeout, TransferExecutor},
    Result, SyncError,
};
use bridge_traits::storage::{FolderStore, MediaLibrary};
use bridge_traits::time::{Clock, SystemClock};
use core_runtime::events::{CoreEvent, EventBus, EventStream, SyncEvent};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// Active run tracking
#[derive(Clone)]
struct ActiveSync {
    job_id: SyncJobId,
    cancellation_token: CancellationToken,
}

/// State shared between the coordinator handle and its run task
#[derive(Default)]
struct SharedState {
    active: Mutex<Option<ActiveSync>>,
    state: Mutex<RunState>,
    stats: Mutex<RunStats>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Releases the active-run slot when a run task ends, however it ends.
///
/// A run that unwinds (a panicking store or adjudicator) or whose future is
/// dropped never reaches its own settle step; the guard then records it as
/// failed and emits the terminal event in its place.
struct ActiveRunGuard {
    shared: Arc<SharedState>,
    event_bus: EventBus,
    job_id: SyncJobId,
    settled: bool,
}

impl ActiveRunGuard {
    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for ActiveRunGuard {
    fn drop(&mut self) {
        if !self.settled {
            let errors = {
                let mut stats = lock(&self.shared.stats);
                stats.errors += 1;
                stats.errors
            };
            *lock(&self.shared.state) = RunState::Failed;
            error!(job_id = %self.job_id, "Sync run aborted");
            self.event_bus
                .emit(CoreEvent::Sync(SyncEvent::Failed {
                    job_id: self.job_id.to_string(),
                    message: "Sync run aborted".to_string(),
                    errors,
                }))
                .ok();
        }

        let mut active = lock(&self.shared.active);
        if active.as_ref().map(|current| current.job_id) == Some(self.job_id) {
            active.take();
        }
    }
}

/// How the phases of a run ended, short of an error
enum RunEnd {
    Completed,
    Cancelled,
}

/// Handle to a run started with [`SyncCoordinator::start_sync`]
#[derive(Debug)]
pub struct SyncHandle {
    pub job_id: SyncJobId,
    /// Resolves to the finished run, or the error that aborted it
    pub join: JoinHandle<Result<SyncRun>>,
}

/// Sync coordinator for orchestrating reconciliation runs
pub struct SyncCoordinator {
    config: Arc<Mutex<SyncConfig>>,
    left: Arc<dyn FolderStore>,
    right: Arc<dyn MediaLibrary>,
    conflict_resolution_orchestrator: Arc<ConflictResolutionOrchestrator>,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
    shared: Arc<SharedState>,
}

impl SyncCoordinator {
    pub fn builder() -> SyncCoordinatorBuilder {
        SyncCoordinatorBuilder::default()
    }

    /// Event bus every run publishes to
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Subscribe to run events
    pub fn subscribe(&self) -> EventStream {
        self.event_bus.stream()
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> SyncConfig {
        lock(&self.config).clone()
    }

    /// Select the folder-store folder to reconcile.
    ///
    /// Takes effect for the next run.
    pub fn set_target_folder(&self, folder_id: impl Into<String>) {
        let folder_id = folder_id.into();
        info!(%folder_id, "Target folder selected");
        lock(&self.config).target_folder_id = Some(folder_id);
    }

    /// Counters of the current run, or of the last one once it ended
    pub fn stats(&self) -> RunStats {
        *lock(&self.shared.stats)
    }

    pub fn state(&self) -> RunState {
        *lock(&self.shared.state)
    }

    pub fn is_sync_active(&self) -> bool {
        lock(&self.shared.active).is_some()
    }

    pub fn active_job_id(&self) -> Option<SyncJobId> {
        lock(&self.shared.active).as_ref().map(|active| active.job_id)
    }

    /// Request cooperative cancellation of the active run.
    ///
    /// Idempotent, callable from any thread; a no-op when nothing runs.
    pub fn stop(&self) {
        if let Some(active) = lock(&self.shared.active).as_ref() {
            if !active.cancellation_token.is_cancelled() {
                info!(job_id = %active.job_id, "Sync stop requested");
            }
            active.cancellation_token.cancel();
        }
    }

    /// Start a run on a background task.
    ///
    /// # Errors
    ///
    /// Fails fast, before any event is emitted, when no target folder is
    /// selected or another run is active.
    #[instrument(skip(self))]
    pub fn start_sync(&self) -> Result<SyncHandle> {
        let (run, config, token) = self.begin_run()?;
        let job_id = run.id;

        let coordinator = self.clone_for_task();
        let join = tokio::spawn(async move { coordinator.execute_run(run, config, token).await });

        info!(%job_id, "Started sync");
        Ok(SyncHandle { job_id, join })
    }

    /// Run to the end on the caller's task.
    ///
    /// Returns the finished run when it completed or was cancelled.
    ///
    /// # Errors
    ///
    /// Same start conditions as [`start_sync`](Self::start_sync), plus any
    /// run-level failure such as `SyncError::Scan`.
    #[instrument(skip(self))]
    pub async fn run_sync(&self) -> Result<SyncRun> {
        let (run, config, token) = self.begin_run()?;
        self.execute_run(run, config, token).await
    }

    /// Validate start conditions and register the run as active
    fn begin_run(&self) -> Result<(SyncRun, SyncConfig, CancellationToken)> {
        let config = self.config();
        let target_folder_id = config
            .target_folder_id
            .clone()
            .ok_or(SyncError::NoTargetFolder)?;

        let run = SyncRun::new(target_folder_id);
        let cancellation_token = CancellationToken::new();

        {
            let mut active = lock(&self.shared.active);
            if let Some(current) = active.as_ref() {
                return Err(SyncError::SyncInProgress {
                    job_id: current.job_id.to_string(),
                });
            }
            *active = Some(ActiveSync {
                job_id: run.id,
                cancellation_token: cancellation_token.clone(),
            });
        }

        *lock(&self.shared.stats) = RunStats::default();
        *lock(&self.shared.state) = RunState::Idle;

        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::Started {
                job_id: run.id.to_string(),
                target_folder_id: run.target_folder_id.clone(),
            }))
            .ok();

        Ok((run, config, cancellation_token))
    }

    /// Clone for background task (all fields are shared handles)
    fn clone_for_task(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            left: Arc::clone(&self.left),
            right: Arc::clone(&self.right),
            conflict_resolution_orchestrator: Arc::clone(&self.conflict_resolution_orchestrator),
            event_bus: self.event_bus.clone(),
            clock: Arc::clone(&self.clock),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Drive the phases, settle the run and emit its terminal event
    #[instrument(skip_all, fields(job_id = %run.id))]
    async fn execute_run(
        &self,
        mut run: SyncRun,
        config: SyncConfig,
        cancellation_token: CancellationToken,
    ) -> Result<SyncRun> {
        let guard = ActiveRunGuard {
            shared: Arc::clone(&self.shared),
            event_bus: self.event_bus.clone(),
            job_id: run.id,
            settled: false,
        };
        let reporter = RunReporter::new(self.event_bus.clone(), run.id);
        let mut stats = RunStats::default();

        reporter.log("Starting synchronization...");
        let outcome = self
            .run_phases(&mut run, &mut stats, &config, &reporter, &cancellation_token)
            .await;

        let now = self.clock.now();
        let job_id = run.id.to_string();
        let result = match outcome {
            Ok(RunEnd::Completed) => run.complete(stats, now).map(|run| {
                reporter.log("Synchronization completed successfully!");
                reporter.status("Sync complete");
                reporter.emit(CoreEvent::Sync(SyncEvent::Completed {
                    job_id,
                    uploads_left_to_right: stats.uploads_left_to_right,
                    downloads_right_to_left: stats.downloads_right_to_left,
                    conflicts_resolved: stats.conflicts_resolved,
                    errors: stats.errors,
                    duration_secs: run.duration_secs().unwrap_or(0),
                }));
                run
            }),
            Ok(RunEnd::Cancelled) => run.cancel(stats, now).map(|run| {
                reporter.log("Synchronization stopped");
                reporter.status("Sync stopped");
                reporter.emit(CoreEvent::Sync(SyncEvent::Cancelled {
                    job_id,
                    uploads_left_to_right: stats.uploads_left_to_right,
                    downloads_right_to_left: stats.downloads_right_to_left,
                    conflicts_resolved: stats.conflicts_resolved,
                    errors: stats.errors,
                }));
                run
            }),
            Err(e) => {
                stats.errors += 1;
                error!(error = %e, "Sync failed");
                reporter.log(format!("Synchronization failed: {}", e));
                reporter.status("Sync failed");
                if let Err(transition) = run.fail(e.to_string(), stats, now) {
                    warn!(error = %transition, "Could not record run failure");
                }
                reporter.emit(CoreEvent::Sync(SyncEvent::Failed {
                    job_id,
                    message: e.to_string(),
                    errors: stats.errors,
                }));
                Err(e)
            }
        };

        *lock(&self.shared.stats) = stats;
        *lock(&self.shared.state) = match &result {
            Ok(run) => run.state,
            Err(_) => RunState::Failed,
        };
        guard.settle();

        result
    }

    /// Record a phase change on the run, the shared state and the bus
    fn enter(&self, run: &mut SyncRun, state: RunState, reporter: &RunReporter) -> Result<()> {
        run.enter(state, self.clock.now())?;
        *lock(&self.shared.state) = state;
        reporter.phase(state);
        Ok(())
    }

    fn publish_stats(&self, stats: &RunStats) {
        *lock(&self.shared.stats) = *stats;
    }

    async fn run_phases(
        &self,
        run: &mut SyncRun,
        stats: &mut RunStats,
        config: &SyncConfig,
        reporter: &RunReporter,
        cancellation_token: &CancellationToken,
    ) -> Result<RunEnd> {
        // Phase 1: folder store
        if cancellation_token.is_cancelled() {
            return Ok(RunEnd::Cancelled);
        }
        info!("Phase 1: Scanning folder store");
        self.enter(run, RunState::ScanningLeft, reporter)?;
        reporter.status("Scanning folder store...");
        reporter.progress(10);
        let left_items = self.scan_left(&run.target_folder_id, config).await?;
        reporter.log(format!("Found {} media files in folder store", left_items.len()));

        // Phase 2: media library
        if cancellation_token.is_cancelled() {
            info!("Sync stopped after scanning folder store");
            return Ok(RunEnd::Cancelled);
        }
        info!("Phase 2: Scanning media library");
        self.enter(run, RunState::ScanningRight, reporter)?;
        reporter.status("Scanning media library...");
        reporter.progress(20);
        let right_items = self.scan_right(config).await?;
        reporter.log(format!("Found {} media items in media library", right_items.len()));

        // Phase 3: reconcile
        if cancellation_token.is_cancelled() {
            info!("Sync stopped after scanning media library");
            return Ok(RunEnd::Cancelled);
        }
        info!("Phase 3: Reconciling");
        self.enter(run, RunState::Reconciling, reporter)?;
        reporter.status("Comparing files...");
        reporter.progress(30);
        let mut reconciliation = reconcile(
            &NameIndex::build(left_items),
            &NameIndex::build(right_items),
            config.tolerance(),
        );
        let counts = reconciliation.counts();
        info!(
            matched = counts.matched,
            left_only = counts.left_only,
            right_only = counts.right_only,
            conflicts = counts.conflicts,
            "Reconciliation complete"
        );
        reporter.log(format!(
            "Comparison results: {} matched, {} only in folder store, {} only in media library, {} conflicts",
            counts.matched, counts.left_only, counts.right_only, counts.conflicts
        ));

        // Phase 4: conflicts
        if cancellation_token.is_cancelled() {
            info!("Sync stopped after reconciling");
            return Ok(RunEnd::Cancelled);
        }
        if reconciliation.has_conflicts() {
            info!("Phase 4: Resolving conflicts");
            self.enter(run, RunState::ResolvingConflicts, reporter)?;
            reporter.status("Resolving conflicts...");
            let resolution = self
                .conflict_resolution_orchestrator
                .resolve(&mut reconciliation, reporter, cancellation_token)
                .await;
            stats.conflicts_resolved = resolution.adjudicated;
            self.publish_stats(stats);

            if resolution.is_cancelled() {
                reporter.log("Sync cancelled by user");
                return Ok(RunEnd::Cancelled);
            }
        }

        // Phase 5: transfers
        if cancellation_token.is_cancelled() {
            return Ok(RunEnd::Cancelled);
        }
        info!("Phase 5: Transferring");
        self.enter(run, RunState::Transferring, reporter)?;
        reporter.progress(50);
        let plan = reconciliation.transfer_plan();
        reporter.status(format!(
            "Transferring {} items ({} to media library, {} to folder store)",
            plan.total(),
            plan.left_to_right.len(),
            plan.right_to_left.len()
        ));

        let executor = TransferExecutor::new(
            Arc::clone(&self.left),
            Arc::clone(&self.right),
            run.target_folder_id.clone(),
            config.scratch_dir(),
        )
        .with_call_timeout(config.transfer_timeout());
        let transfer = executor
            .execute(&plan, reporter, cancellation_token)
            .await?;

        stats.uploads_left_to_right = transfer.stats.uploads_left_to_right;
        stats.downloads_right_to_left = transfer.stats.downloads_right_to_left;
        stats.errors += transfer.stats.errors;
        self.publish_stats(stats);

        if transfer.cancelled {
            Ok(RunEnd::Cancelled)
        } else {
            Ok(RunEnd::Completed)
        }
    }

    /// List and normalize the target folder's media files
    async fn scan_left(&self, folder_id: &str, config: &SyncConfig) -> Result<Vec<ItemDescriptor>> {
        let files = with_timeout(
            config.scan_timeout(),
            self.left.list_folder(folder_id, config.recursive_scan),
        )
        .await
        .map_err(|e| scan_error(StoreSide::Left, e))?;

        Ok(files
            .iter()
            .filter(|file| !file.is_folder() && self.left.is_media(file))
            .map(ItemDescriptor::from_remote_file)
            .collect())
    }

    /// List and normalize every media-library item
    async fn scan_right(&self, config: &SyncConfig) -> Result<Vec<ItemDescriptor>> {
        let items = with_timeout(config.scan_timeout(), self.right.list_all())
            .await
            .map_err(|e| scan_error(StoreSide::Right, e))?;

        Ok(items.iter().map(ItemDescriptor::from_media_item).collect())
    }
}

fn scan_error(side: StoreSide, error: SyncError) -> SyncError {
    SyncError::Scan {
        side,
        message: error.to_string(),
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`SyncCoordinator`]
#[derive(Default)]
pub struct SyncCoordinatorBuilder {
    config: SyncConfig,
    left: Option<Arc<dyn FolderStore>>,
    right: Option<Arc<dyn MediaLibrary>>,
    adjudicator: Option<Arc<dyn ConflictAdjudicator>>,
    event_bus: Option<EventBus>,
    clock: Option<Arc<dyn Clock>>,
}

impl SyncCoordinatorBuilder {
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Left side: the hierarchical store
    pub fn folder_store(mut self, store: Arc<dyn FolderStore>) -> Self {
        self.left = Some(store);
        self
    }

    /// Right side: the flat library
    pub fn media_library(mut self, library: Arc<dyn MediaLibrary>) -> Self {
        self.right = Some(library);
        self
    }

    pub fn adjudicator(mut self, adjudicator: Arc<dyn ConflictAdjudicator>) -> Self {
        self.adjudicator = Some(adjudicator);
        self
    }

    /// Publish to an existing bus instead of creating one
    pub fn event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// # Errors
    ///
    /// `CapabilityMissing` when a store or the adjudicator was not supplied,
    /// `Config` when the configuration does not validate.
    pub fn build(self) -> Result<SyncCoordinator> {
        self.config.validate()?;

        let left = self.left.ok_or_else(|| missing("folder_store"))?;
        let right = self.right.ok_or_else(|| missing("media_library"))?;
        let adjudicator = self.adjudicator.ok_or_else(|| missing("adjudicator"))?;

        let event_bus = self
            .event_bus
            .unwrap_or_else(|| EventBus::new(self.config.event_buffer_size));

        Ok(SyncCoordinator {
            config: Arc::new(Mutex::new(self.config)),
            left,
            right,
            conflict_resolution_orchestrator: Arc::new(ConflictResolutionOrchestrator::new(
                adjudicator,
            )),
            event_bus,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            shared: Arc::new(SharedState::default()),
        })
    }
}

fn missing(capability: &str) -> SyncError {
    SyncError::CapabilityMissing {
        capability: capability.to_string(),
        message: format!("{} must be provided before building the coordinator", capability),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict_resolver::ConflictPolicy;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::storage::{MediaItem, RemoteFile};
    use std::path::Path;

    struct EmptyFolder;

    #[async_trait]
    impl FolderStore for EmptyFolder {
        async fn list_folder(&self, _: &str, _: bool) -> BridgeResult<Vec<RemoteFile>> {
            Ok(Vec::new())
        }
        async fn list_subfolders(&self, _: &str) -> BridgeResult<Vec<RemoteFile>> {
            Ok(Vec::new())
        }
        async fn download(&self, _: &str, _: &Path) -> BridgeResult<u64> {
            Err(BridgeError::NotFound("empty".to_string()))
        }
        async fn upload(&self, _: &Path, _: &str, _: &str) -> BridgeResult<String> {
            Err(BridgeError::NotAvailable("read-only".to_string()))
        }
    }

    struct EmptyLibrary;

    #[async_trait]
    impl MediaLibrary for EmptyLibrary {
        async fn list_all(&self) -> BridgeResult<Vec<MediaItem>> {
            Ok(Vec::new())
        }
        async fn download(&self, _: &str, _: &Path) -> BridgeResult<u64> {
            Err(BridgeError::NotFound("empty".to_string()))
        }
        async fn upload(&self, _: &Path, _: &str) -> BridgeResult<String> {
            Err(BridgeError::NotAvailable("read-only".to_string()))
        }
    }

    fn builder() -> SyncCoordinatorBuilder {
        SyncCoordinator::builder()
            .folder_store(Arc::new(EmptyFolder))
            .media_library(Arc::new(EmptyLibrary))
            .adjudicator(Arc::new(ConflictPolicy::KeepBoth))
    }

    #[test]
    fn test_builder_requires_capabilities() {
        let result = SyncCoordinator::builder()
            .media_library(Arc::new(EmptyLibrary))
            .adjudicator(Arc::new(ConflictPolicy::KeepBoth))
            .build();
        assert!(matches!(
            result,
            Err(SyncError::CapabilityMissing { ref capability, .. }) if capability == "folder_store"
        ));

        let result = SyncCoordinator::builder()
            .folder_store(Arc::new(EmptyFolder))
            .media_library(Arc::new(EmptyLibrary))
            .build();
        assert!(matches!(
            result,
            Err(SyncError::CapabilityMissing { ref capability, .. }) if capability == "adjudicator"
        ));
    }

    #[test]
    fn test_builder_validates_config() {
        let result = builder()
            .config(SyncConfig {
                event_buffer_size: 0,
                ..SyncConfig::default()
            })
            .build();
        assert!(matches!(result, Err(SyncError::Config(_))));
    }

    #[tokio::test]
    async fn test_start_without_target_fails_fast() {
        let coordinator = builder().build().unwrap();
        let mut events = coordinator.subscribe();

        assert!(matches!(
            coordinator.start_sync(),
            Err(SyncError::NoTargetFolder)
        ));
        assert!(!coordinator.is_sync_active());
        assert!(events.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_empty_run_completes() {
        let coordinator = builder().build().unwrap();
        coordinator.set_target_folder("root");

        let run = coordinator.run_sync().await.unwrap();

        assert_eq!(run.state, RunState::Completed);
        assert_eq!(run.stats, RunStats::default());
        assert_eq!(coordinator.state(), RunState::Completed);
        assert!(!coordinator.is_sync_active());
    }

    #[tokio::test]
    async fn test_stop_without_active_run_is_a_no_op() {
        let coordinator = builder().build().unwrap();
        coordinator.stop();
        coordinator.stop();
        assert_eq!(coordinator.state(), RunState::Idle);
    }
}
