//! # Transfer Executor
//!
//! Copies every left-only item to the media library, then every right-only
//! item into the target folder. Items go strictly one at a time.
//!
//! ## Per item
//!
//! 1. Announce the item in a status event.
//! 2. Create a private scratch directory under the configured scratch root.
//! 3. Download the item into it from the source store.
//! 4. Upload the staged file to the destination store.
//! 5. Drop the scratch directory, on success and on failure alike.
//!
//! A failed item is counted in `errors`, logged with its name, and the run
//! moves on. Cancellation is checked before each item; an item already in
//! flight always runs to completion.
//!
//! Progress after each item is `50 + 50 * done / total`.

use crate::descriptor::ItemDescriptor;
use crate::job::RunStats;
use crate::reporter::RunReporter;
use crate::{Result, SyncError};
use bridge_traits::storage::{FolderStore, MediaLibrary};
use core_runtime::events::TransferDirection;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Progress reported once scanning, reconciling and adjudication are done
pub const TRANSFER_PROGRESS_START: u8 = 50;

const SCRATCH_PREFIX: &str = "media-sync-";

/// Items to copy in each direction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferPlan {
    /// Left-only items, uploaded to the media library
    pub left_to_right: Vec<ItemDescriptor>,
    /// Right-only items, downloaded into the target folder
    pub right_to_left: Vec<ItemDescriptor>,
}

impl TransferPlan {
    pub fn total(&self) -> usize {
        self.left_to_right.len() + self.right_to_left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Result of executing a plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Transfer counters (`conflicts_resolved` is always zero here)
    pub stats: RunStats,
    /// Items attempted, successful or not
    pub attempted: usize,
    /// Stopped early because cancellation was requested
    pub cancelled: bool,
}

/// Progress for `done` of `total` transfer units, in the 50-100 range
pub fn transfer_progress(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let span = u64::from(100 - TRANSFER_PROGRESS_START);
    let scaled = span * done.min(total) as u64 / total as u64;
    TRANSFER_PROGRESS_START + scaled as u8
}

/// Await a store call, bounded by `limit` when set
pub(crate) async fn with_timeout<T, F>(limit: Option<Duration>, call: F) -> Result<T>
where
    F: Future<Output = bridge_traits::error::Result<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| SyncError::Timeout(limit.as_secs()))?
            .map_err(SyncError::from),
        None => call.await.map_err(SyncError::from),
    }
}

/// Executes a [`TransferPlan`] against both stores
pub struct TransferExecutor {
    left: Arc<dyn FolderStore>,
    right: Arc<dyn MediaLibrary>,
    target_folder_id: String,
    scratch_root: PathBuf,
    call_timeout: Option<Duration>,
}

impl TransferExecutor {
    pub fn new(
        left: Arc<dyn FolderStore>,
        right: Arc<dyn MediaLibrary>,
        target_folder_id: impl Into<String>,
        scratch_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            left,
            right,
            target_folder_id: target_folder_id.into(),
            scratch_root: scratch_root.into(),
            call_timeout: None,
        }
    }

    /// Bound every download and upload call
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Run the plan.
    ///
    /// # Errors
    ///
    /// Only when the scratch root cannot be created. Item failures are
    /// counted in the outcome instead.
    #[instrument(skip_all, fields(job_id = %reporter.job_id(), total = plan.total()))]
    pub async fn execute(
        &self,
        plan: &TransferPlan,
        reporter: &RunReporter,
        cancellation_token: &CancellationToken,
    ) -> Result<TransferOutcome> {
        let total = plan.total();
        let mut outcome = TransferOutcome::default();

        if total == 0 {
            reporter.progress(100);
            return Ok(outcome);
        }

        tokio::fs::create_dir_all(&self.scratch_root).await?;

        let units = plan
            .left_to_right
            .iter()
            .map(|item| (TransferDirection::LeftToRight, item))
            .chain(
                plan.right_to_left
                    .iter()
                    .map(|item| (TransferDirection::RightToLeft, item)),
            );

        for (direction, item) in units {
            if cancellation_token.is_cancelled() {
                info!(
                    attempted = outcome.attempted,
                    remaining = total - outcome.attempted,
                    "Transfer stopped by cancellation"
                );
                outcome.cancelled = true;
                return Ok(outcome);
            }

            reporter.status(describe_in_flight(direction, &item.name));
            match self.transfer_one(direction, item).await {
                Ok(new_id) => {
                    match direction {
                        TransferDirection::LeftToRight => outcome.stats.uploads_left_to_right += 1,
                        TransferDirection::RightToLeft => {
                            outcome.stats.downloads_right_to_left += 1
                        }
                    }
                    debug!(name = %item.name, %direction, %new_id, "Transferred item");
                    reporter.log(describe_success(direction, &item.name));
                    reporter.item_succeeded(&item.name, direction, &new_id);
                }
                Err(e) => {
                    outcome.stats.errors += 1;
                    warn!(name = %item.name, %direction, error = %e, "Transfer failed");
                    reporter.log(format!("Error transferring {}: {}", item.name, e));
                    reporter.item_failed(&item.name, direction, &e.to_string());
                }
            }

            outcome.attempted += 1;
            reporter.progress(transfer_progress(outcome.attempted, total));
        }

        Ok(outcome)
    }

    async fn transfer_one(&self, direction: TransferDirection, item: &ItemDescriptor) -> Result<String> {
        // Removed with its contents when dropped, whichever way this returns.
        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(&self.scratch_root)?;
        let staged = scratch.path().join(scratch_file_name(&item.name));

        match direction {
            TransferDirection::LeftToRight => {
                self.stage(self.left.download(&item.id, &staged), &staged)
                    .await?;
                with_timeout(self.call_timeout, self.right.upload(&staged, &item.name)).await
            }
            TransferDirection::RightToLeft => {
                self.stage(self.right.download(&item.id, &staged), &staged)
                    .await?;
                with_timeout(
                    self.call_timeout,
                    self.left
                        .upload(&staged, &item.name, &self.target_folder_id),
                )
                .await
            }
        }
    }

    async fn stage<F>(&self, download: F, staged: &Path) -> Result<()>
    where
        F: Future<Output = bridge_traits::error::Result<u64>>,
    {
        let bytes = with_timeout(self.call_timeout, download).await?;
        debug!(bytes, file = %scratch_display(staged), "Staged item");
        Ok(())
    }
}

fn describe_in_flight(direction: TransferDirection, name: &str) -> String {
    match direction {
        TransferDirection::LeftToRight => format!("Uploading {} to media library...", name),
        TransferDirection::RightToLeft => format!("Downloading {} to folder store...", name),
    }
}

fn describe_success(direction: TransferDirection, name: &str) -> String {
    match direction {
        TransferDirection::LeftToRight => format!("Uploaded {} to media library", name),
        TransferDirection::RightToLeft => format!("Downloaded {} to folder store", name),
    }
}

/// File name for the staged copy; separators are replaced so the file
/// always lands directly inside its scratch directory.
fn scratch_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "item".to_string(),
        _ => cleaned,
    }
}

fn scratch_display(path: &Path) -> String {
    core_runtime::logging::strip_path(&path.to_string_lossy()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_progress_range() {
        assert_eq!(transfer_progress(0, 0), 100);
        assert_eq!(transfer_progress(0, 4), 50);
        assert_eq!(transfer_progress(1, 4), 62);
        assert_eq!(transfer_progress(2, 4), 75);
        assert_eq!(transfer_progress(4, 4), 100);
        assert_eq!(transfer_progress(9, 4), 100);
    }

    #[test]
    fn test_scratch_file_name() {
        assert_eq!(scratch_file_name("IMG_1.jpg"), "IMG_1.jpg");
        assert_eq!(scratch_file_name("../etc/passwd"), ".._etc_passwd");
        assert_eq!(scratch_file_name("a\\b.png"), "a_b.png");
        assert_eq!(scratch_file_name(""), "item");
        assert_eq!(scratch_file_name(".."), "item");
    }

    #[test]
    fn test_plan_total() {
        let plan = TransferPlan::default();
        assert!(plan.is_empty());
    }

    #[tokio::test]
    async fn test_with_timeout_maps_elapsed_to_timeout_error() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, bridge_traits::error::BridgeError>(1u64)
        };

        let result = with_timeout(Some(Duration::from_millis(10)), slow).await;
        assert!(matches!(result, Err(SyncError::Timeout(0))));

        let fast = async { Ok::<_, bridge_traits::error::BridgeError>(7u64) };
        assert_eq!(with_timeout(None, fast).await.unwrap(), 7);
    }
}
