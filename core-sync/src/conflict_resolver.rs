//! # Conflict Adjudication
//!
//! A conflict is a pair of same-named items whose creation times are further
//! apart than the tolerance, or where either time is unknown. Only a human
//! (or a configured policy) can tell whether the two are the same photo.
//!
//! ## Adjudicators
//!
//! - [`ConflictPolicy`]: unattended, answers every conflict the same way.
//! - [`ChannelAdjudicator`]: forwards each pair to a UI task as a
//!   [`ConflictPrompt`] and waits for its reply.
//!
//! Any custom adjudicator implements [`ConflictAdjudicator`]. Calls may take
//! arbitrarily long; the engine awaits them one at a time.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::conflict_resolver::{ChannelAdjudicator, ConflictDecision};
//!
//! let (adjudicator, mut prompts) = ChannelAdjudicator::new(1);
//!
//! tokio::spawn(async move {
//!     while let Some(prompt) = prompts.recv().await {
//!         println!("{}", prompt.summary);
//!         prompt.respond(ConflictDecision::Different);
//!     }
//! });
//! ```

use crate::descriptor::ItemDescriptor;
use crate::SyncError;
use async_trait::async_trait;
use bridge_traits::storage::MediaKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

const UNKNOWN: &str = "Unknown";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// Decision
// ============================================================================

/// Outcome of adjudicating one conflicting pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictDecision {
    /// Both items are the same media; nothing to transfer
    Same,
    /// Distinct items that happen to share a name; copy each to the other side
    Different,
    /// Stop the whole run
    Cancel,
}

impl ConflictDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictDecision::Same => "same",
            ConflictDecision::Different => "different",
            ConflictDecision::Cancel => "cancel",
        }
    }
}

impl FromStr for ConflictDecision {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "same" => Ok(ConflictDecision::Same),
            "different" => Ok(ConflictDecision::Different),
            "cancel" => Ok(ConflictDecision::Cancel),
            _ => Err(SyncError::Config(format!("Unknown conflict decision: {}", s))),
        }
    }
}

impl fmt::Display for ConflictDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Adjudicator seam
// ============================================================================

/// Decides whether two same-named items are the same media
#[async_trait]
pub trait ConflictAdjudicator: Send + Sync {
    async fn adjudicate(&self, left: &ItemDescriptor, right: &ItemDescriptor) -> ConflictDecision;
}

/// Unattended adjudication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Treat every conflict as the same item
    AssumeSame,
    /// Treat every conflict as two distinct items and copy both ways
    #[default]
    KeepBoth,
    /// Stop the run at the first conflict
    Abort,
}

impl ConflictPolicy {
    pub fn decision(&self) -> ConflictDecision {
        match self {
            ConflictPolicy::AssumeSame => ConflictDecision::Same,
            ConflictPolicy::KeepBoth => ConflictDecision::Different,
            ConflictPolicy::Abort => ConflictDecision::Cancel,
        }
    }
}

#[async_trait]
impl ConflictAdjudicator for ConflictPolicy {
    async fn adjudicate(&self, left: &ItemDescriptor, _right: &ItemDescriptor) -> ConflictDecision {
        let decision = self.decision();
        debug!(name = %left.name, policy = ?self, %decision, "Conflict decided by policy");
        decision
    }
}

// ============================================================================
// Interactive adjudication over a channel
// ============================================================================

/// One conflict waiting for a human decision
#[derive(Debug)]
pub struct ConflictPrompt {
    pub summary: ConflictSummary,
    pub left: ItemDescriptor,
    pub right: ItemDescriptor,
    pub reply: oneshot::Sender<ConflictDecision>,
}

impl ConflictPrompt {
    /// Answer the prompt. Answering after the run went away is a no-op.
    pub fn respond(self, decision: ConflictDecision) {
        if self.reply.send(decision).is_err() {
            debug!("Conflict prompt answered after the run stopped waiting");
        }
    }
}

/// Adjudicator that hands every conflict to a UI task.
///
/// A closed channel or a prompt dropped without an answer counts as
/// [`ConflictDecision::Cancel`].
#[derive(Debug, Clone)]
pub struct ChannelAdjudicator {
    sender: mpsc::Sender<ConflictPrompt>,
}

impl ChannelAdjudicator {
    /// Create an adjudicator and the receiving end the UI listens on
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<ConflictPrompt>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (Self { sender }, receiver)
    }

    pub fn from_sender(sender: mpsc::Sender<ConflictPrompt>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl ConflictAdjudicator for ChannelAdjudicator {
    async fn adjudicate(&self, left: &ItemDescriptor, right: &ItemDescriptor) -> ConflictDecision {
        let (reply, response) = oneshot::channel();
        let prompt = ConflictPrompt {
            summary: ConflictSummary::new(left, right),
            left: left.clone(),
            right: right.clone(),
            reply,
        };

        if self.sender.send(prompt).await.is_err() {
            warn!(name = %left.name, "Conflict prompt channel closed, cancelling");
            return ConflictDecision::Cancel;
        }

        match response.await {
            Ok(decision) => decision,
            Err(_) => {
                warn!(name = %left.name, "Conflict prompt dropped without a decision, cancelling");
                ConflictDecision::Cancel
            }
        }
    }
}

// ============================================================================
// Human-readable summary
// ============================================================================

/// Display fields for one side of a conflict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideSummary {
    pub name: String,
    pub size: String,
    pub created: String,
    pub modified: String,
    pub mime_type: String,
    pub dimensions: String,
    pub kind: String,
    pub camera: String,
    pub fps: String,
}

impl SideSummary {
    pub fn new(item: &ItemDescriptor) -> Self {
        let details = &item.details;
        let dimensions = match (details.width, details.height) {
            (Some(width), Some(height)) => format!("{} x {}", width, height),
            _ => UNKNOWN.to_string(),
        };
        let kind = match item.kind() {
            Some(MediaKind::Photo) => "Photo",
            Some(MediaKind::Video) => "Video",
            None => UNKNOWN,
        };

        Self {
            name: item.name.clone(),
            size: format_size(item.size),
            created: format_timestamp(item.created_at),
            modified: format_timestamp(details.modified_at),
            mime_type: or_unknown(&item.mime_type),
            dimensions,
            kind: kind.to_string(),
            camera: details
                .camera
                .clone()
                .unwrap_or_else(|| UNKNOWN.to_string()),
            fps: details
                .fps
                .map(|fps| format!("{:.2}", fps))
                .unwrap_or_else(|| UNKNOWN.to_string()),
        }
    }

    fn rows(&self) -> [(&'static str, &str); 9] {
        [
            ("Name", self.name.as_str()),
            ("Size", self.size.as_str()),
            ("Created", self.created.as_str()),
            ("Modified", self.modified.as_str()),
            ("Type", self.mime_type.as_str()),
            ("Dimensions", self.dimensions.as_str()),
            ("Kind", self.kind.as_str()),
            ("Camera", self.camera.as_str()),
            ("FPS", self.fps.as_str()),
        ]
    }
}

/// Both sides of a conflict, rendered for a human
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictSummary {
    pub left: SideSummary,
    pub right: SideSummary,
}

impl ConflictSummary {
    pub fn new(left: &ItemDescriptor, right: &ItemDescriptor) -> Self {
        Self {
            left: SideSummary::new(left),
            right: SideSummary::new(right),
        }
    }
}

impl fmt::Display for ConflictSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<12}{:<36}{}", "", "Folder store", "Media library")?;
        for ((label, left), (_, right)) in self.left.rows().iter().zip(self.right.rows().iter()) {
            writeln!(f, "{:<12}{:<36}{}", label, left, right)?;
        }
        Ok(())
    }
}

/// Format a byte count with one decimal in B, KB, MB, GB or TB
pub fn format_size(size: Option<u64>) -> String {
    let Some(bytes) = size else {
        return UNKNOWN.to_string();
    };

    let mut value = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if value < 1024.0 {
            return format!("{:.1} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.1} TB", value)
}

/// Format a timestamp as `YYYY-MM-DD HH:MM:SS` (UTC)
pub fn format_timestamp(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp
        .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn or_unknown(value: &str) -> String {
    if value.is_empty() {
        UNKNOWN.to_string()
    } else {
        value.to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ItemDetails, StoreSide};
    use chrono::TimeZone;

    fn left() -> ItemDescriptor {
        ItemDescriptor {
            id: "drive-1".to_string(),
            name: "a.jpg".to_string(),
            size: Some(2_621_440),
            created_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            mime_type: "image/jpeg".to_string(),
            store: StoreSide::Left,
            details: ItemDetails::default(),
        }
    }

    fn right() -> ItemDescriptor {
        ItemDescriptor {
            id: "photos-1".to_string(),
            name: "a.jpg".to_string(),
            size: None,
            created_at: Some(Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap()),
            mime_type: "image/jpeg".to_string(),
            store: StoreSide::Right,
            details: ItemDetails {
                width: Some(4032),
                height: Some(3024),
                kind: Some(MediaKind::Photo),
                camera: Some("Apple iPhone 15".to_string()),
                ..ItemDetails::default()
            },
        }
    }

    #[test]
    fn test_decision_parsing() {
        assert_eq!("SAME".parse::<ConflictDecision>().unwrap(), ConflictDecision::Same);
        assert_eq!(
            "different".parse::<ConflictDecision>().unwrap(),
            ConflictDecision::Different
        );
        assert!("maybe".parse::<ConflictDecision>().is_err());
        assert_eq!(ConflictDecision::Cancel.to_string(), "cancel");
    }

    #[tokio::test]
    async fn test_policy_decisions() {
        assert_eq!(
            ConflictPolicy::AssumeSame.adjudicate(&left(), &right()).await,
            ConflictDecision::Same
        );
        assert_eq!(
            ConflictPolicy::KeepBoth.adjudicate(&left(), &right()).await,
            ConflictDecision::Different
        );
        assert_eq!(
            ConflictPolicy::Abort.adjudicate(&left(), &right()).await,
            ConflictDecision::Cancel
        );
        assert_eq!(ConflictPolicy::default(), ConflictPolicy::KeepBoth);
    }

    #[tokio::test]
    async fn test_channel_adjudicator_round_trip() {
        let (adjudicator, mut prompts) = ChannelAdjudicator::new(1);

        let ui = tokio::spawn(async move {
            let prompt = prompts.recv().await.unwrap();
            assert_eq!(prompt.left.id, "drive-1");
            assert_eq!(prompt.summary.right.camera, "Apple iPhone 15");
            prompt.respond(ConflictDecision::Same);
        });

        let decision = adjudicator.adjudicate(&left(), &right()).await;
        ui.await.unwrap();
        assert_eq!(decision, ConflictDecision::Same);
    }

    #[tokio::test]
    async fn test_dropped_prompt_means_cancel() {
        let (adjudicator, mut prompts) = ChannelAdjudicator::new(1);

        let ui = tokio::spawn(async move {
            let prompt = prompts.recv().await.unwrap();
            drop(prompt);
        });

        assert_eq!(
            adjudicator.adjudicate(&left(), &right()).await,
            ConflictDecision::Cancel
        );
        ui.await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_channel_means_cancel() {
        let (adjudicator, prompts) = ChannelAdjudicator::new(1);
        drop(prompts);

        assert_eq!(
            adjudicator.adjudicate(&left(), &right()).await,
            ConflictDecision::Cancel
        );
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(None), "Unknown");
        assert_eq!(format_size(Some(100)), "100.0 B");
        assert_eq!(format_size(Some(1536)), "1.5 KB");
        assert_eq!(format_size(Some(2_621_440)), "2.5 MB");
        assert_eq!(format_size(Some(5 * 1024 * 1024 * 1024)), "5.0 GB");
        assert_eq!(format_size(Some(2 * 1024u64.pow(4))), "2.0 TB");
    }

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(format_timestamp(Some(ts)), "2024-03-09 14:05:07");
        assert_eq!(format_timestamp(None), "Unknown");
    }

    #[test]
    fn test_summary_fields() {
        let summary = ConflictSummary::new(&left(), &right());

        assert_eq!(summary.left.size, "2.5 MB");
        assert_eq!(summary.left.kind, "Photo");
        assert_eq!(summary.left.dimensions, "Unknown");
        assert_eq!(summary.right.size, "Unknown");
        assert_eq!(summary.right.dimensions, "4032 x 3024");
        assert_eq!(summary.right.created, "2024-01-03 00:00:00");

        let rendered = summary.to_string();
        assert!(rendered.contains("Folder store"));
        assert!(rendered.contains("4032 x 3024"));
    }
}
