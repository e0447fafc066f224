//! # Item Descriptors
//!
//! Normalizes raw records from both stores into one immutable shape the
//! indexer and reconciler can compare.
//!
//! Raw timestamps are RFC 3339 strings and folder-store sizes are decimal
//! strings. Anything that does not parse becomes `None`; a missing creation
//! time later degrades a name match into a conflict instead of failing the run.

use bridge_traits::storage::{MediaItem, MediaKind, RemoteFile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which store an item was scanned from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreSide {
    /// Hierarchical folder store
    Left,
    /// Flat media library
    Right,
}

impl StoreSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreSide::Left => "left",
            StoreSide::Right => "right",
        }
    }
}

impl fmt::Display for StoreSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation-only metadata shown to a human adjudicator.
///
/// None of these fields take part in matching.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub modified_at: Option<DateTime<Utc>>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub kind: Option<MediaKind>,
    /// "Make Model", or whichever of the two is known
    pub camera: Option<String>,
    pub fps: Option<f64>,
}

/// Normalized snapshot of one item, taken at scan time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDescriptor {
    /// Store-native identifier
    pub id: String,
    pub name: String,
    /// Byte size; always `None` for the media library
    pub size: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
    pub mime_type: String,
    pub store: StoreSide,
    #[serde(default)]
    pub details: ItemDetails,
}

impl ItemDescriptor {
    /// Normalize a folder-store file record
    pub fn from_remote_file(file: &RemoteFile) -> Self {
        Self {
            id: file.id.clone(),
            name: file.name.clone(),
            size: file.size.as_deref().and_then(parse_size),
            created_at: file.created_time.as_deref().and_then(parse_timestamp),
            mime_type: file.mime_type.clone(),
            store: StoreSide::Left,
            details: ItemDetails {
                modified_at: file.modified_time.as_deref().and_then(parse_timestamp),
                ..ItemDetails::default()
            },
        }
    }

    /// Normalize a media-library record
    pub fn from_media_item(item: &MediaItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.filename.clone(),
            size: None,
            created_at: item.creation_time.as_deref().and_then(parse_timestamp),
            mime_type: item.mime_type.clone().unwrap_or_default(),
            store: StoreSide::Right,
            details: ItemDetails {
                modified_at: None,
                width: item.width,
                height: item.height,
                kind: item.kind,
                camera: camera_label(item.camera_make.as_deref(), item.camera_model.as_deref()),
                fps: item.fps,
            },
        }
    }

    /// Media kind reported by the store, falling back to the MIME type
    pub fn kind(&self) -> Option<MediaKind> {
        self.details.kind.or_else(|| {
            let mime = self.mime_type.to_ascii_lowercase();
            if mime.starts_with("image/") {
                Some(MediaKind::Photo)
            } else if mime.starts_with("video/") {
                Some(MediaKind::Video)
            } else {
                None
            }
        })
    }
}

/// Parse an RFC 3339 timestamp, treating malformed input as absent
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_size(raw: &str) -> Option<u64> {
    raw.trim().parse().ok()
}

fn camera_label(make: Option<&str>, model: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = [make, model]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}
