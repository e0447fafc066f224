//! Remote Store Abstractions
//!
//! The sync engine talks to two kinds of remote media collections:
//!
//! - [`FolderStore`]: a hierarchical store where media lives inside folders
//!   (e.g. Google Drive). Items carry a byte size.
//! - [`MediaLibrary`]: a flat library of media items (e.g. Google Photos).
//!   Items carry no byte size.
//!
//! Both hand back raw records ([`RemoteFile`], [`MediaItem`]) exactly as the
//! store reports them. Timestamps and sizes stay as strings here; turning
//! them into typed values (and deciding what a malformed value means) is the
//! engine's job.
//!
//! Transfers always go through a local file: `download` writes the remote
//! content to a caller-chosen path and `upload` reads it back from one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// MIME type used by hierarchical stores for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Raw file record from a [`FolderStore`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Store-native identifier
    pub id: String,
    /// File name including extension
    pub name: String,
    pub mime_type: String,
    /// Size in bytes as reported (decimal string), absent for folders
    pub size: Option<String>,
    /// Creation time as reported (RFC 3339)
    pub created_time: Option<String>,
    /// Last modification time as reported (RFC 3339)
    pub modified_time: Option<String>,
    /// Parent folder identifiers
    #[serde(default)]
    pub parents: Vec<String>,
}

impl RemoteFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

/// Kind of a library media item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        }
    }
}

/// Raw media record from a [`MediaLibrary`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Store-native identifier
    pub id: String,
    pub filename: String,
    pub mime_type: Option<String>,
    pub description: Option<String>,
    /// Capture/creation time as reported (RFC 3339)
    pub creation_time: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Photo or video, when the store says which
    pub kind: Option<MediaKind>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    /// Frames per second (videos only)
    pub fps: Option<f64>,
}

/// Hierarchical, folder-organized media store (the "left" side of a sync)
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FolderStore;
///
/// async fn count_media(store: &dyn FolderStore, folder_id: &str) -> Result<usize> {
///     let files = store.list_folder(folder_id, true).await?;
///     Ok(files.iter().filter(|f| store.is_media(f)).count())
/// }
/// ```
#[async_trait]
pub trait FolderStore: Send + Sync {
    /// List the files of a folder, descending into sub-folders when `recursive`
    ///
    /// Folders themselves are not part of the result.
    async fn list_folder(&self, folder_id: &str, recursive: bool) -> Result<Vec<RemoteFile>>;

    /// List the direct sub-folders of a folder
    async fn list_subfolders(&self, parent_id: &str) -> Result<Vec<RemoteFile>>;

    /// Write the content of a file to `dest`, returning the number of bytes written
    async fn download(&self, file_id: &str, dest: &Path) -> Result<u64>;

    /// Create `name` inside `parent_id` from the content at `src`, returning the new id
    async fn upload(&self, src: &Path, name: &str, parent_id: &str) -> Result<String>;

    /// Whether a file is an image or a video
    fn is_media(&self, file: &RemoteFile) -> bool {
        let mime = file.mime_type.to_ascii_lowercase();
        mime.starts_with("image/") || mime.starts_with("video/")
    }
}

/// Flat media library (the "right" side of a sync)
#[async_trait]
pub trait MediaLibrary: Send + Sync {
    /// List every media item in the library
    async fn list_all(&self) -> Result<Vec<MediaItem>>;

    /// Write the original content of an item to `dest`, returning the number of bytes written
    async fn download(&self, item_id: &str, dest: &Path) -> Result<u64>;

    /// Add the content at `src` to the library as `file_name`, returning the new id
    async fn upload(&self, src: &Path, file_name: &str) -> Result<String>;
}
