//! In-memory stores shared by the integration suites.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::storage::{FolderStore, MediaItem, MediaLibrary, RemoteFile};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

type UploadHook = Box<dyn Fn(usize) + Send + Sync>;

/// A file created on a fake store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploaded {
    pub name: String,
    pub parent_id: Option<String>,
    pub bytes: Vec<u8>,
}

pub fn remote_file(id: &str, name: &str, created: Option<&str>) -> RemoteFile {
    let mime_type = if name.to_ascii_lowercase().ends_with(".mp4") {
        "video/mp4"
    } else {
        "image/jpeg"
    };
    RemoteFile {
        id: id.to_string(),
        name: name.to_string(),
        mime_type: mime_type.to_string(),
        size: Some("4".to_string()),
        created_time: created.map(str::to_string),
        modified_time: created.map(str::to_string),
        parents: vec!["target".to_string()],
    }
}

pub fn media_item(id: &str, name: &str, created: Option<&str>) -> MediaItem {
    MediaItem {
        id: id.to_string(),
        filename: name.to_string(),
        mime_type: Some("image/jpeg".to_string()),
        description: None,
        creation_time: created.map(str::to_string),
        width: Some(4000),
        height: Some(3000),
        kind: None,
        camera_make: None,
        camera_model: None,
        fps: None,
    }
}

// ============================================================================
// Folder store
// ============================================================================

#[derive(Default)]
pub struct FakeFolderStore {
    files: Mutex<Vec<RemoteFile>>,
    contents: Mutex<HashMap<String, Vec<u8>>>,
    uploads: Mutex<Vec<Uploaded>>,
    failing_downloads: Mutex<HashSet<String>>,
    list_error: Mutex<Option<String>>,
    list_calls: Mutex<Vec<(String, bool)>>,
}

impl FakeFolderStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add a file whose content is its id
    pub fn add(&self, file: RemoteFile) {
        self.contents
            .lock()
            .unwrap()
            .insert(file.id.clone(), file.id.as_bytes().to_vec());
        self.files.lock().unwrap().push(file);
    }

    pub fn fail_download(&self, file_id: &str) {
        self.failing_downloads
            .lock()
            .unwrap()
            .insert(file_id.to_string());
    }

    pub fn fail_listing(&self, message: &str) {
        *self.list_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn uploads(&self) -> Vec<Uploaded> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> Vec<(String, bool)> {
        self.list_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FolderStore for FakeFolderStore {
    async fn list_folder(&self, folder_id: &str, recursive: bool) -> Result<Vec<RemoteFile>> {
        self.list_calls
            .lock()
            .unwrap()
            .push((folder_id.to_string(), recursive));
        if let Some(message) = self.list_error.lock().unwrap().clone() {
            return Err(BridgeError::OperationFailed(message));
        }
        Ok(self.files.lock().unwrap().clone())
    }

    async fn list_subfolders(&self, _parent_id: &str) -> Result<Vec<RemoteFile>> {
        Ok(Vec::new())
    }

    async fn download(&self, file_id: &str, dest: &Path) -> Result<u64> {
        if self.failing_downloads.lock().unwrap().contains(file_id) {
            return Err(BridgeError::OperationFailed(format!(
                "download of {} refused",
                file_id
            )));
        }
        let bytes = self
            .contents
            .lock()
            .unwrap()
            .get(file_id)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(file_id.to_string()))?;
        tokio::fs::write(dest, &bytes).await?;
        Ok(bytes.len() as u64)
    }

    async fn upload(&self, src: &Path, name: &str, parent_id: &str) -> Result<String> {
        let bytes = tokio::fs::read(src).await?;
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(Uploaded {
            name: name.to_string(),
            parent_id: Some(parent_id.to_string()),
            bytes,
        });
        Ok(format!("drive-new-{}", uploads.len()))
    }
}

// ============================================================================
// Media library
// ============================================================================

#[derive(Default)]
pub struct FakeMediaLibrary {
    items: Mutex<Vec<MediaItem>>,
    contents: Mutex<HashMap<String, Vec<u8>>>,
    uploads: Mutex<Vec<Uploaded>>,
    on_upload: Mutex<Option<UploadHook>>,
    list_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeMediaLibrary {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add an item whose content is its id
    pub fn add(&self, item: MediaItem) {
        self.contents
            .lock()
            .unwrap()
            .insert(item.id.clone(), item.id.as_bytes().to_vec());
        self.items.lock().unwrap().push(item);
    }

    /// Called with the running upload count after each upload
    pub fn on_upload(&self, hook: impl Fn(usize) + Send + Sync + 'static) {
        *self.on_upload.lock().unwrap() = Some(Box::new(hook));
    }

    /// Make `list_all` wait for a permit on `gate`
    pub fn gate_listing(&self, gate: Arc<Notify>) {
        *self.list_gate.lock().unwrap() = Some(gate);
    }

    pub fn uploads(&self) -> Vec<Uploaded> {
        self.uploads.lock().unwrap().clone()
    }

    /// Forget every item, so the library lists as empty
    pub fn clear(&self) {
        self.items.lock().unwrap().clear();
        self.contents.lock().unwrap().clear();
    }
}

#[async_trait]
impl MediaLibrary for FakeMediaLibrary {
    async fn list_all(&self) -> Result<Vec<MediaItem>> {
        let gate = self.list_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(self.items.lock().unwrap().clone())
    }

    async fn download(&self, item_id: &str, dest: &Path) -> Result<u64> {
        let bytes = self
            .contents
            .lock()
            .unwrap()
            .get(item_id)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(item_id.to_string()))?;
        tokio::fs::write(dest, &bytes).await?;
        Ok(bytes.len() as u64)
    }

    async fn upload(&self, src: &Path, file_name: &str) -> Result<String> {
        let bytes = tokio::fs::read(src).await?;
        let count = {
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push(Uploaded {
                name: file_name.to_string(),
                parent_id: None,
                bytes,
            });
            uploads.len()
        };
        if let Some(hook) = self.on_upload.lock().unwrap().as_ref() {
            hook(count);
        }
        Ok(format!("photos-new-{}", count))
    }
}
