//! Google Drive API connector implementation
//!
//! Implements the `FolderStore` trait for Google Drive API v3.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
use bridge_traits::storage::{FolderStore, RemoteFile, FOLDER_MIME_TYPE};
use bytes::Bytes;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::GoogleDriveError;
use crate::mime::mime_for_name;
use crate::types::{CreatedFile, FilesListResponse, UploadMetadata};

/// Google Drive API base URL
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Google Drive upload endpoint
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Results per page
const PAGE_SIZE: u32 = 100;

/// Fields to request for file resources
const FILE_FIELDS: &str = "id,name,size,createdTime,modifiedTime,mimeType,parents";

/// Google Workspace documents have no binary content to sync
const EXCLUDED_MIME_TYPES: &[&str] = &[
    FOLDER_MIME_TYPE,
    "application/vnd.google-apps.document",
    "application/vnd.google-apps.spreadsheet",
    "application/vnd.google-apps.presentation",
];

const BOUNDARY_PREFIX: &str = "media_sync_";

const API_TIMEOUT: Duration = Duration::from_secs(30);
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(300);

/// Google Drive API connector
///
/// Implements `FolderStore` for Google Drive API v3.
///
/// # Features
///
/// - Paginated folder listing, optionally descending into sub-folders
/// - Google Workspace documents and trashed files are never listed
/// - Whole-file downloads and multipart uploads
/// - Exponential backoff on rate limiting, server errors and transport errors
///
/// # Example
///
/// ```ignore
/// use provider_google_drive::GoogleDriveConnector;
/// use bridge_traits::storage::FolderStore;
///
/// let connector = GoogleDriveConnector::new(http_client, access_token);
/// let files = connector.list_folder("root", true).await?;
/// ```
pub struct GoogleDriveConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// OAuth 2.0 access token
    access_token: String,

    retry_policy: RetryPolicy,
}

impl GoogleDriveConnector {
    /// Create a new Google Drive connector
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `access_token` - OAuth 2.0 access token with the `drive` scope
    pub fn new(http_client: Arc<dyn HttpClient>, access_token: String) -> Self {
        Self {
            http_client,
            access_token,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Files (not folders or Workspace documents) directly inside a folder
    #[instrument(skip(self))]
    pub async fn list_files_in(&self, folder_id: &str) -> Result<Vec<RemoteFile>> {
        let mut query = format!("{} and trashed=false", parent_clause(folder_id));
        for mime in EXCLUDED_MIME_TYPES {
            query.push_str(&format!(" and mimeType!='{}'", mime));
        }
        self.list_query(&query).await
    }

    /// Run a files.list query, following every page
    async fn list_query(&self, query: &str) -> Result<Vec<RemoteFile>> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!(
                "{}/files?q={}&fields={}&pageSize={}",
                DRIVE_API_BASE,
                urlencoding::encode(query),
                urlencoding::encode(&format!("nextPageToken,files({})", FILE_FIELDS)),
                PAGE_SIZE
            );
            if let Some(token) = &page_token {
                url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
            }

            let request = HttpRequest::get(url)
                .header("Accept", "application/json")
                .timeout(API_TIMEOUT);
            let response = self.execute_with_retry(request, None).await?;

            let page: FilesListResponse = serde_json::from_slice(&response.body).map_err(|e| {
                GoogleDriveError::ParseError(format!("Failed to parse files list response: {}", e))
            })?;

            debug!(count = page.files.len(), "Retrieved files page");
            files.extend(page.files.into_iter().map(RemoteFile::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(files)
    }

    /// Execute API request with retry logic
    ///
    /// Implements exponential backoff for rate limiting and transient errors.
    /// `file_id` names the resource in a not-found error.
    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        file_id: Option<&str>,
    ) -> Result<HttpResponse> {
        let request = request.bearer_token(&self.access_token);
        let max_attempts = self.retry_policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.http_client.execute(request.clone()).await {
                Ok(response) if response.is_success() => {
                    debug!("API request succeeded: status={}", response.status);
                    return Ok(response);
                }
                Ok(response) if response.is_retryable() && attempt < max_attempts => {
                    let backoff = self.retry_policy.delay_for(attempt);
                    warn!(
                        "API request failed (attempt {}/{}): status={}, retrying in {:?}",
                        attempt, max_attempts, response.status, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Ok(response) => {
                    warn!("API request failed: status={}", response.status);
                    return Err(
                        GoogleDriveError::from_status(response.status, file_id, &response.body)
                            .into(),
                    );
                }
                Err(e) if attempt < max_attempts => {
                    let backoff = self.retry_policy.delay_for(attempt);
                    warn!(
                        "API request failed (attempt {}/{}): {}, retrying in {:?}",
                        attempt, max_attempts, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    warn!("API request failed after {} attempts: {}", max_attempts, e);
                    return Err(e);
                }
            }
        }
    }
}

#[async_trait]
impl FolderStore for GoogleDriveConnector {
    /// Depth-first: a folder's own files come before those of its
    /// sub-folders, sub-folders in listing order. A folder reachable through
    /// several parents is listed once.
    #[instrument(skip(self))]
    async fn list_folder(&self, folder_id: &str, recursive: bool) -> Result<Vec<RemoteFile>> {
        info!("Listing folder from Google Drive");

        let mut files = Vec::new();
        let mut pending = vec![folder_id.to_string()];
        let mut visited = HashSet::new();

        while let Some(current) = pending.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }

            files.extend(self.list_files_in(&current).await?);

            if recursive {
                let subfolders = self.list_subfolders(&current).await?;
                pending.extend(subfolders.into_iter().rev().map(|folder| folder.id));
            }
        }

        info!("Listed {} files from Google Drive", files.len());
        Ok(files)
    }

    #[instrument(skip(self))]
    async fn list_subfolders(&self, parent_id: &str) -> Result<Vec<RemoteFile>> {
        let query = format!(
            "{} and mimeType='{}' and trashed=false",
            parent_clause(parent_id),
            FOLDER_MIME_TYPE
        );
        let folders = self.list_query(&query).await?;
        debug!(count = folders.len(), "Listed sub-folders");
        Ok(folders)
    }

    #[instrument(skip(self, dest), fields(file_id = %file_id))]
    async fn download(&self, file_id: &str, dest: &Path) -> Result<u64> {
        let url = format!(
            "{}/files/{}?alt=media",
            DRIVE_API_BASE,
            urlencoding::encode(file_id)
        );
        let request = HttpRequest::get(url).timeout(TRANSFER_TIMEOUT);

        let response = self.execute_with_retry(request, Some(file_id)).await?;
        tokio::fs::write(dest, &response.body)
            .await
            .map_err(GoogleDriveError::from)?;

        debug!("Downloaded {} bytes", response.body.len());
        Ok(response.body.len() as u64)
    }

    #[instrument(skip(self, src))]
    async fn upload(&self, src: &Path, name: &str, parent_id: &str) -> Result<String> {
        let content = tokio::fs::read(src).await.map_err(GoogleDriveError::from)?;
        let metadata = serde_json::to_vec(&UploadMetadata {
            name,
            parents: [parent_id],
        })
        .map_err(|e| GoogleDriveError::ParseError(format!("Failed to encode metadata: {}", e)))?;

        let boundary = multipart_boundary(&[metadata.as_slice(), content.as_slice()]);
        let body = multipart_body(&boundary, &metadata, mime_for_name(name), &content);
        let url = format!("{}/files?uploadType=multipart&fields=id", DRIVE_UPLOAD_BASE);
        let request = HttpRequest::post(url)
            .body(format!("multipart/related; boundary={}", boundary), body)
            .timeout(TRANSFER_TIMEOUT);

        // Single attempt: a create that timed out may still have succeeded.
        let response = self
            .http_client
            .execute(request.bearer_token(&self.access_token))
            .await?;
        if !response.is_success() {
            return Err(GoogleDriveError::from_status(response.status, None, &response.body).into());
        }

        let created: CreatedFile = serde_json::from_slice(&response.body).map_err(|e| {
            GoogleDriveError::ParseError(format!("Failed to parse upload response: {}", e))
        })?;
        let file_id = created
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| GoogleDriveError::UploadRejected(format!("no file id for {}", name)))?;

        info!(%file_id, "Uploaded file to Google Drive");
        Ok(file_id)
    }
}

/// `'<id>' in parents`, with the id escaped for the query language
fn parent_clause(folder_id: &str) -> String {
    let escaped = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}' in parents", escaped)
}

/// A fresh boundary that occurs in none of the parts
fn multipart_boundary(parts: &[&[u8]]) -> String {
    loop {
        let boundary = format!("{}{}", BOUNDARY_PREFIX, Uuid::new_v4().simple());
        let needle = boundary.as_bytes();
        let collides = parts
            .iter()
            .any(|part| part.windows(needle.len()).any(|window| window == needle));
        if !collides {
            return boundary;
        }
    }
}

fn multipart_body(boundary: &str, metadata: &[u8], content_type: &str, content: &[u8]) -> Bytes {
    let mut body = Vec::with_capacity(metadata.len() + content.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata);
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    Bytes::from(body)
}
