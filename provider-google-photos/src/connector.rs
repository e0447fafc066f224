//! Google Photos Library API connector
//!
//! Implements the `MediaLibrary` trait for Photos Library API v1.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
use bridge_traits::storage::{MediaItem, MediaKind, MediaLibrary};
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::GooglePhotosError;
use crate::types::{
    BatchCreateRequest, BatchCreateResponse, MediaItemsListResponse, NewMediaItem,
    PhotosMediaItem, SimpleMediaItem,
};

/// Photos Library API base URL
const PHOTOS_API_BASE: &str = "https://photoslibrary.googleapis.com/v1";

/// Maximum page size accepted by mediaItems.list
const PAGE_SIZE: u32 = 100;

const API_TIMEOUT: Duration = Duration::from_secs(30);
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(300);

/// Google Photos Library API connector
///
/// # Example
///
/// ```ignore
/// use provider_google_photos::GooglePhotosConnector;
/// use bridge_traits::storage::MediaLibrary;
///
/// let connector = GooglePhotosConnector::new(http_client, access_token);
/// let items = connector.list_all().await?;
/// ```
pub struct GooglePhotosConnector {
    http_client: Arc<dyn HttpClient>,
    access_token: String,
    retry_policy: RetryPolicy,
}

impl GooglePhotosConnector {
    /// Create a connector
    ///
    /// `access_token` needs the `photoslibrary.readonly` and
    /// `photoslibrary.appendonly` scopes.
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

    /// Fetch one item; its `baseUrl` is valid for about an hour
    #[instrument(skip(self))]
    pub async fn get_item(&self, item_id: &str) -> Result<PhotosMediaItem> {
        let url = format!(
            "{}/mediaItems/{}",
            PHOTOS_API_BASE,
            urlencoding::encode(item_id)
        );
        let request = self.authorized(HttpRequest::get(url).timeout(API_TIMEOUT));
        let response = self.execute_with_retry(request, Some(item_id)).await?;

        Ok(serde_json::from_slice(&response.body).map_err(|e| {
            GooglePhotosError::ParseError(format!("Failed to parse media item: {}", e))
        })?)
    }

    fn authorized(&self, request: HttpRequest) -> HttpRequest {
        request.bearer_token(&self.access_token)
    }

    /// Send raw bytes and return the upload token
    async fn upload_bytes(&self, content: Vec<u8>, file_name: &str) -> Result<String> {
        let request = self.authorized(
            HttpRequest::post(format!("{}/uploads", PHOTOS_API_BASE))
                .body("application/octet-stream", Bytes::from(content))
                .header("X-Goog-Upload-Protocol", "raw")
                .header("X-Goog-Upload-File-Name", file_name)
                .timeout(TRANSFER_TIMEOUT),
        );

        let response = self.execute_with_retry(request, None).await?;
        let upload_token = response.text()?.trim().to_string();
        if upload_token.is_empty() {
            return Err(GooglePhotosError::UploadRejected(format!(
                "empty upload token for {}",
                file_name
            ))
            .into());
        }
        Ok(upload_token)
    }

    /// Execute a request, backing off on 429, 5xx and transport errors
    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        item_id: Option<&str>,
    ) -> Result<HttpResponse> {
        let max_attempts = self.retry_policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.http_client.execute(request.clone()).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) if response.is_retryable() && attempt < max_attempts => {
                    let backoff = self.retry_policy.delay_for(attempt);
                    warn!(
                        "Photos request failed (attempt {}/{}): status={}, retrying in {:?}",
                        attempt, max_attempts, response.status, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Ok(response) => {
                    warn!("Photos request failed: status={}", response.status);
                    return Err(
                        GooglePhotosError::from_status(response.status, item_id, &response.body)
                            .into(),
                    );
                }
                Err(e) if attempt < max_attempts => {
                    let backoff = self.retry_policy.delay_for(attempt);
                    warn!(
                        "Photos request failed (attempt {}/{}): {}, retrying in {:?}",
                        attempt, max_attempts, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl MediaLibrary for GooglePhotosConnector {
    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<MediaItem>> {
        info!("Listing media items from Google Photos");

        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!("{}/mediaItems?pageSize={}", PHOTOS_API_BASE, PAGE_SIZE);
            if let Some(token) = &page_token {
                url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
            }

            let request = self.authorized(HttpRequest::get(url).timeout(API_TIMEOUT));
            let response = self.execute_with_retry(request, None).await?;
            let page: MediaItemsListResponse =
                serde_json::from_slice(&response.body).map_err(|e| {
                    GooglePhotosError::ParseError(format!(
                        "Failed to parse media items response: {}",
                        e
                    ))
                })?;

            debug!(count = page.media_items.len(), "Retrieved media items page");
            items.extend(page.media_items.into_iter().map(MediaItem::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        info!("Retrieved a total of {} media items", items.len());
        Ok(items)
    }

    #[instrument(skip(self, dest), fields(item_id = %item_id))]
    async fn download(&self, item_id: &str, dest: &Path) -> Result<u64> {
        let item = self.get_item(item_id).await?;
        let base_url = item
            .base_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| GooglePhotosError::MissingBaseUrl {
                item_id: item_id.to_string(),
            })?;

        let suffix = match item.kind() {
            Some(MediaKind::Video) => "=dv",
            _ => "=d",
        };
        let request = HttpRequest::get(format!("{}{}", base_url, suffix)).timeout(TRANSFER_TIMEOUT);
        let response = self.execute_with_retry(request, Some(item_id)).await?;

        tokio::fs::write(dest, &response.body)
            .await
            .map_err(GooglePhotosError::from)?;

        debug!("Downloaded {} bytes", response.body.len());
        Ok(response.body.len() as u64)
    }

    #[instrument(skip(self, src))]
    async fn upload(&self, src: &Path, file_name: &str) -> Result<String> {
        let content = tokio::fs::read(src).await.map_err(GooglePhotosError::from)?;
        let upload_token = self.upload_bytes(content, file_name).await?;
        debug!("Received upload token");

        let body = BatchCreateRequest {
            new_media_items: vec![NewMediaItem {
                description: file_name,
                simple_media_item: SimpleMediaItem {
                    upload_token: &upload_token,
                    file_name,
                },
            }],
        };
        let request = self
            .authorized(HttpRequest::post(format!(
                "{}/mediaItems:batchCreate",
                PHOTOS_API_BASE
            )))
            .json(&body)?
            .timeout(API_TIMEOUT);

        // Single attempt: a retried batchCreate could create a duplicate.
        let response = self.http_client.execute(request).await?;
        if !response.is_success() {
            return Err(GooglePhotosError::from_status(response.status, None, &response.body).into());
        }

        let created: BatchCreateResponse = serde_json::from_slice(&response.body).map_err(|e| {
            GooglePhotosError::ParseError(format!("Failed to parse batchCreate response: {}", e))
        })?;

        let result = created.new_media_item_results.first().ok_or_else(|| {
            GooglePhotosError::UploadRejected(format!("no result for {}", file_name))
        })?;
        let item_id = result.created_id().ok_or_else(|| {
            let status = result
                .status
                .as_ref()
                .map(|status| status.describe())
                .unwrap_or_else(|| "no media item".to_string());
            GooglePhotosError::UploadRejected(format!("{}: {}", file_name, status))
        })?;

        info!(%item_id, "Uploaded media item to Google Photos");
        Ok(item_id.to_string())
    }
}
