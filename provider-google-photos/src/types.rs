//! Google Photos Library API types
//!
//! See: https://developers.google.com/photos/library/reference/rest/v1/mediaItems

use bridge_traits::storage::{MediaItem, MediaKind};
use serde::{Deserialize, Deserializer, Serialize};

/// mediaItem resource
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotosMediaItem {
    pub id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Short-lived content URL; fetch the item again before downloading
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub media_metadata: MediaMetadata,
}

impl PhotosMediaItem {
    /// Video or photo, by which metadata block is present
    pub fn kind(&self) -> Option<MediaKind> {
        if self.media_metadata.video.is_some() {
            Some(MediaKind::Video)
        } else if self.media_metadata.photo.is_some() {
            Some(MediaKind::Photo)
        } else {
            None
        }
    }
}

impl From<PhotosMediaItem> for MediaItem {
    fn from(item: PhotosMediaItem) -> Self {
        let kind = item.kind();
        let metadata = item.media_metadata;
        let (camera_make, camera_model) = metadata
            .photo
            .map(|photo| (photo.camera_make, photo.camera_model))
            .unwrap_or_default();

        MediaItem {
            id: item.id,
            filename: item.filename,
            mime_type: item.mime_type,
            description: item.description,
            creation_time: metadata.creation_time,
            width: metadata.width,
            height: metadata.height,
            kind,
            camera_make,
            camera_model,
            fps: metadata.video.and_then(|video| video.fps),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    #[serde(default)]
    pub creation_time: Option<String>,
    /// Sent as an int64 string
    #[serde(default, deserialize_with = "lenient_u32")]
    pub width: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub height: Option<u32>,
    #[serde(default)]
    pub photo: Option<PhotoMetadata>,
    #[serde(default)]
    pub video: Option<VideoMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoMetadata {
    #[serde(default)]
    pub camera_make: Option<String>,
    #[serde(default)]
    pub camera_model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    #[serde(default)]
    pub fps: Option<f64>,
    /// Processing status, `READY` once downloadable
    #[serde(default)]
    pub status: Option<String>,
}

/// mediaItems.list response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItemsListResponse {
    #[serde(default)]
    pub media_items: Vec<PhotosMediaItem>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// mediaItems.batchCreate request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateRequest<'a> {
    pub new_media_items: Vec<NewMediaItem<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMediaItem<'a> {
    pub description: &'a str,
    pub simple_media_item: SimpleMediaItem<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleMediaItem<'a> {
    pub upload_token: &'a str,
    pub file_name: &'a str,
}

/// mediaItems.batchCreate response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateResponse {
    #[serde(default)]
    pub new_media_item_results: Vec<NewMediaItemResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMediaItemResult {
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub media_item: Option<CreatedMediaItem>,
}

impl NewMediaItemResult {
    /// Id of the created item, when creation succeeded
    pub fn created_id(&self) -> Option<&str> {
        let succeeded = self.status.as_ref().map_or(true, Status::is_success);
        if !succeeded {
            return None;
        }
        self.media_item
            .as_ref()
            .and_then(|item| item.id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatedMediaItem {
    #[serde(default)]
    pub id: Option<String>,
}

/// google.rpc.Status
#[derive(Debug, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<i32>,
}

impl Status {
    /// `Success`, or an OK (absent or zero) code
    pub fn is_success(&self) -> bool {
        self.message.as_deref() == Some("Success") || self.code.unwrap_or(0) == 0
    }

    pub fn describe(&self) -> String {
        match (&self.message, self.code) {
            (Some(message), Some(code)) => format!("{} (code {})", message, code),
            (Some(message), None) => message.clone(),
            (None, Some(code)) => format!("code {}", code),
            (None, None) => "unknown status".to_string(),
        }
    }
}

fn lenient_u32<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(value)) => Some(value),
        Some(Raw::Text(text)) => text.trim().parse().ok(),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_photo() {
        let json = r#"{
            "id": "p1",
            "filename": "IMG_0001.JPG",
            "mimeType": "image/jpeg",
            "baseUrl": "https://lh3.example/abc",
            "mediaMetadata": {
                "creationTime": "2024-01-01T10:00:00Z",
                "width": "4032",
                "height": "3024",
                "photo": {"cameraMake": "Apple", "cameraModel": "iPhone 12"}
            }
        }"#;

        let item: PhotosMediaItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.kind(), Some(MediaKind::Photo));

        let media: MediaItem = item.into();
        assert_eq!(media.width, Some(4032));
        assert_eq!(media.height, Some(3024));
        assert_eq!(media.camera_model.as_deref(), Some("iPhone 12"));
        assert_eq!(media.creation_time.as_deref(), Some("2024-01-01T10:00:00Z"));
        assert_eq!(media.fps, None);
    }

    #[test]
    fn test_deserialize_video() {
        let json = r#"{
            "id": "v1",
            "filename": "clip.mp4",
            "mediaMetadata": {
                "width": 1920,
                "video": {"fps": 29.97, "status": "READY"}
            }
        }"#;

        let media: MediaItem = serde_json::from_str::<PhotosMediaItem>(json)
            .unwrap()
            .into();
        assert_eq!(media.kind, Some(MediaKind::Video));
        assert_eq!(media.width, Some(1920));
        assert_eq!(media.height, None);
        assert_eq!(media.fps, Some(29.97));
        assert!(media.camera_make.is_none());
    }

    #[test]
    fn test_batch_create_request_shape() {
        let request = BatchCreateRequest {
            new_media_items: vec![NewMediaItem {
                description: "a.jpg",
                simple_media_item: SimpleMediaItem {
                    upload_token: "tok",
                    file_name: "a.jpg",
                },
            }],
        };

        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"newMediaItems":[{"description":"a.jpg","simpleMediaItem":{"uploadToken":"tok","fileName":"a.jpg"}}]}"#
        );
    }

    #[test]
    fn test_created_id_requires_success() {
        let ok: NewMediaItemResult = serde_json::from_str(
            r#"{"status":{"message":"Success"},"mediaItem":{"id":"new1"}}"#,
        )
        .unwrap();
        assert_eq!(ok.created_id(), Some("new1"));

        let failed: NewMediaItemResult = serde_json::from_str(
            r#"{"status":{"message":"Failed: invalid token","code":3},"mediaItem":{"id":"x"}}"#,
        )
        .unwrap();
        assert_eq!(failed.created_id(), None);

        let no_item: NewMediaItemResult =
            serde_json::from_str(r#"{"status":{"code":0}}"#).unwrap();
        assert_eq!(no_item.created_id(), None);
    }
}
