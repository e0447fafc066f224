//! Google Drive API response types
//!
//! Data structures for deserializing Google Drive API v3 responses.

use bridge_traits::storage::RemoteFile;
use serde::{Deserialize, Serialize};

/// Google Drive API file resource
///
/// See: https://developers.google.com/drive/api/v3/reference/files#resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// File ID
    pub id: String,

    /// File name
    pub name: String,

    /// MIME type
    pub mime_type: String,

    /// File size in bytes (omitted for folders and Google Docs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Creation time (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,

    /// Modification time (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,

    /// Parent folder IDs
    #[serde(default)]
    pub parents: Vec<String>,
}

impl From<DriveFile> for RemoteFile {
    fn from(file: DriveFile) -> Self {
        RemoteFile {
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            size: file.size,
            created_time: file.created_time,
            modified_time: file.modified_time,
            parents: file.parents,
        }
    }
}

/// Google Drive API files.list response
///
/// See: https://developers.google.com/drive/api/v3/reference/files/list
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesListResponse {
    /// List of files
    #[serde(default)]
    pub files: Vec<DriveFile>,

    /// Token for next page
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Metadata part of a multipart upload
#[derive(Debug, Serialize)]
pub struct UploadMetadata<'a> {
    pub name: &'a str,
    pub parents: [&'a str; 1],
}

/// Response of files.create with `fields=id`
#[derive(Debug, Deserialize)]
pub struct CreatedFile {
    pub id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_drive_file() {
        let json = r#"{
            "id": "abc123",
            "name": "IMG_0001.JPG",
            "mimeType": "image/jpeg",
            "size": "1024",
            "createdTime": "2023-01-01T00:00:00.000Z",
            "modifiedTime": "2023-01-02T00:00:00.000Z",
            "parents": ["folder1"]
        }"#;

        let file: DriveFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.id, "abc123");
        assert_eq!(file.mime_type, "image/jpeg");
        assert_eq!(file.size.as_deref(), Some("1024"));

        let remote: RemoteFile = file.into();
        assert_eq!(remote.created_time.as_deref(), Some("2023-01-01T00:00:00.000Z"));
        assert_eq!(remote.parents, vec!["folder1"]);
    }

    #[test]
    fn test_deserialize_folder_without_optional_fields() {
        let json = r#"{
            "id": "folder1",
            "name": "Holidays",
            "mimeType": "application/vnd.google-apps.folder"
        }"#;

        let remote: RemoteFile = serde_json::from_str::<DriveFile>(json).unwrap().into();
        assert!(remote.is_folder());
        assert!(remote.size.is_none());
        assert!(remote.parents.is_empty());
    }

    #[test]
    fn test_deserialize_files_list_response() {
        let json = r#"{
            "files": [
                {
                    "id": "file1",
                    "name": "clip.mp4",
                    "mimeType": "video/mp4",
                    "createdTime": "2023-01-01T00:00:00.000Z"
                }
            ],
            "nextPageToken": "token123"
        }"#;

        let response: FilesListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.files.len(), 1);
        assert_eq!(response.next_page_token, Some("token123".to_string()));

        let empty: FilesListResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.files.is_empty());
    }

    #[test]
    fn test_upload_metadata_shape() {
        let metadata = UploadMetadata {
            name: "a.jpg",
            parents: ["folder1"],
        };
        assert_eq!(
            serde_json::to_string(&metadata).unwrap(),
            r#"{"name":"a.jpg","parents":["folder1"]}"#
        );
    }
}
