//! Payloads of the upload/listing HTTP API.
//!
//! The gallery does not talk HTTP itself; these types describe what the
//! server sends back so a client can turn remote listings into the same
//! metadata the local store keeps.

use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use serde::{Deserialize, Serialize};
use shoebox_media::{Dimensions, FolderRef, MediaKind, MediaMetadata, codec, probe};

/// Listing endpoint for one kind of media.
pub fn list_endpoint(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Image => "/api/files/images",
        MediaKind::Video => "/api/files/videos",
    }
}

pub const UPLOAD_ENDPOINT: &str = "/api/files/upload";

pub fn delete_endpoint(id: &str) -> String {
    format!("/api/files/{id}")
}

/// `{ success, data }` wrapper around every successful response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
impl<T> Envelope<T> {
    /// Unwrap the payload, treating `success: false` or a missing `data`
    /// as an error.
    pub fn into_data(self) -> Result<T> {
        if !self.success {
            tracing::debug!(message = ?self.message, "Remote reported failure");
            exn::bail!(ErrorKind::Remote);
        }
        self.data.ok_or_raise(|| ErrorKind::Remote)
    }
}

pub type ListResponse = Envelope<Vec<RemoteFile>>;
pub type UploadResponse = Envelope<RemoteFile>;

/// `{ success, message }` body returned by deletes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// One file as the server lists it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    /// `image`/`video`, or a full media type.
    #[serde(rename = "type")]
    pub kind: String,
    pub size: u64,
    pub last_modified: i64,
    pub url: String,
    /// Thumbnail as a `data:` URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    /// Duration in seconds, videos only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_path: Option<String>,
}

impl RemoteFile {
    pub fn media_kind(&self) -> Result<MediaKind> {
        MediaKind::from_mime_type(&self.kind)
            .or_else(|| self.kind.parse().ok())
            .ok_or_raise(|| ErrorKind::Remote)
    }

    pub fn metadata(&self) -> MediaMetadata {
        let mime = self.kind.contains('/').then_some(self.kind.as_str());
        MediaMetadata {
            dimensions: self.dimensions,
            duration_seconds: self.duration,
            format: probe::format_label(mime, &self.name),
        }
    }

    pub fn folder(&self) -> Option<FolderRef> {
        self.folder_path.as_deref().filter(|p| !p.is_empty()).map(FolderRef::from_path)
    }

    /// Thumbnail bytes, empty when absent or undecodable.
    pub fn thumbnail_bytes(&self) -> Vec<u8> {
        self.thumbnail.as_deref().and_then(codec::decode_data_url).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const LISTING: &str = r#"{
        "success": true,
        "data": [
            {
                "id": "1712345678-beach.jpg",
                "name": "beach.jpg",
                "type": "image",
                "size": 2048,
                "lastModified": 1712345678000,
                "url": "/uploads/Image/beach.jpg",
                "dimensions": {"width": 640, "height": 480},
                "folderPath": "Trip"
            },
            {
                "id": "1712345679-surf.mp4",
                "name": "surf.mp4",
                "type": "video/mp4",
                "size": 4096,
                "lastModified": 1712345679000,
                "url": "/uploads/Video/surf.mp4",
                "duration": 12.5
            }
        ]
    }"#;

    #[test]
    fn test_parse_listing() {
        let files = serde_json::from_str::<ListResponse>(LISTING).unwrap().into_data().unwrap();
        assert_eq!(files.len(), 2);

        let beach = &files[0];
        assert_eq!(beach.media_kind().unwrap(), MediaKind::Image);
        assert_eq!(beach.folder(), Some(FolderRef::new("Trip", "Trip")));
        let metadata = beach.metadata();
        assert_eq!(metadata.dimensions, Some(Dimensions { width: 640, height: 480 }));
        assert_eq!(metadata.format, "jpg");
        assert!(beach.thumbnail_bytes().is_empty());

        let surf = &files[1];
        assert_eq!(surf.media_kind().unwrap(), MediaKind::Video);
        assert_eq!(surf.metadata().duration_seconds, Some(12.5));
        assert_eq!(surf.metadata().format, "mp4");
        assert_eq!(surf.folder(), None);
    }

    #[test]
    fn test_failed_envelope_is_an_error() {
        let response: UploadResponse = serde_json::from_str(r#"{"success": false, "message": "too large"}"#).unwrap();
        assert_eq!(response.message.as_deref(), Some("too large"));
        let err = response.into_data().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Remote));
    }

    #[test]
    fn test_missing_data_is_an_error() {
        let response: ListResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(response.into_data().is_err());
    }

    #[test]
    fn test_delete_response() {
        let response: DeleteResponse =
            serde_json::from_str(r#"{"success": true, "message": "File deleted successfully"}"#).unwrap();
        assert!(response.success);
    }

    #[test]
    fn test_serializes_camel_case() {
        let file = RemoteFile {
            id: "x".to_string(),
            name: "x.png".to_string(),
            kind: "image".to_string(),
            size: 1,
            last_modified: 2,
            url: "/uploads/Image/x.png".to_string(),
            thumbnail: None,
            dimensions: None,
            duration: None,
            folder_path: Some("A/B".to_string()),
        };
        let value = serde_json::to_value(&file).unwrap();
        assert_eq!(value["type"], "image");
        assert_eq!(value["lastModified"], 2);
        assert_eq!(value["folderPath"], "A/B");
        assert!(value.get("thumbnail").is_none());
    }

    #[rstest]
    #[case("image", Some(MediaKind::Image))]
    #[case("videos", Some(MediaKind::Video))]
    #[case("image/webp", Some(MediaKind::Image))]
    #[case("audio/mpeg", None)]
    fn test_media_kind(#[case] kind: &str, #[case] expected: Option<MediaKind>) {
        let file = RemoteFile {
            id: String::new(),
            name: String::new(),
            kind: kind.to_string(),
            size: 0,
            last_modified: 0,
            url: String::new(),
            thumbnail: None,
            dimensions: None,
            duration: None,
            folder_path: None,
        };
        assert_eq!(file.media_kind().ok(), expected);
    }

    #[rstest]
    #[case(MediaKind::Image, "/api/files/images")]
    #[case(MediaKind::Video, "/api/files/videos")]
    fn test_endpoints(#[case] kind: MediaKind, #[case] expected: &str) {
        assert_eq!(list_endpoint(kind), expected);
        assert_eq!(delete_endpoint("abc"), "/api/files/abc");
    }
}
