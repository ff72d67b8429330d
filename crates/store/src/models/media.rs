use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use shoebox_media::{FolderRef, MediaKind, MediaMetadata, MediaRecord};

/// One row of the `media` table.
///
/// Metadata and tags are stored as JSON text; everything else maps onto a
/// plain column.
#[derive(sqlx::FromRow)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct MediaRow {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub mime_type: Option<String>,
    pub size_bytes: i64,
    pub last_modified: i64,
    pub original: Option<Vec<u8>>,
    pub preview: Option<Vec<u8>>,
    pub metadata: String,
    pub tags: String,
    pub added_at: i64,
    pub folder_path: Option<String>,
    pub folder_name: Option<String>,
}
impl TryFrom<&MediaRecord> for MediaRow {
    type Error = Error;
    fn try_from(record: &MediaRecord) -> Result<Self, Self::Error> {
        let (folder_path, folder_name) = match &record.folder {
            Some(folder) => (Some(folder.path.clone()), Some(folder.name.clone())),
            None => (None, None),
        };
        Ok(Self {
            id: record.id.clone(),
            name: record.name.clone(),
            kind: record.kind.as_str().to_string(),
            mime_type: record.mime_type.clone(),
            size_bytes: i64::try_from(record.size_bytes).or_raise(|| ErrorKind::InvalidData("size"))?,
            last_modified: record.last_modified,
            original: Some(record.original.clone()),
            preview: (!record.preview.is_empty()).then(|| record.preview.clone()),
            metadata: serde_json::to_string(&record.metadata).or_raise(|| ErrorKind::InvalidData("metadata"))?,
            tags: serde_json::to_string(&record.tags).or_raise(|| ErrorKind::InvalidData("tags"))?,
            added_at: record.added_at,
            folder_path,
            folder_name,
        })
    }
}
impl TryFrom<MediaRow> for MediaRecord {
    type Error = Error;
    fn try_from(row: MediaRow) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: row.kind.parse::<MediaKind>().or_raise(|| ErrorKind::InvalidData("kind"))?,
            size_bytes: u64::try_from(row.size_bytes).or_raise(|| ErrorKind::InvalidData("size"))?,
            metadata: serde_json::from_str::<MediaMetadata>(&row.metadata)
                .or_raise(|| ErrorKind::InvalidData("metadata"))?,
            tags: serde_json::from_str(&row.tags).or_raise(|| ErrorKind::InvalidData("tags"))?,
            folder: FolderRef::from_parts(row.folder_path, row.folder_name)
                .or_raise(|| ErrorKind::InvalidData("folder"))?,
            id: row.id,
            name: row.name,
            mime_type: row.mime_type,
            last_modified: row.last_modified,
            original: row.original.unwrap_or_default(),
            preview: row.preview.unwrap_or_default(),
            added_at: row.added_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoebox_media::Dimensions;

    fn record() -> MediaRecord {
        MediaRecord {
            id: "abc".to_string(),
            name: "beach.jpg".to_string(),
            kind: MediaKind::Image,
            mime_type: Some("image/jpeg".to_string()),
            size_bytes: 3,
            last_modified: 1_700_000_000_000,
            original: vec![1, 2, 3],
            preview: vec![],
            metadata: MediaMetadata {
                dimensions: Some(Dimensions { width: 4, height: 3 }),
                duration_seconds: None,
                format: "jpeg".to_string(),
            },
            tags: vec![],
            added_at: 1_700_000_000_001,
            folder: Some(FolderRef::new("Trip/Day 1", "Day 1")),
        }
    }

    #[test]
    fn test_model_to_row() {
        let row = MediaRow::try_from(&record()).unwrap();
        assert_eq!(row.kind, "image");
        assert_eq!(row.tags, "[]");
        assert_eq!(row.preview, None);
        assert_eq!(row.metadata, r#"{"dimensions":{"width":4,"height":3},"format":"jpeg"}"#);
        assert_eq!(row.folder_path.as_deref(), Some("Trip/Day 1"));
        assert_eq!(row.folder_name.as_deref(), Some("Day 1"));
    }

    #[test]
    fn test_row_to_model() {
        let row = MediaRow::try_from(&record()).unwrap();
        assert_eq!(MediaRecord::try_from(row).unwrap(), record());
    }

    #[test]
    fn test_null_blobs_become_empty() {
        let mut row = MediaRow::try_from(&record()).unwrap();
        row.original = None;
        row.preview = None;
        let model = MediaRecord::try_from(row).unwrap();
        assert!(model.is_corrupt());
        assert!(model.preview.is_empty());
    }

    #[test]
    fn test_rejects_half_folder() {
        let mut row = MediaRow::try_from(&record()).unwrap();
        row.folder_name = None;
        let err = MediaRecord::try_from(row).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidData("folder"));
    }

    #[test]
    fn test_rejects_unknown_kind() {
        let mut row = MediaRow::try_from(&record()).unwrap();
        row.kind = "audio".to_string();
        let err = MediaRecord::try_from(row).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidData("kind"));
    }
}
