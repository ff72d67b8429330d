//! Folder aggregation: a derived view over the folder fields of stored items.

use serde::Serialize;
use shoebox_media::MediaItem;
use std::collections::HashMap;

/// One folder as shown in the folder browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderSummary {
    pub name: String,
    pub path: String,
    pub file_count: usize,
    /// The first non-empty preview among the folder's items, in the order
    /// the items were given.
    #[serde(skip)]
    pub thumbnail: Option<Vec<u8>>,
    /// Most recent `last_modified` of any item in the folder.
    pub last_modified: i64,
}

/// Group `items` by folder path. Items without a folder are ignored.
///
/// Sorted by `last_modified` descending, ties broken by path ascending.
pub fn aggregate_folders<'a>(items: impl IntoIterator<Item = &'a MediaItem>) -> Vec<FolderSummary> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut folders: Vec<FolderSummary> = Vec::new();
    for item in items {
        let Some(folder) = &item.folder else {
            continue;
        };
        let position = *index.entry(folder.path.as_str()).or_insert_with(|| {
            folders.push(FolderSummary {
                name: folder.name.clone(),
                path: folder.path.clone(),
                file_count: 0,
                thumbnail: None,
                last_modified: i64::MIN,
            });
            folders.len() - 1
        });
        let summary = &mut folders[position];
        summary.file_count += 1;
        summary.last_modified = summary.last_modified.max(item.last_modified());
        if summary.thumbnail.is_none() && !item.preview.is_empty() {
            summary.thumbnail = Some(item.preview.clone());
        }
    }
    folders.sort_by(|a, b| b.last_modified.cmp(&a.last_modified).then_with(|| a.path.cmp(&b.path)));
    folders
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoebox_media::{FileHandle, FolderRef, MediaKind, MediaMetadata};

    fn item(id: &str, folder: Option<&str>, last_modified: i64, preview: &[u8]) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            kind: MediaKind::Image,
            file: FileHandle::new(format!("{id}.jpg"), vec![1], last_modified),
            preview: preview.to_vec(),
            metadata: MediaMetadata::default(),
            tags: vec![],
            added_at: 0,
            folder: folder.map(FolderRef::from_path),
        }
    }

    #[test]
    fn test_groups_and_orders() {
        let items = [
            item("a", Some("Trip"), 100, b""),
            item("b", Some("Trip"), 200, b"P"),
            item("c", None, 999, b"X"),
            item("d", Some("Home"), 150, b"H"),
        ];
        let folders = aggregate_folders(&items);
        assert_eq!(folders.len(), 2);
        assert_eq!(folders[0].path, "Trip");
        assert_eq!(folders[0].name, "Trip");
        assert_eq!(folders[0].file_count, 2);
        assert_eq!(folders[0].last_modified, 200);
        assert_eq!(folders[0].thumbnail.as_deref(), Some(&b"P"[..]));
        assert_eq!(folders[1].path, "Home");
    }

    #[test]
    fn test_ties_break_on_path() {
        let items = [item("a", Some("b/zeta"), 5, b""), item("b", Some("a/alpha"), 5, b"")];
        let folders = aggregate_folders(&items);
        assert_eq!(folders[0].path, "a/alpha");
        assert_eq!(folders[0].name, "alpha");
        assert!(folders[0].thumbnail.is_none());
    }

    #[test]
    fn test_no_folders() {
        assert!(aggregate_folders(&[item("a", None, 1, b"")]).is_empty());
    }
}
