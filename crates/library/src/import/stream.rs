use super::error::{ErrorKind as ImportErrorKind, Result as ImportResult};
use super::file::{Prepared, prepare_file};
use super::{ImportOptions, ImportSummary};
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use async_stream::stream;
use exn::ResultExt;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use shoebox_storage::BackendHandle;
use shoebox_store::MediaStore;
use std::collections::VecDeque;
use std::path::PathBuf;

/// Files read and prepared at once. Each one is held fully in memory until
/// its batch is written.
const MAX_PREPARE_CONCURRENCY: usize = 8;

/// Progress events emitted by [`import`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started) exactly once.
/// 2. [`DiscoveryComplete`](Self::DiscoveryComplete) exactly once, with the
///    number of files found in the source.
/// 3. [`Skipped`](Self::Skipped) and [`BatchWritten`](Self::BatchWritten),
///    interleaved, zero or more times.
/// 4. [`Complete`](Self::Complete) exactly once.
///
/// A fatal error terminates the stream early, in which case
/// [`Complete`](Self::Complete) is never emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportEvent {
    Started,
    DiscoveryComplete(u64),
    /// The file is not an image or a video.
    Skipped(PathBuf),
    /// A batch was committed. `total` counts every record written so far.
    BatchWritten { written: u64, total: u64 },
    Complete(ImportSummary),
}

/// Streams [`ImportEvent`]s while importing every media file in `source`
/// into `store`.
///
/// Files are prepared concurrently, up to a small fixed limit, and written
/// with [`MediaStore::put_batch`] every `options.batch_size` records, plus
/// once more for the remainder. A batch is all-or-nothing: when the store
/// gives up on one, the stream yields the error and ends, and only earlier
/// batches remain imported.
///
/// Failing to read or prepare an individual file is surfaced as an `Err`
/// item without terminating the stream.
pub fn import<'a>(
    source: &'a BackendHandle,
    store: &'a MediaStore,
    options: &'a ImportOptions,
) -> impl Stream<Item = LibraryResult<ImportEvent>> + 'a {
    stream! {
        for await event in import_inner(source, store, options) {
            yield event.or_raise(|| LibraryErrorKind::Import);
        }
    }
}

fn import_inner<'a>(
    source: &'a BackendHandle,
    store: &'a MediaStore,
    options: &'a ImportOptions,
) -> impl Stream<Item = ImportResult<ImportEvent>> + 'a {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        yield Ok(ImportEvent::Started);
        tracing::info!(source = source.name(), prefix = ?options.prefix, folder = ?options.folder, "Starting import");

        let files = match source.list(options.prefix.as_deref()).await.or_raise(|| ImportErrorKind::Discovery) {
            Ok(f) => f,
            Err(e) => {
                yield Err(e);
                return;
            },
        };
        let mut summary = ImportSummary {
            // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
            discovered: u64::try_from(files.len()).unwrap_or(0),
            ..ImportSummary::default()
        };
        yield Ok(ImportEvent::DiscoveryComplete(summary.discovered));

        let batch_size = options.batch_size.max(1);
        let mut pending = Vec::with_capacity(batch_size);
        let mut queue: VecDeque<_> = files.into_iter().map(|info| prepare_file(source, info, options)).collect();
        let mut processing = FuturesUnordered::new();
        processing.extend(queue.drain(..MAX_PREPARE_CONCURRENCY.min(queue.len())));
        while let Some(result) = processing.next().await {
            match result {
                Ok(Prepared::Record(record)) => pending.push(*record),
                Ok(Prepared::Skipped(path)) => {
                    summary.skipped += 1;
                    yield Ok(ImportEvent::Skipped(path));
                },
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(error = ?e, "Could not import file");
                    yield Err(e);
                },
            }
            if let Some(next) = queue.pop_front() {
                processing.push(next);
            }

            let finished = processing.is_empty();
            if pending.len() >= batch_size || (finished && !pending.is_empty()) {
                let batch = std::mem::take(&mut pending);
                if let Err(e) = store.put_batch(&batch).await.or_raise(|| ImportErrorKind::Store) {
                    yield Err(e);
                    return;
                }
                let written = u64::try_from(batch.len()).unwrap_or(0);
                summary.imported += written;
                tracing::debug!(written, total = summary.imported, "Batch written");
                yield Ok(ImportEvent::BatchWritten { written, total: summary.imported });
            }
        }

        tracing::info!(
            imported = summary.imported,
            skipped = summary.skipped,
            failed = summary.failed,
            "Import complete"
        );
        yield Ok(ImportEvent::Complete(summary));
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use shoebox_media::MediaKind;
    use shoebox_storage::backend::MockBackend;
    use shoebox_store::RetryPolicy;
    use std::sync::Arc;
    use std::time::Duration;
    use time::UtcDateTime;

    fn jpeg_like(n: u8) -> Vec<u8> {
        // JPEG magic followed by junk: classified as an image, no preview.
        vec![0xFF, 0xD8, 0xFF, 0xE0, n, n, n]
    }

    async fn run(source: &BackendHandle, store: &MediaStore, options: &ImportOptions) -> Vec<ImportEvent> {
        import(source, store, options).try_collect().await.unwrap()
    }

    #[tokio::test]
    async fn test_event_order_and_summary() {
        let source: BackendHandle = Arc::new(MockBackend::with_files([
            ("a.jpg", jpeg_like(1)),
            ("b.jpg", jpeg_like(2)),
            ("notes.txt", Vec::from(*b"hello")),
        ]));
        let store = MediaStore::in_memory().await.unwrap();
        let events = run(&source, &store, &ImportOptions::default()).await;

        assert_eq!(events.first(), Some(&ImportEvent::Started));
        assert_eq!(events.get(1), Some(&ImportEvent::DiscoveryComplete(3)));
        assert!(events.contains(&ImportEvent::Skipped(PathBuf::from("notes.txt"))));
        assert!(events.contains(&ImportEvent::BatchWritten { written: 2, total: 2 }));
        assert_eq!(
            events.last(),
            Some(&ImportEvent::Complete(ImportSummary {
                discovered: 3,
                imported: 2,
                skipped: 1,
                failed: 0,
            }))
        );
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_writes_in_batches() {
        let files: Vec<_> = (0..7u8).map(|n| (format!("img{n}.jpg"), jpeg_like(n))).collect();
        let source: BackendHandle = Arc::new(MockBackend::with_files(files));
        let store = MediaStore::in_memory().await.unwrap();
        let options = ImportOptions {
            batch_size: 3,
            ..Default::default()
        };
        let events = run(&source, &store, &options).await;

        let batches: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ImportEvent::BatchWritten { written, total } => Some((*written, *total)),
                _ => None,
            })
            .collect();
        assert_eq!(batches, [(3, 3), (3, 6), (1, 7)]);
        assert_eq!(store.get_all().await.unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_folder_import_trip_scenario() {
        let modified = UtcDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let source: BackendHandle = Arc::new(MockBackend::with_timestamped_files([
            ("one.jpg", modified, jpeg_like(1)),
            ("two.jpg", modified, jpeg_like(2)),
            ("three.jpg", modified, jpeg_like(3)),
        ]));
        let store = MediaStore::in_memory().await.unwrap();
        let options = ImportOptions {
            folder: Some("Trip".to_string()),
            ..Default::default()
        };
        run(&source, &store, &options).await;

        let folders = store.list_folders(None).await.unwrap();
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].path, "Trip");
        assert_eq!(folders[0].file_count, 3);
        assert_eq!(folders[0].last_modified, 1_700_000_000_000);

        let items = store.get_by_folder("Trip").await.unwrap();
        assert!(items.iter().all(|i| i.kind == MediaKind::Image));
        store.delete_batch(&[items[0].id.as_str(), items[1].id.as_str()]).await.unwrap();
        assert_eq!(store.list_folders(None).await.unwrap()[0].file_count, 1);
        store.delete(&items[2].id).await.unwrap();
        assert!(store.list_folders(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prefix_limits_source_and_nests_folders() {
        let source: BackendHandle = Arc::new(MockBackend::with_files([
            ("Trip/beach.jpg", jpeg_like(1)),
            ("Trip/day2/dive.jpg", jpeg_like(2)),
            ("Home/cat.jpg", jpeg_like(3)),
        ]));
        let store = MediaStore::in_memory().await.unwrap();
        let options = ImportOptions {
            prefix: Some(PathBuf::from("Trip")),
            folder: Some("Trip".to_string()),
            ..Default::default()
        };
        run(&source, &store, &options).await;

        let mut paths: Vec<_> = store.list_folders(None).await.unwrap().into_iter().map(|f| f.path).collect();
        paths.sort();
        assert_eq!(paths, ["Trip", "Trip/day2"]);
    }

    #[tokio::test]
    async fn test_loose_import_has_no_folders() {
        let source: BackendHandle = Arc::new(MockBackend::with_files([("x/a.jpg", jpeg_like(1))]));
        let store = MediaStore::in_memory().await.unwrap();
        run(&source, &store, &ImportOptions::default()).await;
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(store.list_folders(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_batch_ends_the_stream() {
        let source: BackendHandle = Arc::new(MockBackend::with_files([("a.jpg", jpeg_like(1)), ("b.jpg", jpeg_like(2))]));
        let mut store_options = shoebox_store::StoreOptions::memory();
        store_options.retry = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
        };
        let store = MediaStore::new(store_options).with_injected_failures(2);
        store.init().await.unwrap();

        let events: Vec<_> = import(&source, &store, &ImportOptions::default()).collect().await;
        let last = events.last().unwrap();
        let err = last.as_ref().unwrap_err();
        assert!(matches!(&**err, LibraryErrorKind::Import));
        assert!(!events.iter().any(|e| matches!(e, Ok(ImportEvent::Complete(_)))));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_file_does_not_stop_the_import() {
        let source: BackendHandle = Arc::new(
            MockBackend::with_files([("a.jpg", jpeg_like(1)), ("b.jpg", jpeg_like(2)), ("c.jpg", jpeg_like(3))])
                .failing_reads(["b.jpg"]),
        );
        let store = MediaStore::in_memory().await.unwrap();
        let events: Vec<_> = import(&source, &store, &ImportOptions::default()).collect().await;

        assert_eq!(events.iter().filter(|e| e.is_err()).count(), 1);
        let Some(Ok(ImportEvent::Complete(summary))) = events.last() else {
            panic!("import should complete");
        };
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.failed, 1);
        let mut names: Vec<_> = store.get_all().await.unwrap().into_iter().map(|i| i.file.name).collect();
        names.sort();
        assert_eq!(names, ["a.jpg", "c.jpg"]);
    }

    #[tokio::test]
    async fn test_empty_file_fails_alone() {
        let source: BackendHandle = Arc::new(MockBackend::with_files([
            ("a.jpg", jpeg_like(1)),
            ("b.jpg", jpeg_like(2)),
            ("empty.jpg", Vec::new()),
        ]));
        let store = MediaStore::in_memory().await.unwrap();
        let events: Vec<_> = import(&source, &store, &ImportOptions::default()).collect().await;

        assert_eq!(events.iter().filter(|e| e.is_err()).count(), 1);
        assert_eq!(
            events.last().unwrap().as_ref().unwrap(),
            &ImportEvent::Complete(ImportSummary {
                discovered: 3,
                imported: 2,
                skipped: 0,
                failed: 1,
            })
        );
        let mut names: Vec<_> = store.get_all().await.unwrap().into_iter().map(|i| i.file.name).collect();
        names.sort();
        assert_eq!(names, ["a.jpg", "b.jpg"]);
        assert!(store.find_corrupt().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_prefix_lists_nothing() {
        let source: BackendHandle = Arc::new(MockBackend::with_files([("a.jpg", jpeg_like(1))]));
        let store = MediaStore::in_memory().await.unwrap();
        let options = ImportOptions {
            prefix: Some(PathBuf::from("Nowhere")),
            ..Default::default()
        };
        let events = run(&source, &store, &options).await;
        assert_eq!(events.get(1), Some(&ImportEvent::DiscoveryComplete(0)));
        assert_eq!(events.last(), Some(&ImportEvent::Complete(ImportSummary::default())));
    }
}
