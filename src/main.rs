mod cli;
mod error;

use crate::cli::{Cli, Command, PrefsCommand, sort_order};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::{OptionExt, ResultExt};
use futures::StreamExt;
use shoebox_config::Config;
use shoebox_library::preferences::PreferenceStore;
use shoebox_library::{Bounds, FilterOptions, ImportEvent, ImportOptions, SortOptions};
use shoebox_media::{MediaItem, MediaKind};
use shoebox_storage::BackendHandle;
use shoebox_storage::backend::{LocalBackend, ReadOnlyBackend};
use shoebox_store::MediaStore;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:?}");
            ExitCode::FAILURE
        },
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    if let Command::Prefs(command) = cli.command {
        return prefs(&config, command).await;
    }

    let options = config.store_options().or_raise(|| ErrorKind::Config)?;
    tracing::debug!(location = ?options.location, "Opening gallery");
    let store = MediaStore::new(options);
    store.init().await.or_raise(|| ErrorKind::Store)?;
    let result = dispatch(&config, &store, cli.command).await;
    store.close().await;
    result
}

async fn dispatch(config: &Config, store: &MediaStore, command: Command) -> Result<()> {
    match command {
        Command::Import { dir, folder, loose } => import(config, store, &dir, folder, loose).await,
        Command::List {
            kind,
            folder,
            search,
            min_size,
            max_size,
            sort,
            desc,
        } => {
            let items = match kind {
                Some(kind) => store.get_by_kind(kind.into()).await,
                None => store.get_all().await,
            }
            .or_raise(|| ErrorKind::Store)?;
            let filters = FilterOptions {
                size_range: (min_size.is_some() || max_size.is_some()).then(|| Bounds::new(min_size, max_size)),
                search_query: search,
                ..Default::default()
            };
            let sorting = SortOptions {
                sort_by: sort.into(),
                order: sort_order(desc),
            };
            let items = match folder {
                Some(folder) => shoebox_library::current_folder_files(&items, &folder, &filters, &sorting),
                None => shoebox_library::sort(shoebox_library::filter(&items, &filters), &sorting),
            };
            for item in &items {
                print_row(item);
            }
            Ok(())
        },
        Command::Folders { kind } => {
            let folders = store.list_folders(kind.map(MediaKind::from)).await.or_raise(|| ErrorKind::Store)?;
            print_json(&folders)
        },
        Command::Stats => print_json(&store.stats().await.or_raise(|| ErrorKind::Store)?),
        Command::Show { id } => {
            let item = find(store, &id).await?;
            print_row(&item);
            println!("  type:      {}", item.file.mime_type.as_deref().unwrap_or(item.kind.default_mime_type()));
            println!("  format:    {}", item.metadata.format);
            if let Some(dimensions) = item.metadata.dimensions {
                println!("  size:      {}x{}", dimensions.width, dimensions.height);
            }
            if let Some(duration) = item.metadata.duration_seconds {
                println!("  duration:  {duration:.1}s");
            }
            println!("  preview:   {} bytes", item.preview.len());
            println!("  added:     {}", format_millis(item.added_at));
            Ok(())
        },
        Command::Export { id, dest } => {
            let item = find(store, &id).await?;
            let dest = if dest.is_dir() { dest.join(item.name()) } else { dest };
            tokio::fs::write(&dest, &item.file.bytes).await.or_raise(|| ErrorKind::Export(dest.clone()))?;
            println!("{} → {}", item.name(), dest.display());
            Ok(())
        },
        Command::Delete { ids } => {
            let deleted = match ids.as_slice() {
                [id] => u64::from(store.delete(id).await.or_raise(|| ErrorKind::Store)?),
                _ => store.delete_batch(ids.as_slice()).await.or_raise(|| ErrorKind::Store)?,
            };
            println!("deleted {deleted} of {}", ids.len());
            Ok(())
        },
        Command::Clear => {
            let deleted = store.clear().await.or_raise(|| ErrorKind::Store)?;
            println!("deleted {deleted}");
            Ok(())
        },
        Command::PurgeCorrupt => print_json(&store.purge_corrupt().await.or_raise(|| ErrorKind::Store)?),
        Command::Prefs(command) => prefs(config, command).await,
    }
}

async fn import(config: &Config, store: &MediaStore, dir: &Path, folder: Option<String>, loose: bool) -> Result<()> {
    let root = tokio::fs::canonicalize(dir)
        .await
        .or_raise(|| ErrorKind::InvalidArgument(format!("cannot open {}", dir.display())))?;
    let folder = match (loose, folder) {
        (true, _) => None,
        (false, Some(folder)) => Some(folder),
        (false, None) => root.file_name().map(|name| name.to_string_lossy().into_owned()),
    };
    let local = LocalBackend::new("import", &root).or_raise(|| ErrorKind::Import)?;
    let source: BackendHandle = Arc::new(ReadOnlyBackend::new(Arc::new(local)));
    let options = ImportOptions {
        prefix: None,
        folder,
        batch_size: config.batch.size,
        preview: config.preview_options(),
    };

    let mut events = std::pin::pin!(shoebox_library::import(&source, store, &options));
    while let Some(event) = events.next().await {
        match event {
            Ok(ImportEvent::Started) => {},
            Ok(ImportEvent::DiscoveryComplete(n)) => println!("found {n} files in {}", root.display()),
            Ok(ImportEvent::Skipped(path)) => println!("skipped {}", path.display()),
            Ok(ImportEvent::BatchWritten { total, .. }) => println!("imported {total}"),
            Ok(ImportEvent::Complete(summary)) => {
                println!(
                    "done: {} imported, {} skipped, {} failed",
                    summary.imported, summary.skipped, summary.failed
                );
                return Ok(());
            },
            // Individual files are reported and the import carries on; the
            // stream ends by itself on anything fatal.
            Err(e) => eprintln!("{e:?}"),
        }
    }
    exn::bail!(ErrorKind::Import)
}

async fn prefs(config: &Config, command: PrefsCommand) -> Result<()> {
    let dir = config.preferences_dir().or_raise(|| ErrorKind::Config)?;
    let backend = LocalBackend::new("preferences", dir).or_raise(|| ErrorKind::Preferences)?;
    let preferences = PreferenceStore::new(Arc::new(backend), &config.preferences.key);
    match command {
        PrefsCommand::Get => match preferences.load::<serde_json::Value>().await {
            Some(value) => print_json(&value),
            None => {
                println!("no preferences saved");
                Ok(())
            },
        },
        PrefsCommand::Set { json } => {
            let value: serde_json::Value =
                serde_json::from_str(&json).or_raise(|| ErrorKind::InvalidArgument("preferences must be JSON".into()))?;
            if !preferences.save(&value).await {
                exn::bail!(ErrorKind::Preferences);
            }
            Ok(())
        },
        PrefsCommand::Clear => {
            if !preferences.clear().await {
                exn::bail!(ErrorKind::Preferences);
            }
            Ok(())
        },
    }
}

async fn find(store: &MediaStore, id: &str) -> Result<MediaItem> {
    store
        .get_by_id(id)
        .await
        .or_raise(|| ErrorKind::Store)?
        .ok_or_raise(|| ErrorKind::NotFound(id.to_string()))
}

fn print_row(item: &MediaItem) {
    println!(
        "{}  {:<5}  {:>10}  {}  {}{}",
        item.id,
        item.kind.as_str(),
        item.size(),
        format_millis(item.last_modified()),
        item.folder_path().map(|p| format!("{p}/")).unwrap_or_default(),
        item.name(),
    );
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).or_raise(|| ErrorKind::InvalidArgument("unprintable value".into()))?;
    println!("{json}");
    Ok(())
}

fn format_millis(millis: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| millis.to_string())
}
