use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use shoebox_library::{SortBy, SortOrder};
use shoebox_media::MediaKind;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "shoebox", version, about = "Import, browse and maintain a local image/video gallery")]
pub struct Cli {
    /// Extra configuration file (TOML, YAML or JSON), layered over the
    /// platform one.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// More logging; repeat for more. `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import every image and video under a directory.
    Import {
        dir: PathBuf,
        /// Folder to file the items under. Defaults to the directory's name.
        #[arg(long, conflicts_with = "loose")]
        folder: Option<String>,
        /// Import without any folder.
        #[arg(long)]
        loose: bool,
    },
    /// List stored media.
    List {
        #[arg(long, value_enum)]
        kind: Option<Kind>,
        /// Only items directly inside this folder path.
        #[arg(long)]
        folder: Option<String>,
        /// Case-insensitive substring of the name.
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        min_size: Option<u64>,
        #[arg(long)]
        max_size: Option<u64>,
        #[arg(long, value_enum, default_value_t = SortKey::Name)]
        sort: SortKey,
        #[arg(long)]
        desc: bool,
    },
    /// Summarise folders, most recently modified first.
    Folders {
        #[arg(long, value_enum)]
        kind: Option<Kind>,
    },
    /// Totals across the whole gallery.
    Stats,
    /// Show one item's details.
    Show { id: String },
    /// Write one item's original bytes to a file or directory.
    Export { id: String, dest: PathBuf },
    /// Delete items by id.
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Delete every item.
    Clear,
    /// Delete records whose original bytes are missing.
    PurgeCorrupt,
    /// Manage saved UI preferences.
    #[command(subcommand)]
    Prefs(PrefsCommand),
}

#[derive(Debug, Subcommand)]
pub enum PrefsCommand {
    Get,
    /// Replace the saved preferences with a JSON document.
    Set { json: String },
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Kind {
    Image,
    Video,
}
impl From<Kind> for MediaKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Image => MediaKind::Image,
            Kind::Video => MediaKind::Video,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
    Name,
    Size,
    Date,
}
impl From<SortKey> for SortBy {
    fn from(key: SortKey) -> Self {
        match key {
            SortKey::Name => SortBy::Name,
            SortKey::Size => SortBy::Size,
            SortKey::Date => SortBy::Date,
        }
    }
}

pub fn sort_order(desc: bool) -> SortOrder {
    if desc { SortOrder::Desc } else { SortOrder::Asc }
}
