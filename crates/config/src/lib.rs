//! Layered configuration.
//!
//! Values are merged, later layers winning:
//!
//! 1. built-in defaults,
//! 2. `config.{toml,yaml,json}` in the platform config directory,
//! 3. a file passed explicitly (e.g. `--config`),
//! 4. `SHOEBOX_` environment variables, nested with `__`
//!    (`SHOEBOX_BATCH__MAX_ATTEMPTS=5`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use shoebox_media::PreviewOptions;
use shoebox_store::{RetryPolicy, StoreOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "SHOEBOX_";
const DATABASE_FILE: &str = "media.sqlite";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub database: DatabaseConfig,
    pub batch: BatchConfig,
    pub preview: PreviewConfig,
    pub preferences: PreferencesConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Defaults to `media.sqlite` in the platform data directory.
    pub path: Option<PathBuf>,
    pub max_connections: u32,
}
impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// Records per `put_batch` call during import.
    pub size: usize,
    /// Total attempts per batch, including the first.
    pub max_attempts: u32,
    /// Wait before the second attempt; doubles for each one after.
    pub base_delay_ms: u64,
}
impl Default for BatchConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            size: 50,
            max_attempts: retry.max_attempts,
            base_delay_ms: retry.base_delay.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    pub max_edge: u32,
    pub jpeg_quality: u8,
}
impl Default for PreviewConfig {
    fn default() -> Self {
        let options = PreviewOptions::default();
        Self {
            max_edge: options.max_edge,
            jpeg_quality: options.jpeg_quality,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreferencesConfig {
    /// Directory of the side store. Defaults to the platform data directory.
    pub dir: Option<PathBuf>,
    /// File name the preferences are kept under.
    pub key: String,
}
impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            dir: None,
            key: "preferences.json".to_string(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "shoebox")
}

impl Config {
    /// Load configuration from every layer, then validate it.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(explicit)?)
    }

    /// Build the layered provider without extracting it.
    pub fn figment(explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(dirs) = project_dirs() {
            let dir = dirs.config_dir();
            figment = figment
                .merge(Toml::file(dir.join("config.toml")))
                .merge(Yaml::file(dir.join("config.yaml")))
                .merge(Json::file(dir.join("config.json")));
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            }
            figment = match path.extension().and_then(|e| e.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(?config, "Configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            exn::bail!(ErrorKind::Invalid("database.max_connections must be at least 1"));
        }
        if self.batch.size == 0 {
            exn::bail!(ErrorKind::Invalid("batch.size must be at least 1"));
        }
        if self.batch.max_attempts == 0 {
            exn::bail!(ErrorKind::Invalid("batch.max_attempts must be at least 1"));
        }
        if self.preview.max_edge == 0 {
            exn::bail!(ErrorKind::Invalid("preview.max_edge must be at least 1"));
        }
        if !(1..=100).contains(&self.preview.jpeg_quality) {
            exn::bail!(ErrorKind::Invalid("preview.jpeg_quality must be between 1 and 100"));
        }
        let key = Path::new(&self.preferences.key);
        if self.preferences.key.is_empty() || key.components().count() != 1 || key.is_absolute() {
            exn::bail!(ErrorKind::Invalid("preferences.key must be a plain file name"));
        }
        Ok(())
    }

    fn data_dir() -> Result<PathBuf> {
        project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_raise(|| ErrorKind::NoDataDirectory)
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join(DATABASE_FILE)),
        }
    }

    pub fn preferences_dir(&self) -> Result<PathBuf> {
        match &self.preferences.dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::data_dir(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.batch.max_attempts,
            base_delay: Duration::from_millis(self.batch.base_delay_ms),
        }
    }

    pub fn preview_options(&self) -> PreviewOptions {
        PreviewOptions {
            max_edge: self.preview.max_edge,
            jpeg_quality: self.preview.jpeg_quality,
        }
    }

    pub fn store_options(&self) -> Result<StoreOptions> {
        let mut options = StoreOptions::file(self.database_path()?);
        options.max_connections = self.database.max_connections;
        options.retry = self.retry_policy();
        Ok(options)
    }
}
