//! Layered configuration.
//!
//! Sources are merged in this order, later ones winning:
//!
//! 1. Built-in defaults,
//! 2. a TOML file (`--config`, else `config.toml` in the user config dir),
//! 3. `REEL_*` environment variables, nested keys split on `__`
//!    (e.g. `REEL_UPLOAD__WORKERS=2`),
//! 4. the older `RECORDINGS_PATH`, `DEFAULT_VISIBILITY` and `DEBUG_MODE`
//!    variables,
//! 5. command line flags, merged by the caller through [`Config::figment`].

pub mod error;

use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::value::{Uncased, UncasedStr};
use reel_remote::Visibility;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ErrorKind, Result};

/// Upload sessions are sent in multiples of this many bytes.
pub const CHUNK_GRANULARITY: u64 = 256 * 1024;
const ENV_PREFIX: &str = "REEL_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub recordings_path: Option<PathBuf>,
    /// Used for game/category/collection when the folder structure is too
    /// shallow; defaults to the recordings folder's own name.
    pub root_label: Option<String>,
    /// Only scan these top-level folders. Empty scans everything.
    pub main_folders: Vec<String>,
    pub visibility: Visibility,
    pub debug: bool,
    pub upload: UploadConfig,
    pub service: ServiceConfig,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            recordings_path: None,
            root_label: None,
            main_folders: Vec::new(),
            visibility: Visibility::Unlisted,
            debug: false,
            upload: UploadConfig::default(),
            service: ServiceConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Bytes per chunk; must be a multiple of [`CHUNK_GRANULARITY`].
    pub chunk_size: u64,
    /// Attempts per request before giving up, the first one included.
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub chunk_timeout_secs: u64,
    /// Candidates processed at the same time.
    pub workers: usize,
}
impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: 20 * CHUNK_GRANULARITY,
            max_attempts: 4,
            backoff_base_ms: 2_000,
            backoff_max_ms: 60_000,
            chunk_timeout_secs: 300,
            workers: 1,
        }
    }
}
impl UploadConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    pub fn chunk_timeout(&self) -> Duration {
        Duration::from_secs(self.chunk_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// OAuth access token for the hosting account.
    pub access_token: Option<String>,
    pub category_id: String,
    pub language: String,
}
impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            // "Gaming"
            category_id: "20".to_string(),
            language: "de".to_string(),
        }
    }
}

/// Maps the variables older setups export onto their current keys.
fn legacy_key(key: &UncasedStr) -> Option<Uncased<'_>> {
    let mapped = if key == "RECORDINGS_PATH" {
        "recordings_path"
    } else if key == "DEFAULT_VISIBILITY" {
        "visibility"
    } else if key == "DEBUG_MODE" {
        "debug"
    } else {
        return None;
    };
    Some(mapped.into())
}

/// `config.toml` in the platform's user config directory.
pub fn default_config_file() -> Option<PathBuf> {
    ProjectDirs::from("", "", "reel").map(|dirs| dirs.config_dir().join("config.toml"))
}

impl Config {
    /// Every source except command line flags. An explicitly named file has
    /// to exist, the default one is optional.
    pub fn figment(file: Option<&Path>) -> Figment {
        let figment = Figment::from(Serialized::defaults(Config::default()));
        let figment = match (file, default_config_file()) {
            (Some(file), _) => figment.merge(Toml::file_exact(file)),
            (None, Some(default)) => figment.merge(Toml::file(default)),
            (None, None) => figment,
        };
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Env::raw().filter_map(legacy_key))
    }

    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(file))
    }

    /// Extracts and validates; nothing else should run when this fails.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(?config.recordings_path, workers = config.upload.workers, "Configuration loaded");
        Ok(config)
    }

    /// The configured recordings folder, which must be set.
    pub fn recordings_path(&self) -> Result<&Path> {
        match self.recordings_path.as_deref() {
            Some(path) if !path.as_os_str().is_empty() => Ok(path),
            _ => exn::bail!(ErrorKind::MissingRecordingsPath),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &'static str, reason: &str| {
            exn::Exn::from(ErrorKind::Invalid {
                field,
                reason: reason.to_string(),
            })
        };
        self.recordings_path()?;
        let upload = &self.upload;
        if upload.chunk_size == 0 || upload.chunk_size % CHUNK_GRANULARITY != 0 {
            return Err(invalid("upload.chunk_size", "must be a positive multiple of 262144 bytes"));
        }
        if upload.max_attempts == 0 {
            return Err(invalid("upload.max_attempts", "must be at least 1"));
        }
        if upload.workers == 0 {
            return Err(invalid("upload.workers", "must be at least 1"));
        }
        if upload.backoff_base_ms > upload.backoff_max_ms {
            return Err(invalid("upload.backoff_base_ms", "must not exceed upload.backoff_max_ms"));
        }
        if upload.chunk_timeout_secs == 0 {
            return Err(invalid("upload.chunk_timeout_secs", "must be at least 1"));
        }
        if self.main_folders.iter().any(|folder| folder.trim().is_empty()) {
            return Err(invalid("main_folders", "folder names must not be empty"));
        }
        if self.service.category_id.trim().is_empty() {
            return Err(invalid("service.category_id", "must not be empty"));
        }
        if self.service.language.trim().is_empty() {
            return Err(invalid("service.language", "must not be empty"));
        }
        Ok(())
    }
}
