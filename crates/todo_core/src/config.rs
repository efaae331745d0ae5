//! Store selection and location resolution.
//!
//! # Responsibility
//! - Turn environment settings into one resolved backend + path.
//! - Open the selected local store once at startup.
//!
//! # Invariants
//! - An explicit `TODO_PATH` always wins over home-directory resolution.
//! - A home-directory file is used only when it already exists; otherwise
//!   the bare file name resolves against the working directory.
//! - Remote stores are not built here; they need a caller-supplied client.

use crate::store::file_store::{FileTodoStore, FILE_NAME};
use crate::store::sqlite_store::{SqliteTodoStore, DB_FILE_NAME};
use crate::store::{StoreResult, TodoStore};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Backend selector, e.g. `file` or `sqlite`.
pub const STORE_MODE_ENV: &str = "TODO_STORE";
/// Explicit store location override.
pub const STORE_PATH_ENV: &str = "TODO_PATH";
/// Log level used by binaries embedding the core.
pub const LOG_LEVEL_ENV: &str = "TODO_LOG_LEVEL";
/// Absolute log directory used by binaries embedding the core.
pub const LOG_DIR_ENV: &str = "TODO_LOG_DIR";
const HOME_ENV: &str = "HOME";

/// Local persistence backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreMode {
    /// JSON snapshot file.
    #[default]
    File,
    /// SQLite database file.
    Sqlite,
}

impl StoreMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Sqlite => "sqlite",
        }
    }

    /// File name used when no explicit path is configured.
    pub fn default_file_name(self) -> &'static str {
        match self {
            Self::File => FILE_NAME,
            Self::Sqlite => DB_FILE_NAME,
        }
    }
}

impl FromStr for StoreMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" | "json" => Ok(Self::File),
            "sqlite" | "db" => Ok(Self::Sqlite),
            other => Err(ConfigError::UnsupportedMode(other.to_string())),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    UnsupportedMode(String),
    EmptyPath,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedMode(value) => write!(
                f,
                "unsupported store mode `{value}`; expected file|json|sqlite|db"
            ),
            Self::EmptyPath => write!(f, "{STORE_PATH_ENV} is set but empty"),
        }
    }
}

impl Error for ConfigError {}

/// Resolved store selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub mode: StoreMode,
    pub path: PathBuf,
}

impl StoreConfig {
    pub fn new(mode: StoreMode, path: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            path: path.into(),
        }
    }

    /// Reads `TODO_STORE`, `TODO_PATH` and `HOME` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mode = match lookup(STORE_MODE_ENV) {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => StoreMode::default(),
        };

        let path = match lookup(STORE_PATH_ENV) {
            Some(value) if value.trim().is_empty() => return Err(ConfigError::EmptyPath),
            Some(value) => PathBuf::from(value.trim()),
            None => {
                let home = lookup(HOME_ENV).filter(|value| !value.trim().is_empty());
                resolve_store_path(mode, home.as_deref().map(Path::new))
            }
        };

        Ok(Self { mode, path })
    }
}

/// Picks `<home>/<file>` when it exists, else `<file>` in the working directory.
pub fn resolve_store_path(mode: StoreMode, home: Option<&Path>) -> PathBuf {
    let file_name = mode.default_file_name();
    if let Some(home) = home {
        let candidate = home.join(file_name);
        if candidate.exists() {
            return candidate;
        }
    }
    PathBuf::from(file_name)
}

/// Opens the configured local store.
pub fn open_store(config: &StoreConfig) -> StoreResult<Box<dyn TodoStore>> {
    info!(
        "event=store_open module=config status=start mode={} path={}",
        config.mode.as_str(),
        config.path.display()
    );

    let store: Box<dyn TodoStore> = match config.mode {
        StoreMode::File => Box::new(FileTodoStore::open(&config.path)),
        StoreMode::Sqlite => Box::new(SqliteTodoStore::open(&config.path)?),
    };
    Ok(store)
}
