//! Runtime configuration for the core and its host processes.
//!
//! Values come from an optional TOML file, then environment overrides.
//! Every key is optional; missing keys keep their defaults.
//!
//! ```toml
//! db_path = "/var/lib/mentorlink/mentorlink.db"
//! log_level = "info"
//! log_dir = "/var/log/mentorlink"
//! notify_on_assignment = true
//! ```

use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "MENTORLINK_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "MENTORLINK_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "MENTORLINK_LOG_DIR";

const DEFAULT_DB_PATH: &str = "mentorlink.db";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    db_path: Option<PathBuf>,
    log_level: Option<String>,
    log_dir: Option<PathBuf>,
    notify_on_assignment: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// `None` logs to stderr instead of rotating files.
    pub log_dir: Option<PathBuf>,
    pub notify_on_assignment: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_level: default_log_level().to_string(),
            log_dir: None,
            notify_on_assignment: true,
        }
    }
}

impl CoreConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            source: err,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(contents).map_err(ConfigError::Parse)?;
        let mut config = Self::default();

        if let Some(path) = file.db_path {
            config.db_path = path;
        }
        if let Some(level) = file.log_level {
            config.log_level = level;
        }
        if file.log_dir.is_some() {
            config.log_dir = file.log_dir;
        }
        if let Some(enabled) = file.notify_on_assignment {
            config.notify_on_assignment = enabled;
        }

        Ok(config)
    }

    /// Applies `MENTORLINK_*` environment overrides from the process env.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary lookup. Empty values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(path) = lookup(ENV_DB_PATH) {
            self.db_path = PathBuf::from(path);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(dir) = lookup(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(dir));
        }
        self
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "unable to read config file `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "unable to parse config file: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
        }
    }
}
