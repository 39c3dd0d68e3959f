//! Waybill configuration.
//!
//! Loaded from `~/.waybill/config.toml`. Every key is optional; a missing
//! file means defaults.
//!
//! ```toml
//! identity = "alice"
//! database = "/var/lib/waybill/waybill.sqlite"
//! transitions = "strict"          # or "permissive"
//! denylist = ["bomb", "weapon"]   # replaces the built-in list
//! ```

use std::{fs, io, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::lifecycle::TransitionMode;
use crate::policy::KeywordDenylist;
use crate::storage::Storage;

/// Waybill configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Config {
    /// Default caller identity when neither `--as` nor `WAYBILL_IDENTITY` is set.
    pub identity: Option<String>,

    /// Path to the `SQLite` database.
    pub database: Option<PathBuf>,

    /// Whether status updates must follow the lifecycle graph.
    pub transitions: TransitionMode,

    /// Prohibited description keywords. Replaces the built-in list when set.
    pub denylist: Option<Vec<String>>,
}

impl Config {
    /// Load config from `~/.waybill/config.toml`.
    ///
    /// Returns defaults if the file doesn't exist, and an error if it can't
    /// be read or parsed.
    pub fn load() -> Result<Self, String> {
        let Some(path) = Self::path() else {
            return Ok(Self::default());
        };

        let contents = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };

        let config = Self::parse(&contents)
            .map_err(|e| format!("invalid config at {}: {e}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse config from TOML text.
    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// The config file path: `~/.waybill/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".waybill").join("config.toml"))
    }

    /// The configured database path, falling back to the default location.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database.clone().or_else(Storage::default_path)
    }

    /// The content policy this config describes.
    pub fn denylist(&self) -> KeywordDenylist {
        match &self.denylist {
            Some(keywords) => KeywordDenylist::new(keywords),
            None => KeywordDenylist::default(),
        }
    }
}
