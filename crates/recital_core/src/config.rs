//! Per-poem display and ordering settings.
//!
//! # Responsibility
//! - Load `poemSettings.json` (`{order: [...], centered: [...]}`).
//! - Resolve the document order for a set of ingested titles.
//!
//! # Invariants
//! - `ordered_titles` returns every available title exactly once.

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Conventional settings file name inside a poem directory.
pub const SETTINGS_FILE_NAME: &str = "poemSettings.json";

#[derive(Debug)]
pub enum SettingsError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read settings `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid settings `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for SettingsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

/// Poem ordering and centering settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoemSettings {
    #[serde(default)]
    pub order: Vec<String>,
    #[serde(default)]
    pub centered: Vec<String>,
}

impl PoemSettings {
    /// Reads settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads `poemSettings.json` from `dir`, or defaults when it is absent.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = dir.as_ref().join(SETTINGS_FILE_NAME);
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn is_centered(&self, title: &str) -> bool {
        self.centered.iter().any(|candidate| candidate == title)
    }

    /// Orders `available` titles: listed titles first in listed order, then
    /// unlisted ones in title order.
    ///
    /// Listed titles with no source are skipped; both cases log a warning.
    pub fn ordered_titles<'a>(&self, available: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut remaining: BTreeSet<&str> = available.into_iter().collect();
        let mut ordered = Vec::with_capacity(remaining.len());

        for title in &self.order {
            if remaining.remove(title.as_str()) {
                ordered.push(title.clone());
            } else if !ordered.contains(title) {
                warn!("event=settings_order module=config status=skipped reason=missing_source");
            }
        }
        for title in remaining {
            warn!("event=settings_order module=config status=appended reason=unlisted_title");
            ordered.push(title.to_string());
        }
        ordered
    }
}
