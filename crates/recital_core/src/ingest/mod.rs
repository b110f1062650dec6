//! Raw poem ingestion inputs.
//!
//! # Responsibility
//! - Split raw poem files into title, body and author (`raw`).
//! - Collect raw poem files from a directory (`source`).
//!
//! # Invariants
//! - A file whose first line differs from its title is a fatal error for the
//!   whole ingestion run.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod raw;
pub mod source;

pub use raw::{parse_raw_poem, RawPoem};
pub use source::{load_poem_sources, PoemSources};

/// Structural ingestion failure.
#[derive(Debug)]
pub enum IngestError {
    /// First line of the file differs from its external title.
    TitleMismatch { expected: String, found: String },
    /// No non-empty line after the title to read an author from.
    MissingAuthor { title: String },
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Display for IngestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TitleMismatch { expected, found } => write!(
                f,
                "poem file name doesn't equal poem name in file: `{expected}` != `{found}`"
            ),
            Self::MissingAuthor { title } => write!(f, "poem `{title}` has no author line"),
            Self::Io { path, source } => write!(f, "failed to read `{}`: {source}", path.display()),
        }
    }
}

impl Error for IngestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
