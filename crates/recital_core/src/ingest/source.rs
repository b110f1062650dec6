//! Directory of raw `*.txt` poem files.

use super::IngestError;
use log::debug;
use std::collections::BTreeMap;
use std::path::Path;

/// Title to raw blob, keyed by file stem.
pub type PoemSources = BTreeMap<String, String>;

const POEM_EXTENSION: &str = "txt";

/// Reads every `*.txt` file directly under `dir`.
///
/// Subdirectories and other extensions are ignored.
pub fn load_poem_sources(dir: impl AsRef<Path>) -> Result<PoemSources, IngestError> {
    let dir = dir.as_ref();
    let io_error = |source: std::io::Error| IngestError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut sources = PoemSources::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some(POEM_EXTENSION)
        {
            continue;
        }
        let Some(title) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let blob = std::fs::read_to_string(&path).map_err(|source| IngestError::Io {
            path: path.clone(),
            source,
        })?;
        sources.insert(title.to_string(), blob);
    }

    debug!(
        "event=poem_sources_load module=ingest status=ok count={}",
        sources.len()
    );
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::load_poem_sources;
    use tempfile::TempDir;

    #[test]
    fn only_text_files_are_loaded() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Echo.txt"), "Echo\n\nbody\n\nAnon").unwrap();
        std::fs::write(dir.path().join("poemSettings.json"), "{}").unwrap();
        std::fs::create_dir(dir.path().join("drafts.txt")).unwrap();

        let sources = load_poem_sources(dir.path()).unwrap();
        assert_eq!(sources.keys().collect::<Vec<_>>(), vec!["Echo"]);
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_poem_sources(dir.path().join("absent")).is_err());
    }
}
