//! Core domain logic for the poem recital trainer.
//!
//! Encodes poems into word-addressable canonical text, keeps quote and note
//! annotations consistent with it, and persists both in SQLite.

pub mod annotation;
pub mod api;
pub mod config;
pub mod db;
pub mod encoding;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod practice;
pub mod repo;
pub mod service;

pub use annotation::checker::{reconcile, Reconciliation, ValidAnnotations};
pub use annotation::rules::{AnnotationRejection, SequenceMismatch, MAX_NOTES_PER_WORD};
pub use api::{AnnotationEdit, DeleteRequest, EditRequest, EditResponse, NoteVersion};
pub use config::{PoemSettings, SettingsError};
pub use encoding::addressing::{element_id, letter_key, occurrence_key};
pub use encoding::word_encoder::{encode_poem, EncodedPoem};
pub use ingest::{load_poem_sources, parse_raw_poem, IngestError, PoemSources, RawPoem};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::annotation::{AnnotationKind, Note, Quote, NEW_ANNOTATION_IDENTIFIER};
pub use model::canonical::{
    CanonicalText, CanonicalTextError, OccurrenceKey, OccurrenceSequence, Section, Token,
};
pub use model::invalid_log::{InvalidAnnotations, RejectionReason};
pub use model::poem::{CanonicalPoem, PoemDocument, PoemDocumentEntry, PoemRecord};
pub use repo::poem_repo::{
    InvalidLogEntry, PoemRepository, RepoError, RepoResult, SqlitePoemRepository,
};
pub use service::annotation_service::{AnnotationService, AnnotationServiceError};
pub use service::ingest_service::{
    IngestReport, IngestService, IngestServiceError, PoemIngestSummary,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
