//! Poem ingestion and reconciliation use-case.
//!
//! # Responsibility
//! - Encode every raw poem of a batch into canonical text.
//! - Carry prior annotations forward through the consistency checker and
//!   demote the ones the new text invalidates.
//! - Write the batch and its invalid-log appends atomically.
//!
//! # Invariants
//! - Every poem is parsed and encoded before storage is touched; one bad
//!   file aborts the run with nothing written.
//! - Demoted annotations are dropped from the live record and appended to
//!   the invalid log under the run id.
//! - Stored poems without a source in the batch are removed.

use crate::annotation::checker::reconcile;
use crate::annotation::ordering::{order_notes, order_quotes};
use crate::config::{PoemSettings, SettingsError};
use crate::encoding::word_encoder::encode_poem;
use crate::ingest::{load_poem_sources, parse_raw_poem, IngestError, PoemSources};
use crate::model::canonical::{CanonicalTextError, OccurrenceSequence};
use crate::model::invalid_log::DemotedAnnotations;
use crate::model::poem::{CanonicalPoem, PoemDocument, PoemRecord};
use crate::repo::poem_repo::{PoemRepository, RepoError};
use log::{error, info, warn};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug)]
pub enum IngestServiceError {
    Ingest(IngestError),
    Settings(SettingsError),
    /// A restored document carries malformed canonical text.
    Document {
        title: String,
        source: CanonicalTextError,
    },
    Repo(RepoError),
}

impl Display for IngestServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ingest(err) => write!(f, "{err}"),
            Self::Settings(err) => write!(f, "{err}"),
            Self::Document { title, source } => {
                write!(f, "document entry `{title}` is malformed: {source}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for IngestServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Ingest(err) => Some(err),
            Self::Settings(err) => Some(err),
            Self::Document { source, .. } => Some(source),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<IngestError> for IngestServiceError {
    fn from(value: IngestError) -> Self {
        Self::Ingest(value)
    }
}

impl From<SettingsError> for IngestServiceError {
    fn from(value: SettingsError) -> Self {
        Self::Settings(value)
    }
}

impl From<RepoError> for IngestServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Per-poem outcome of one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoemIngestSummary {
    pub title: String,
    pub author: String,
    pub word_count: u32,
    /// `false` when the poem had a stored record before this run.
    pub is_new: bool,
    pub carried_notes: usize,
    pub carried_quotes: usize,
    pub demoted_notes: usize,
    pub demoted_quotes: usize,
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub run_id: Uuid,
    /// Poems in document order.
    pub poems: Vec<PoemIngestSummary>,
    /// Titles deleted because their source disappeared.
    pub removed: Vec<String>,
}

impl IngestReport {
    pub fn demoted_total(&self) -> usize {
        self.poems
            .iter()
            .map(|poem| poem.demoted_notes + poem.demoted_quotes)
            .sum()
    }
}

/// Ingestion service facade over repository implementations.
pub struct IngestService<R: PoemRepository> {
    repo: R,
}

impl<R: PoemRepository> IngestService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Loads `*.txt` sources and `poemSettings.json` from `dir`, then ingests.
    pub fn ingest_dir(&mut self, dir: impl AsRef<Path>) -> Result<IngestReport, IngestServiceError> {
        let dir = dir.as_ref();
        let sources = load_poem_sources(dir)?;
        let settings = PoemSettings::load_from_dir(dir)?;
        self.ingest(&sources, &settings)
    }

    /// Re-encodes the whole poem set and reconciles stored annotations.
    ///
    /// # Errors
    /// - `Ingest` when any source fails structural checks; nothing is written.
    /// - `Repo` when storage fails; the transaction is rolled back.
    pub fn ingest(
        &mut self,
        sources: &PoemSources,
        settings: &PoemSettings,
    ) -> Result<IngestReport, IngestServiceError> {
        let started_at = Instant::now();
        let run_id = Uuid::new_v4();
        info!(
            "event=ingest_run module=service status=start run_id={} sources={}",
            run_id,
            sources.len()
        );

        match self.ingest_inner(run_id, sources, settings) {
            Ok(report) => {
                info!(
                    "event=ingest_run module=service status=ok run_id={} poems={} removed={} demoted={} duration_ms={}",
                    run_id,
                    report.poems.len(),
                    report.removed.len(),
                    report.demoted_total(),
                    started_at.elapsed().as_millis()
                );
                Ok(report)
            }
            Err(err) => {
                error!(
                    "event=ingest_run module=service status=error run_id={} duration_ms={} error={}",
                    run_id,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Replaces the stored poem set with a previously exported document.
    ///
    /// Returns the number of poems restored. The invalid log is untouched.
    pub fn restore_document(&mut self, document: PoemDocument) -> Result<usize, IngestServiceError> {
        let records = document
            .into_records()
            .map_err(|(title, source)| IngestServiceError::Document { title, source })?;
        let removed = self.repo.replace_poem_set(&records, &[])?;
        info!(
            "event=document_restore module=service status=ok poems={} removed={}",
            records.len(),
            removed.len()
        );
        Ok(records.len())
    }

    fn ingest_inner(
        &mut self,
        run_id: Uuid,
        sources: &PoemSources,
        settings: &PoemSettings,
    ) -> Result<IngestReport, IngestServiceError> {
        let titles = settings.ordered_titles(sources.keys().map(String::as_str));
        let mut encoded = Vec::with_capacity(titles.len());
        for title in &titles {
            let Some(blob) = sources.get(title) else {
                continue;
            };
            let raw = parse_raw_poem(title, blob)?;
            let poem = encode_poem(&raw.body);
            encoded.push((
                raw.title,
                CanonicalPoem {
                    text: poem.text,
                    word_count: poem.word_count,
                    author: raw.author,
                    centered: settings.is_centered(title),
                },
            ));
        }

        let mut previous: HashMap<String, PoemRecord> = self
            .repo
            .load_all()?
            .into_iter()
            .map(|record| (record.title.clone(), record))
            .collect();

        let mut records = Vec::with_capacity(encoded.len());
        let mut demoted = Vec::new();
        let mut summaries = Vec::with_capacity(encoded.len());
        for (title, poem) in encoded {
            let mut record = PoemRecord::new(title.clone(), poem);
            let mut summary = PoemIngestSummary {
                title: title.clone(),
                author: record.poem.author.clone(),
                word_count: record.poem.word_count,
                is_new: true,
                carried_notes: 0,
                carried_quotes: 0,
                demoted_notes: 0,
                demoted_quotes: 0,
            };

            if let Some(prior) = previous.remove(&title) {
                let result = reconcile(&prior.notes, &prior.quotes, &record.poem.text);
                let sequence = OccurrenceSequence::from_text(&record.poem.text);
                record.notes = result.valid.notes;
                record.quotes = result.valid.quotes;
                order_notes(&mut record.notes, &sequence);
                order_quotes(&mut record.quotes, &sequence);

                summary.is_new = false;
                summary.carried_notes = record.notes.len();
                summary.carried_quotes = record.quotes.len();
                summary.demoted_notes = result.invalid.note_count();
                summary.demoted_quotes = result.invalid.quote_count();

                if !result.invalid.is_empty() {
                    warn!(
                        "event=annotation_demote module=service status=ok run_id={} notes={} quotes={}",
                        run_id, summary.demoted_notes, summary.demoted_quotes
                    );
                    demoted.push(DemotedAnnotations {
                        run_id,
                        poem_title: title,
                        invalid: result.invalid,
                    });
                }
            }

            records.push(record);
            summaries.push(summary);
        }

        let removed = self.repo.replace_poem_set(&records, &demoted)?;
        Ok(IngestReport {
            run_id,
            poems: summaries,
            removed,
        })
    }
}
