//! Annotation edit use-cases.
//!
//! # Responsibility
//! - Validate and apply one note or quote mutation against a stored poem.
//! - Keep each poem's notes and quotes in poem order.
//! - Translate UI request envelopes into service calls.
//!
//! # Invariants
//! - A rejected edit performs no write.
//! - Every edit is read-validate-write against the latest stored record;
//!   callers serialize concurrent edits to the same poem.
//! - Deletes are idempotent: removing an absent annotation succeeds without
//!   writing.

use crate::annotation::ordering::{order_notes, order_quotes, order_words};
use crate::annotation::rules::{
    check_contiguous, first_missing_word, overcrowded_note_word, overlapping_quote_word,
    AnnotationRejection,
};
use crate::api::{AnnotationEdit, DeleteRequest, EditRequest, EditResponse};
use crate::model::annotation::{is_new_identifier, upsert_note, AnnotationKind, Note, Quote};
use crate::model::canonical::{OccurrenceKey, OccurrenceSequence};
use crate::model::poem::{PoemDocument, PoemRecord};
use crate::repo::poem_repo::{PoemRepository, RepoError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for annotation use-cases.
#[derive(Debug)]
pub enum AnnotationServiceError {
    /// Edit failed a validity rule; storage is unchanged.
    Rejected(AnnotationRejection),
    PoemNotFound(String),
    /// `oldIdentifier` names no stored annotation.
    AnnotationNotFound {
        kind: AnnotationKind,
        identifier: String,
    },
    /// Request is malformed (blank label, empty word list, bad payload).
    InvalidRequest(String),
    Repo(RepoError),
}

impl Display for AnnotationServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(rejection) => write!(f, "{}: {rejection}", rejection.error_type()),
            Self::PoemNotFound(title) => write!(f, "poem not found: `{title}`"),
            Self::AnnotationNotFound { kind, identifier } => {
                write!(f, "{} not found: `{identifier}`", kind.as_str())
            }
            Self::InvalidRequest(message) => write!(f, "invalid request: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AnnotationServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Rejected(rejection) => Some(rejection),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AnnotationServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::PoemNotFound(title) => Self::PoemNotFound(title),
            other => Self::Repo(other),
        }
    }
}

impl From<AnnotationRejection> for AnnotationServiceError {
    fn from(value: AnnotationRejection) -> Self {
        Self::Rejected(value)
    }
}

pub type AnnotationResult<T> = Result<T, AnnotationServiceError>;

/// Annotation service facade over repository implementations.
pub struct AnnotationService<R: PoemRepository> {
    repo: R,
}

impl<R: PoemRepository> AnnotationService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn get_poem(&self, title: &str) -> AnnotationResult<PoemRecord> {
        self.repo
            .get_poem(title)?
            .ok_or_else(|| AnnotationServiceError::PoemNotFound(title.to_string()))
    }

    pub fn list_titles(&self) -> AnnotationResult<Vec<String>> {
        Ok(self.repo.list_titles()?)
    }

    pub fn export_document(&self) -> AnnotationResult<PoemDocument> {
        Ok(self.repo.export_document()?)
    }

    /// Inserts (`old_label == "__NEW__"`) or replaces one note.
    ///
    /// The stored word list is reordered into poem order. When `new_label`
    /// already names another note, that note is replaced.
    ///
    /// # Errors
    /// - `Rejected(WordNoLongerExists)` for a word missing from the poem.
    /// - `Rejected(FourOverlaps)` when a word would gain a fourth note.
    /// - `AnnotationNotFound` when `old_label` names no stored note.
    pub fn edit_note(
        &mut self,
        poem_name: &str,
        old_label: &str,
        new_label: &str,
        words: Vec<OccurrenceKey>,
    ) -> AnnotationResult<Note> {
        if new_label.trim().is_empty() {
            return Err(AnnotationServiceError::InvalidRequest(
                "note label cannot be blank".to_string(),
            ));
        }
        require_words(&words)?;

        let mut record = self.get_poem(poem_name)?;
        let sequence = OccurrenceSequence::from_text(&record.poem.text);
        reject_missing_words(&words, &sequence)?;

        let is_new = is_new_identifier(old_label);
        if !is_new && !record.notes.iter().any(|note| note.label == old_label) {
            return Err(AnnotationServiceError::AnnotationNotFound {
                kind: AnnotationKind::Note,
                identifier: old_label.to_string(),
            });
        }

        let others = record.notes.iter().filter(|note| note.label != old_label);
        if let Some(word) = overcrowded_note_word(new_label, &words, others) {
            return Err(reject(AnnotationRejection::FourOverlaps {
                word: word.to_string(),
            }));
        }

        let mut note = Note::new(new_label, words);
        order_words(&mut note.words, &sequence);
        if !is_new {
            record.notes.retain(|existing| existing.label != old_label);
        }
        upsert_note(&mut record.notes, note.clone());
        order_notes(&mut record.notes, &sequence);

        self.repo
            .replace_annotations(&record.title, &record.notes, &record.quotes)?;
        info!(
            "event=annotation_edit module=service status=ok kind=note mode={} words={} notes={}",
            edit_mode(is_new),
            note.words.len(),
            record.notes.len()
        );
        Ok(note)
    }

    /// Inserts (`old_identifier == "__NEW__"`) or replaces one quote.
    ///
    /// # Errors
    /// - `Rejected(WordNoLongerExists)` for a word missing from the poem.
    /// - `Rejected(NonConsecutive)` when words are not one poem run.
    /// - `Rejected(Overlap)` when a word belongs to another quote.
    /// - `AnnotationNotFound` when `old_identifier` names no stored quote.
    pub fn edit_quote(
        &mut self,
        poem_name: &str,
        old_identifier: &str,
        words: Vec<OccurrenceKey>,
    ) -> AnnotationResult<Quote> {
        require_words(&words)?;

        let mut record = self.get_poem(poem_name)?;
        let sequence = OccurrenceSequence::from_text(&record.poem.text);
        reject_missing_words(&words, &sequence)?;

        let replaced = if is_new_identifier(old_identifier) {
            None
        } else {
            let index = record
                .quotes
                .iter()
                .position(|quote| quote.identifier() == old_identifier)
                .ok_or_else(|| AnnotationServiceError::AnnotationNotFound {
                    kind: AnnotationKind::Quote,
                    identifier: old_identifier.to_string(),
                })?;
            Some(index)
        };

        check_contiguous(&words, &sequence)
            .map_err(|mismatch| reject(AnnotationRejection::NonConsecutive(mismatch)))?;

        let others = record
            .quotes
            .iter()
            .enumerate()
            .filter(|(index, _)| Some(*index) != replaced)
            .map(|(_, quote)| quote);
        if let Some(word) = overlapping_quote_word(&words, others) {
            return Err(reject(AnnotationRejection::Overlap {
                word: word.to_string(),
            }));
        }

        let quote = Quote::new(words);
        match replaced {
            Some(index) => record.quotes[index] = quote.clone(),
            None => record.quotes.push(quote.clone()),
        }
        order_quotes(&mut record.quotes, &sequence);

        self.repo
            .replace_annotations(&record.title, &record.notes, &record.quotes)?;
        info!(
            "event=annotation_edit module=service status=ok kind=quote mode={} words={} quotes={}",
            edit_mode(replaced.is_none()),
            quote.words.len(),
            record.quotes.len()
        );
        Ok(quote)
    }

    /// Removes the note with `label`; returns whether one was removed.
    pub fn delete_note(&mut self, poem_name: &str, label: &str) -> AnnotationResult<bool> {
        let mut record = self.get_poem(poem_name)?;
        let before = record.notes.len();
        record.notes.retain(|note| note.label != label);
        self.finish_delete(record, before, AnnotationKind::Note)
    }

    /// Removes the quote whose identifier is `identifier`; returns whether
    /// one was removed.
    pub fn delete_quote(&mut self, poem_name: &str, identifier: &str) -> AnnotationResult<bool> {
        let mut record = self.get_poem(poem_name)?;
        let before = record.quotes.len();
        record.quotes.retain(|quote| quote.identifier() != identifier);
        self.finish_delete(record, before, AnnotationKind::Quote)
    }

    /// Applies one edit envelope.
    ///
    /// Annotation rejections become `EditResponse::Rejected`; every other
    /// failure is returned as an error.
    pub fn handle_edit(&mut self, request: &EditRequest) -> AnnotationResult<EditResponse> {
        let edit = request
            .decode()
            .map_err(|err| AnnotationServiceError::InvalidRequest(err.to_string()))?;
        let outcome = match edit {
            AnnotationEdit::Note { old_label, note } => self
                .edit_note(&request.poem_name, &old_label, &note.label, note.words)
                .map(|_| ()),
            AnnotationEdit::Quote {
                old_identifier,
                words,
            } => self
                .edit_quote(&request.poem_name, &old_identifier, words)
                .map(|_| ()),
        };

        match outcome {
            Ok(()) => Ok(EditResponse::Success),
            Err(AnnotationServiceError::Rejected(rejection)) => {
                Ok(EditResponse::Rejected(rejection))
            }
            Err(err) => Err(err),
        }
    }

    /// Applies one delete envelope.
    pub fn handle_delete(&mut self, request: &DeleteRequest) -> AnnotationResult<bool> {
        match request.identifier_for {
            AnnotationKind::Note => self.delete_note(&request.poem_name, &request.identifier),
            AnnotationKind::Quote => self.delete_quote(&request.poem_name, &request.identifier),
        }
    }

    fn finish_delete(
        &mut self,
        record: PoemRecord,
        before: usize,
        kind: AnnotationKind,
    ) -> AnnotationResult<bool> {
        let after = match kind {
            AnnotationKind::Note => record.notes.len(),
            AnnotationKind::Quote => record.quotes.len(),
        };
        if after == before {
            info!(
                "event=annotation_delete module=service status=ok kind={} removed=0",
                kind.as_str()
            );
            return Ok(false);
        }

        self.repo
            .replace_annotations(&record.title, &record.notes, &record.quotes)?;
        info!(
            "event=annotation_delete module=service status=ok kind={} removed={}",
            kind.as_str(),
            before - after
        );
        Ok(true)
    }
}

fn require_words(words: &[OccurrenceKey]) -> AnnotationResult<()> {
    if words.is_empty() {
        return Err(AnnotationServiceError::InvalidRequest(
            "word list cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn reject_missing_words(
    words: &[OccurrenceKey],
    sequence: &OccurrenceSequence,
) -> AnnotationResult<()> {
    match first_missing_word(words, sequence) {
        Some(word) => Err(reject(AnnotationRejection::WordNoLongerExists {
            word: word.to_string(),
        })),
        None => Ok(()),
    }
}

fn reject(rejection: AnnotationRejection) -> AnnotationServiceError {
    warn!(
        "event=annotation_edit module=service status=rejected error_type={}",
        rejection.error_type()
    );
    AnnotationServiceError::Rejected(rejection)
}

fn edit_mode(is_new: bool) -> &'static str {
    if is_new {
        "insert"
    } else {
        "replace"
    }
}
