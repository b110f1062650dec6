//! Reconciliation of stored annotations against re-encoded poem text.
//!
//! # Responsibility
//! - Partition previous notes and quotes into valid and invalid (with reason)
//!   after the poem text changes.
//!
//! # Invariants
//! - Quote checks run existence, contiguity, then pairwise overlap; note
//!   checks run existence, then overlap count. The first failing check
//!   classifies the item and later checks never see it.
//! - Overlap is pairwise: every quote sharing a word with another surviving
//!   quote is rejected, with no attempt at a minimal removal set.
//! - Valid output keeps the input order.
//! - An annotation with no words references nothing that still exists and is
//!   classified `word-no-longer-exists`.

use crate::annotation::rules::{
    check_contiguous, first_missing_word, overcrowded_note_word, overlapping_quote_word,
};
use crate::model::annotation::{Note, Quote};
use crate::model::canonical::{CanonicalText, OccurrenceSequence};
use crate::model::invalid_log::{InvalidAnnotations, InvalidNotes, InvalidQuotes};

/// Annotations that survived reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidAnnotations {
    pub notes: Vec<Note>,
    pub quotes: Vec<Quote>,
}

/// Result of one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub valid: ValidAnnotations,
    pub invalid: InvalidAnnotations,
}

/// Re-validates previous notes and quotes against new canonical text.
pub fn reconcile(
    previous_notes: &[Note],
    previous_quotes: &[Quote],
    new_text: &CanonicalText,
) -> Reconciliation {
    let sequence = OccurrenceSequence::from_text(new_text);
    let (notes, invalid_notes) = check_notes(previous_notes, &sequence);
    let (quotes, invalid_quotes) = check_quotes(previous_quotes, &sequence);
    Reconciliation {
        valid: ValidAnnotations { notes, quotes },
        invalid: InvalidAnnotations {
            notes: invalid_notes,
            quotes: invalid_quotes,
        },
    }
}

/// Note pipeline: existence, then overlap count among surviving notes.
pub fn check_notes(notes: &[Note], sequence: &OccurrenceSequence) -> (Vec<Note>, InvalidNotes) {
    let mut invalid = InvalidNotes::default();
    let mut existing = Vec::with_capacity(notes.len());
    for note in notes {
        if note.words.is_empty() || first_missing_word(&note.words, sequence).is_some() {
            invalid.word_no_longer_exists.push(note.clone());
        } else {
            existing.push(note);
        }
    }

    let mut valid = Vec::with_capacity(existing.len());
    for note in &existing {
        let others = existing.iter().copied();
        if overcrowded_note_word(&note.label, &note.words, others).is_some() {
            invalid.four_overlaps.push((*note).clone());
        } else {
            valid.push((*note).clone());
        }
    }
    (valid, invalid)
}

/// Quote pipeline: existence, contiguity, then pairwise overlap.
pub fn check_quotes(
    quotes: &[Quote],
    sequence: &OccurrenceSequence,
) -> (Vec<Quote>, InvalidQuotes) {
    let mut invalid = InvalidQuotes::default();
    let mut contiguous = Vec::with_capacity(quotes.len());
    for quote in quotes {
        if quote.words.is_empty() || first_missing_word(&quote.words, sequence).is_some() {
            invalid.word_no_longer_exists.push(quote.clone());
        } else if check_contiguous(&quote.words, sequence).is_err() {
            invalid.non_consecutive.push(quote.clone());
        } else {
            contiguous.push(quote);
        }
    }

    let mut valid = Vec::with_capacity(contiguous.len());
    for (index, quote) in contiguous.iter().enumerate() {
        let others = contiguous
            .iter()
            .enumerate()
            .filter(|(other_index, _)| *other_index != index)
            .map(|(_, other)| *other);
        if overlapping_quote_word(&quote.words, others).is_some() {
            invalid.overlapping.push((*quote).clone());
        } else {
            valid.push((*quote).clone());
        }
    }
    (valid, invalid)
}
