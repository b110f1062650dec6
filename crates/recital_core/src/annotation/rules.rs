//! Structural validity rules shared by reconciliation and the edit API.
//!
//! # Responsibility
//! - Check that annotation words exist in the current canonical text.
//! - Check quote contiguity and quote/note overlap bounds.
//! - Describe a failed check in enough detail for a human to fix it.
//!
//! # Invariants
//! - Rules are pure; callers decide whether a failure demotes or rejects.

use crate::model::annotation::{Note, Quote};
use crate::model::canonical::{OccurrenceKey, OccurrenceSequence};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// A word may be referenced by at most this many notes, itself included.
pub const MAX_NOTES_PER_WORD: usize = 3;

/// Where a quote stops following the poem.
///
/// Serialized as `{incorrectSequence: [previous, found],
/// correctSequence: [previous, expected]}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceMismatch {
    /// Quote word before the break; `None` when the first word is missing.
    pub previous: Option<OccurrenceKey>,
    /// Quote word found at the break.
    pub found: OccurrenceKey,
    /// Poem occurrence that should have followed; `None` past the poem end.
    pub expected: Option<OccurrenceKey>,
}

impl Serialize for SequenceMismatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SequenceMismatch", 2)?;
        state.serialize_field(
            "incorrectSequence",
            &[self.previous.as_deref(), Some(self.found.as_str())],
        )?;
        state.serialize_field(
            "correctSequence",
            &[self.previous.as_deref(), self.expected.as_deref()],
        )?;
        state.end()
    }
}

/// Reason an edit was refused, with the offending detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationRejection {
    /// Word is not an occurrence of the current poem text.
    WordNoLongerExists { word: OccurrenceKey },
    /// Quote words are not one consecutive run of the poem.
    NonConsecutive(SequenceMismatch),
    /// Word already belongs to another quote.
    Overlap { word: OccurrenceKey },
    /// Word would be referenced by more than `MAX_NOTES_PER_WORD` notes.
    FourOverlaps { word: OccurrenceKey },
}

impl AnnotationRejection {
    /// Taxonomy name used as `errorType` on the wire.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::WordNoLongerExists { .. } => "word-no-longer-exists",
            Self::NonConsecutive(_) => "non-consecutive",
            Self::Overlap { .. } => "overlap",
            Self::FourOverlaps { .. } => "four-overlaps",
        }
    }
}

impl Display for AnnotationRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WordNoLongerExists { word } => {
                write!(f, "word `{word}` does not exist in the poem")
            }
            Self::NonConsecutive(mismatch) => write!(
                f,
                "words not consecutive: found `{}` where `{}` should follow",
                mismatch.found,
                mismatch.expected.as_deref().unwrap_or("<end of poem>")
            ),
            Self::Overlap { word } => write!(f, "word `{word}` is already in another quote"),
            Self::FourOverlaps { word } => write!(
                f,
                "word `{word}` would appear in more than {MAX_NOTES_PER_WORD} notes"
            ),
        }
    }
}

impl Error for AnnotationRejection {}

/// Returns the first word that is not an occurrence in `sequence`.
pub fn first_missing_word<'a>(
    words: &'a [OccurrenceKey],
    sequence: &OccurrenceSequence,
) -> Option<&'a str> {
    words
        .iter()
        .map(String::as_str)
        .find(|word| !sequence.contains(word))
}

/// Checks that `words` equal the poem run starting at the first word.
pub fn check_contiguous(
    words: &[OccurrenceKey],
    sequence: &OccurrenceSequence,
) -> Result<(), SequenceMismatch> {
    let Some(first) = words.first() else {
        return Ok(());
    };
    let Some(start) = sequence.position(first) else {
        return Err(SequenceMismatch {
            previous: None,
            found: first.clone(),
            expected: None,
        });
    };

    for (offset, word) in words.iter().enumerate().skip(1) {
        let expected = sequence.get(start + offset);
        if expected != Some(word.as_str()) {
            return Err(SequenceMismatch {
                previous: Some(words[offset - 1].clone()),
                found: word.clone(),
                expected: expected.map(str::to_string),
            });
        }
    }
    Ok(())
}

/// Returns the first word of `words` that also appears in any of `others`.
pub fn overlapping_quote_word<'a, 'q>(
    words: &'a [OccurrenceKey],
    others: impl IntoIterator<Item = &'q Quote>,
) -> Option<&'a str> {
    let others: Vec<&Quote> = others.into_iter().collect();
    words
        .iter()
        .map(String::as_str)
        .find(|word| others.iter().any(|quote| quote.contains(word)))
}

/// Returns the first word whose note count exceeds `MAX_NOTES_PER_WORD`.
///
/// The count is 1 (the note itself) plus every note in `others` with a
/// different label that references the word.
pub fn overcrowded_note_word<'a, 'n>(
    label: &str,
    words: &'a [OccurrenceKey],
    others: impl IntoIterator<Item = &'n Note>,
) -> Option<&'a str> {
    let others: Vec<&Note> = others
        .into_iter()
        .filter(|note| note.label != label)
        .collect();
    words.iter().map(String::as_str).find(|word| {
        let references = 1 + others.iter().filter(|note| note.contains(word)).count();
        references > MAX_NOTES_PER_WORD
    })
}
