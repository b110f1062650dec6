//! Rejected annotations, partitioned by rejection reason.
//!
//! # Responsibility
//! - Carry the invalid half of a reconciliation result.
//! - Render the append-only invalid-annotation log document.
//!
//! # Invariants
//! - Every record belongs to exactly one reason category.
//! - Merging never removes entries; note categories merge by label
//!   (later value wins), quote categories append.

use crate::model::annotation::{notes_map, upsert_note, AnnotationKind, Note, Quote};
use crate::model::canonical::OccurrenceKey;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why an annotation was rejected during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionReason {
    WordNoLongerExists,
    FourOverlaps,
    NonConsecutive,
    Overlapping,
}

impl RejectionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WordNoLongerExists => "word-no-longer-exists",
            Self::FourOverlaps => "four-overlaps",
            Self::NonConsecutive => "non-consecutive",
            Self::Overlapping => "overlapping",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "word-no-longer-exists" => Some(Self::WordNoLongerExists),
            "four-overlaps" => Some(Self::FourOverlaps),
            "non-consecutive" => Some(Self::NonConsecutive),
            "overlapping" => Some(Self::Overlapping),
            _ => None,
        }
    }
}

/// Invalid notes by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidNotes {
    #[serde(rename = "word-no-longer-exists", with = "notes_map", default)]
    pub word_no_longer_exists: Vec<Note>,
    #[serde(rename = "four-overlaps", with = "notes_map", default)]
    pub four_overlaps: Vec<Note>,
}

/// Invalid quotes by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidQuotes {
    #[serde(rename = "word-no-longer-exists", default)]
    pub word_no_longer_exists: Vec<Quote>,
    #[serde(rename = "non-consecutive", default)]
    pub non_consecutive: Vec<Quote>,
    #[serde(default)]
    pub overlapping: Vec<Quote>,
}

/// Rejected notes and quotes; also the shape of the persisted log document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidAnnotations {
    pub notes: InvalidNotes,
    pub quotes: InvalidQuotes,
}

/// One flattened log row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRecord {
    pub kind: AnnotationKind,
    pub reason: RejectionReason,
    /// Present for notes only.
    pub label: Option<String>,
    pub words: Vec<OccurrenceKey>,
}

/// Invalid annotations demoted from one poem during one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemotedAnnotations {
    pub run_id: Uuid,
    pub poem_title: String,
    pub invalid: InvalidAnnotations,
}

impl InvalidAnnotations {
    pub fn is_empty(&self) -> bool {
        self.note_count() == 0 && self.quote_count() == 0
    }

    pub fn note_count(&self) -> usize {
        self.notes.word_no_longer_exists.len() + self.notes.four_overlaps.len()
    }

    pub fn quote_count(&self) -> usize {
        self.quotes.word_no_longer_exists.len()
            + self.quotes.non_consecutive.len()
            + self.quotes.overlapping.len()
    }

    /// Flattens categories into rows, notes first, in category order.
    pub fn records(&self) -> Vec<InvalidRecord> {
        let mut records = Vec::with_capacity(self.note_count() + self.quote_count());
        let note_categories = [
            (RejectionReason::WordNoLongerExists, &self.notes.word_no_longer_exists),
            (RejectionReason::FourOverlaps, &self.notes.four_overlaps),
        ];
        for (reason, notes) in note_categories {
            records.extend(notes.iter().map(|note| InvalidRecord {
                kind: AnnotationKind::Note,
                reason,
                label: Some(note.label.clone()),
                words: note.words.clone(),
            }));
        }

        let quote_categories = [
            (RejectionReason::WordNoLongerExists, &self.quotes.word_no_longer_exists),
            (RejectionReason::NonConsecutive, &self.quotes.non_consecutive),
            (RejectionReason::Overlapping, &self.quotes.overlapping),
        ];
        for (reason, quotes) in quote_categories {
            records.extend(quotes.iter().map(|quote| InvalidRecord {
                kind: AnnotationKind::Quote,
                reason,
                label: None,
                words: quote.words.clone(),
            }));
        }
        records
    }

    /// Adds one row to its category.
    ///
    /// Returns `false` when the kind/reason pair has no category (e.g. a
    /// quote marked `four-overlaps`) and the row was ignored.
    pub fn push_record(&mut self, record: InvalidRecord) -> bool {
        match (record.kind, record.reason) {
            (AnnotationKind::Note, reason) => {
                let target = match reason {
                    RejectionReason::WordNoLongerExists => &mut self.notes.word_no_longer_exists,
                    RejectionReason::FourOverlaps => &mut self.notes.four_overlaps,
                    _ => return false,
                };
                let label = record.label.unwrap_or_default();
                upsert_note(target, Note::new(label, record.words));
            }
            (AnnotationKind::Quote, reason) => {
                let target = match reason {
                    RejectionReason::WordNoLongerExists => &mut self.quotes.word_no_longer_exists,
                    RejectionReason::NonConsecutive => &mut self.quotes.non_consecutive,
                    RejectionReason::Overlapping => &mut self.quotes.overlapping,
                    RejectionReason::FourOverlaps => return false,
                };
                target.push(Quote::new(record.words));
            }
        }
        true
    }

    /// Merges `other` into `self` without removing existing entries.
    pub fn merge(&mut self, other: &InvalidAnnotations) {
        for record in other.records() {
            self.push_record(record);
        }
    }
}
