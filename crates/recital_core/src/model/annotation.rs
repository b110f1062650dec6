//! Note and quote annotation records.
//!
//! # Responsibility
//! - Define the stored shape of quotes and notes.
//! - Serialize a poem's notes as a JSON object whose key order is the stored
//!   (poem) order.
//!
//! # Invariants
//! - Quote and note words are occurrence keys in canonical marked form.
//! - Note labels are unique within one poem.

use crate::model::canonical::OccurrenceKey;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Formatter;
use std::marker::PhantomData;

/// Identifier callers send to request insertion instead of replacement.
pub const NEW_ANNOTATION_IDENTIFIER: &str = "__NEW__";

/// Returns whether `identifier` requests a new annotation.
pub fn is_new_identifier(identifier: &str) -> bool {
    identifier == NEW_ANNOTATION_IDENTIFIER
}

/// Annotation family addressed by edit and delete requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnotationKind {
    Note,
    Quote,
}

impl AnnotationKind {
    /// Lowercase name used in storage columns and log events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Quote => "quote",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "note" => Some(Self::Note),
            "quote" => Some(Self::Quote),
            _ => None,
        }
    }
}

/// Contiguous run of occurrences recalled as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quote {
    pub words: Vec<OccurrenceKey>,
}

impl Quote {
    pub fn new(words: Vec<OccurrenceKey>) -> Self {
        Self { words }
    }

    /// Stable identifier: words joined by single spaces.
    ///
    /// Occurrence keys never contain raw spaces, so this is unambiguous.
    pub fn identifier(&self) -> String {
        self.words.join(" ")
    }

    pub fn first_word(&self) -> Option<&str> {
        self.words.first().map(String::as_str)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.iter().any(|candidate| candidate == word)
    }
}

/// Free-text label attached to a set of occurrences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub label: String,
    pub words: Vec<OccurrenceKey>,
}

impl Note {
    pub fn new(label: impl Into<String>, words: Vec<OccurrenceKey>) -> Self {
        Self {
            label: label.into(),
            words,
        }
    }

    pub fn first_word(&self) -> Option<&str> {
        self.words.first().map(String::as_str)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.iter().any(|candidate| candidate == word)
    }
}

/// Inserts `note`, replacing any existing note with the same label in place.
pub fn upsert_note(notes: &mut Vec<Note>, note: Note) {
    match notes.iter_mut().find(|existing| existing.label == note.label) {
        Some(existing) => *existing = note,
        None => notes.push(note),
    }
}

/// Serde adapter mapping `Vec<Note>` to an order-preserving `{label: words}`.
///
/// Use with `#[serde(with = "notes_map")]`. Duplicate labels in input keep
/// the first position and the last value.
pub mod notes_map {
    use super::{upsert_note, Note, OrderedPairsVisitor};
    use crate::model::canonical::OccurrenceKey;
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(notes: &[Note], serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(notes.len()))?;
        for note in notes {
            map.serialize_entry(&note.label, &note.words)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Note>, D::Error> {
        let pairs = deserializer
            .deserialize_map(OrderedPairsVisitor::<Vec<OccurrenceKey>>::new("a map of note labels"))?;
        let mut notes = Vec::with_capacity(pairs.len());
        for (label, words) in pairs {
            upsert_note(&mut notes, Note::new(label, words));
        }
        Ok(notes)
    }
}

/// Serializes ordered `(key, value)` pairs as a JSON object.
pub(crate) fn serialize_ordered_pairs<S, V>(
    pairs: &[(String, V)],
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize,
{
    let mut map = serializer.serialize_map(Some(pairs.len()))?;
    for (key, value) in pairs {
        map.serialize_entry(key, value)?;
    }
    map.end()
}

/// Deserializes a JSON object into pairs, keeping document order.
pub(crate) fn deserialize_ordered_pairs<'de, D, V>(
    deserializer: D,
    expecting: &'static str,
) -> Result<Vec<(String, V)>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    deserializer.deserialize_map(OrderedPairsVisitor::new(expecting))
}

pub(crate) struct OrderedPairsVisitor<V> {
    expecting: &'static str,
    marker: PhantomData<V>,
}

impl<V> OrderedPairsVisitor<V> {
    pub(crate) fn new(expecting: &'static str) -> Self {
        Self {
            expecting,
            marker: PhantomData,
        }
    }
}

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedPairsVisitor<V> {
    type Value = Vec<(String, V)>;

    fn expecting(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.expecting)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            pairs.push((key, value));
        }
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::{is_new_identifier, notes_map, upsert_note, Note, Quote};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Holder {
        #[serde(with = "notes_map")]
        notes: Vec<Note>,
    }

    #[test]
    fn quote_identifier_joins_words_with_spaces() {
        let quote = Quote::new(vec!["{1}rose{1}".into(), "{1}garden{1}".into()]);
        assert_eq!(quote.identifier(), "{1}rose{1} {1}garden{1}");
        assert_eq!(quote.first_word(), Some("{1}rose{1}"));
    }

    #[test]
    fn notes_map_preserves_stored_order() {
        let holder = Holder {
            notes: vec![
                Note::new("zeta", vec!["{1}a{1}".into()]),
                Note::new("alpha", vec!["{1}b{1}".into()]),
            ],
        };
        let json = serde_json::to_string(&holder).unwrap();
        assert_eq!(
            json,
            r#"{"notes":{"zeta":["{1}a{1}"],"alpha":["{1}b{1}"]}}"#
        );
        let decoded: Holder = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, holder);
    }

    #[test]
    fn upsert_note_replaces_same_label_in_place() {
        let mut notes = vec![Note::new("a", vec![]), Note::new("b", vec![])];
        upsert_note(&mut notes, Note::new("a", vec!["{1}x{1}".into()]));
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].words, vec!["{1}x{1}".to_string()]);
        assert!(is_new_identifier("__NEW__"));
        assert!(!is_new_identifier("a"));
    }
}
