//! Poem records and the exported poem document.
//!
//! # Responsibility
//! - Define the unit of persistence (`PoemRecord`).
//! - Map records to and from the `{title: {convertedPoem, ...}}` document
//!   consumed by the rendering layer.
//!
//! # Invariants
//! - `CanonicalPoem` is regenerated wholesale from raw text; never patched.
//! - Document order equals stored poem order.

use crate::model::annotation::{
    deserialize_ordered_pairs, notes_map, serialize_ordered_pairs, Note, Quote,
};
use crate::model::canonical::{CanonicalText, CanonicalTextError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Encoded poem body plus display metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalPoem {
    pub text: CanonicalText,
    /// Non-empty whitespace tokens before punctuation splitting.
    pub word_count: u32,
    pub author: String,
    pub centered: bool,
}

/// One poem with its annotations, keyed by title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoemRecord {
    pub title: String,
    pub poem: CanonicalPoem,
    pub quotes: Vec<Quote>,
    pub notes: Vec<Note>,
}

impl PoemRecord {
    /// Creates a freshly ingested record with no annotations.
    pub fn new(title: impl Into<String>, poem: CanonicalPoem) -> Self {
        Self {
            title: title.into(),
            poem,
            quotes: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn to_document_entry(&self) -> PoemDocumentEntry {
        PoemDocumentEntry {
            converted_poem: self.poem.text.to_marked_string(),
            word_count: self.poem.word_count,
            author: self.poem.author.clone(),
            quotes: self.quotes.clone(),
            notes: self.notes.clone(),
            centered: self.poem.centered,
        }
    }

    /// Rebuilds a record from its document entry.
    ///
    /// # Errors
    /// - Returns `CanonicalTextError` when `convertedPoem` is malformed.
    pub fn from_document_entry(
        title: impl Into<String>,
        entry: PoemDocumentEntry,
    ) -> Result<Self, CanonicalTextError> {
        let text = CanonicalText::parse(&entry.converted_poem)?;
        Ok(Self {
            title: title.into(),
            poem: CanonicalPoem {
                text,
                word_count: entry.word_count,
                author: entry.author,
                centered: entry.centered,
            },
            quotes: entry.quotes,
            notes: entry.notes,
        })
    }
}

/// Wire shape of one poem in the exported document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoemDocumentEntry {
    pub converted_poem: String,
    pub word_count: u32,
    pub author: String,
    #[serde(default)]
    pub quotes: Vec<Quote>,
    #[serde(default, with = "notes_map")]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub centered: bool,
}

/// Ordered title-to-poem document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoemDocument {
    pub poems: Vec<(String, PoemDocumentEntry)>,
}

impl PoemDocument {
    pub fn from_records(records: &[PoemRecord]) -> Self {
        Self {
            poems: records
                .iter()
                .map(|record| (record.title.clone(), record.to_document_entry()))
                .collect(),
        }
    }

    /// Converts every entry back into a record, failing on the first bad one.
    pub fn into_records(self) -> Result<Vec<PoemRecord>, (String, CanonicalTextError)> {
        self.poems
            .into_iter()
            .map(|(title, entry)| {
                PoemRecord::from_document_entry(title.clone(), entry).map_err(|err| (title, err))
            })
            .collect()
    }

    pub fn get(&self, title: &str) -> Option<&PoemDocumentEntry> {
        self.poems
            .iter()
            .find(|(candidate, _)| candidate == title)
            .map(|(_, entry)| entry)
    }
}

impl Serialize for PoemDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_ordered_pairs(&self.poems, serializer)
    }
}

impl<'de> Deserialize<'de> for PoemDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let poems = deserialize_ordered_pairs(deserializer, "a map of poem titles")?;
        Ok(Self { poems })
    }
}

#[cfg(test)]
mod tests {
    use super::{CanonicalPoem, PoemDocument, PoemRecord};
    use crate::model::annotation::{Note, Quote};
    use crate::model::canonical::CanonicalText;

    fn sample_record() -> PoemRecord {
        let mut record = PoemRecord::new(
            "Echo",
            CanonicalPoem {
                text: CanonicalText::parse("{1}say{1} {1}it{1}|{1},{1}").unwrap(),
                word_count: 2,
                author: "Anon".to_string(),
                centered: true,
            },
        );
        record.quotes = vec![Quote::new(vec!["{1}say{1}".into(), "{1}it{1}".into()])];
        record.notes = vec![Note::new("imperative", vec!["{1}say{1}".into()])];
        record
    }

    #[test]
    fn document_uses_camel_case_wire_fields() {
        let document = PoemDocument::from_records(&[sample_record()]);
        let json = serde_json::to_value(&document).unwrap();
        let entry = &json["Echo"];
        assert_eq!(entry["convertedPoem"], "{1}say{1} {1}it{1}|{1},{1}");
        assert_eq!(entry["wordCount"], 2);
        assert_eq!(entry["author"], "Anon");
        assert_eq!(entry["centered"], true);
        assert_eq!(entry["quotes"][0][1], "{1}it{1}");
        assert_eq!(entry["notes"]["imperative"][0], "{1}say{1}");
    }

    #[test]
    fn document_round_trips_into_records() {
        let record = sample_record();
        let json = serde_json::to_string(&PoemDocument::from_records(&[record.clone()])).unwrap();
        let document: PoemDocument = serde_json::from_str(&json).unwrap();
        let records = document.into_records().unwrap();
        assert_eq!(records, vec![record]);
    }

    #[test]
    fn malformed_converted_poem_names_the_offending_title() {
        let json = r#"{"Bad": {"convertedPoem": "{1}x{2}", "wordCount": 1, "author": "A"}}"#;
        let document: PoemDocument = serde_json::from_str(json).unwrap();
        let (title, _) = document.into_records().unwrap_err();
        assert_eq!(title, "Bad");
    }
}
