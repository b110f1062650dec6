//! Edit and delete request envelopes exchanged with the UI layer.
//!
//! # Responsibility
//! - Decode `{poemName, noteType, oldIdentifier, newVersion}` edit requests
//!   and `{poemName, identifierFor, identifier}` delete requests.
//! - Encode edit outcomes as `{errorType, error}`.
//!
//! # Invariants
//! - Success is always `{"errorType": "no-error", "error": null}`.
//! - `newVersion` is `{key, value}` for notes and a word array for quotes;
//!   its shape is checked against `noteType` in `EditRequest::decode`.

use crate::annotation::rules::AnnotationRejection;
use crate::model::annotation::{AnnotationKind, Note};
use crate::model::canonical::OccurrenceKey;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// `errorType` value reported on success.
pub const NO_ERROR: &str = "no-error";

/// Raw edit request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    pub poem_name: String,
    pub note_type: AnnotationKind,
    pub old_identifier: String,
    pub new_version: serde_json::Value,
}

/// `newVersion` shape for notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteVersion {
    pub key: String,
    pub value: Vec<OccurrenceKey>,
}

/// An edit request whose `newVersion` matched its `noteType`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationEdit {
    Note { old_label: String, note: Note },
    Quote {
        old_identifier: String,
        words: Vec<OccurrenceKey>,
    },
}

impl EditRequest {
    pub fn note(poem_name: impl Into<String>, old_label: impl Into<String>, note: &Note) -> Self {
        Self {
            poem_name: poem_name.into(),
            note_type: AnnotationKind::Note,
            old_identifier: old_label.into(),
            new_version: serde_json::json!({ "key": note.label, "value": note.words }),
        }
    }

    pub fn quote(
        poem_name: impl Into<String>,
        old_identifier: impl Into<String>,
        words: &[OccurrenceKey],
    ) -> Self {
        Self {
            poem_name: poem_name.into(),
            note_type: AnnotationKind::Quote,
            old_identifier: old_identifier.into(),
            new_version: serde_json::json!(words),
        }
    }

    /// Interprets `newVersion` according to `noteType`.
    ///
    /// # Errors
    /// - Returns the serde error when the payload has the wrong shape.
    pub fn decode(&self) -> Result<AnnotationEdit, serde_json::Error> {
        match self.note_type {
            AnnotationKind::Note => {
                let version: NoteVersion = serde_json::from_value(self.new_version.clone())?;
                Ok(AnnotationEdit::Note {
                    old_label: self.old_identifier.clone(),
                    note: Note::new(version.key, version.value),
                })
            }
            AnnotationKind::Quote => {
                let words: Vec<OccurrenceKey> = serde_json::from_value(self.new_version.clone())?;
                Ok(AnnotationEdit::Quote {
                    old_identifier: self.old_identifier.clone(),
                    words,
                })
            }
        }
    }
}

/// Raw delete request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub poem_name: String,
    pub identifier_for: AnnotationKind,
    pub identifier: String,
}

/// Outcome of one edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditResponse {
    Success,
    Rejected(AnnotationRejection),
}

impl EditResponse {
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Success => NO_ERROR,
            Self::Rejected(rejection) => rejection.error_type(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl Serialize for EditResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("EditResponse", 2)?;
        state.serialize_field("errorType", self.error_type())?;
        match self {
            Self::Success => state.serialize_field("error", &None::<()>)?,
            Self::Rejected(AnnotationRejection::NonConsecutive(mismatch)) => {
                state.serialize_field("error", mismatch)?
            }
            Self::Rejected(
                AnnotationRejection::WordNoLongerExists { word }
                | AnnotationRejection::Overlap { word }
                | AnnotationRejection::FourOverlaps { word },
            ) => state.serialize_field("error", word)?,
        }
        state.end()
    }
}
