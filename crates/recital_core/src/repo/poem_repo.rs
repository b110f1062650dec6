//! Poem record repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist canonical poems with their quotes and notes.
//! - Append reconciliation rejections to the invalid-annotation log.
//! - Render the poem-record document consumed by the rendering layer.
//!
//! # Invariants
//! - Quotes and notes are stored with an explicit `position`; reads return
//!   them in that order.
//! - `replace_annotations` and `replace_poem_set` run in one immediate
//!   transaction each; a failure leaves prior rows untouched.
//! - `invalid_annotations` is append-only; no API here updates or deletes it.
//! - Word lists are stored as JSON string arrays.

use crate::db::DbError;
use crate::model::annotation::{AnnotationKind, Note, Quote};
use crate::model::canonical::{CanonicalText, CanonicalTextError, OccurrenceKey};
use crate::model::invalid_log::{
    DemotedAnnotations, InvalidAnnotations, InvalidRecord, RejectionReason,
};
use crate::model::poem::{CanonicalPoem, PoemDocument, PoemRecord};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for poem persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// No stored poem with this title.
    PoemNotFound(String),
    /// Stored `converted_poem` no longer parses.
    CorruptPoemText {
        title: String,
        source: CanonicalTextError,
    },
    /// A word-list column failed to encode or decode.
    Serialization(serde_json::Error),
    InvalidData(String),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::PoemNotFound(title) => write!(f, "poem not found: `{title}`"),
            Self::CorruptPoemText { title, source } => {
                write!(f, "stored text of poem `{title}` is malformed: {source}")
            }
            Self::Serialization(err) => write!(f, "word list serialization failed: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted poem data: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::CorruptPoemText { source, .. } => Some(source),
            Self::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// One persisted invalid-log row with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidLogEntry {
    pub run_id: Uuid,
    pub poem_title: String,
    pub record: InvalidRecord,
    /// Epoch milliseconds.
    pub logged_at: i64,
}

/// Repository interface for poem records.
pub trait PoemRepository {
    /// Titles in document order.
    fn list_titles(&self) -> RepoResult<Vec<String>>;
    fn get_poem(&self, title: &str) -> RepoResult<Option<PoemRecord>>;
    /// Every poem record in document order.
    fn load_all(&self) -> RepoResult<Vec<PoemRecord>>;
    /// Replaces one poem's quotes and notes in one transaction.
    fn replace_annotations(
        &mut self,
        title: &str,
        notes: &[Note],
        quotes: &[Quote],
    ) -> RepoResult<()>;
    /// Writes a whole ingestion batch and its log appends in one transaction.
    ///
    /// Stored poems missing from `poems` are deleted; their titles are
    /// returned in title order.
    fn replace_poem_set(
        &mut self,
        poems: &[PoemRecord],
        demoted: &[DemotedAnnotations],
    ) -> RepoResult<Vec<String>>;
    /// Folds every log row into the invalid-log document.
    fn load_invalid_log(&self) -> RepoResult<InvalidAnnotations>;
    /// Log rows in append order, optionally limited to one run.
    fn list_invalid_entries(&self, run_id: Option<Uuid>) -> RepoResult<Vec<InvalidLogEntry>>;
    /// The poem-record mapping consumed by the rendering layer.
    fn export_document(&self) -> RepoResult<PoemDocument> {
        Ok(PoemDocument::from_records(&self.load_all()?))
    }
}

/// SQLite-backed poem repository.
pub struct SqlitePoemRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqlitePoemRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_poem_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

const POEM_SELECT_SQL: &str = "SELECT
        title,
        converted_poem,
        word_count,
        author,
        centered
     FROM poems";

impl PoemRepository for SqlitePoemRepository<'_> {
    fn list_titles(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT title FROM poems ORDER BY sort_order ASC, title ASC;")?;
        let titles = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(titles)
    }

    fn get_poem(&self, title: &str) -> RepoResult<Option<PoemRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{POEM_SELECT_SQL} WHERE title = ?1;"))?;
        let mut rows = stmt.query([title])?;
        match rows.next()? {
            Some(row) => Ok(Some(load_record(self.conn, row)?)),
            None => Ok(None),
        }
    }

    fn load_all(&self) -> RepoResult<Vec<PoemRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{POEM_SELECT_SQL} ORDER BY sort_order ASC, title ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(load_record(self.conn, row)?);
        }
        Ok(records)
    }

    fn replace_annotations(
        &mut self,
        title: &str,
        notes: &[Note],
        quotes: &[Quote],
    ) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !poem_exists_in_tx(&tx, title)? {
            return Err(RepoError::PoemNotFound(title.to_string()));
        }
        write_annotations(&tx, title, notes, quotes)?;
        tx.execute(
            "UPDATE poems
             SET updated_at = (strftime('%s', 'now') * 1000)
             WHERE title = ?1;",
            [title],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn replace_poem_set(
        &mut self,
        poems: &[PoemRecord],
        demoted: &[DemotedAnnotations],
    ) -> RepoResult<Vec<String>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let incoming: BTreeSet<&str> = poems.iter().map(|record| record.title.as_str()).collect();
        let mut removed = Vec::new();
        {
            let mut stmt = tx.prepare("SELECT title FROM poems ORDER BY title ASC;")?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let title: String = row.get(0)?;
                if !incoming.contains(title.as_str()) {
                    removed.push(title);
                }
            }
        }
        for title in &removed {
            tx.execute("DELETE FROM poems WHERE title = ?1;", [title.as_str()])?;
        }

        for (sort_order, record) in poems.iter().enumerate() {
            tx.execute(
                "INSERT INTO poems (title, sort_order, converted_poem, word_count, author, centered)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(title) DO UPDATE SET
                    sort_order = excluded.sort_order,
                    converted_poem = excluded.converted_poem,
                    word_count = excluded.word_count,
                    author = excluded.author,
                    centered = excluded.centered,
                    updated_at = (strftime('%s', 'now') * 1000);",
                params![
                    record.title,
                    sort_order as i64,
                    record.poem.text.to_marked_string(),
                    record.poem.word_count,
                    record.poem.author,
                    record.poem.centered,
                ],
            )?;
            write_annotations(&tx, &record.title, &record.notes, &record.quotes)?;
        }

        for batch in demoted {
            append_invalid(&tx, batch)?;
        }

        tx.commit()?;
        Ok(removed)
    }

    fn load_invalid_log(&self) -> RepoResult<InvalidAnnotations> {
        let mut log = InvalidAnnotations::default();
        for entry in self.list_invalid_entries(None)? {
            if !log.push_record(entry.record) {
                return Err(RepoError::InvalidData(format!(
                    "invalid log row for `{}` has no category",
                    entry.poem_title
                )));
            }
        }
        Ok(log)
    }

    fn list_invalid_entries(&self, run_id: Option<Uuid>) -> RepoResult<Vec<InvalidLogEntry>> {
        let run_filter = run_id.map(|id| id.to_string());
        let mut stmt = self.conn.prepare(
            "SELECT run_id, poem_title, annotation_kind, reason, label, words, logged_at
             FROM invalid_annotations
             WHERE ?1 IS NULL OR run_id = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([run_filter])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_invalid_row(row)?);
        }
        Ok(entries)
    }
}

fn load_record(conn: &Connection, row: &Row<'_>) -> RepoResult<PoemRecord> {
    let title: String = row.get("title")?;
    let converted: String = row.get("converted_poem")?;
    let text = CanonicalText::parse(&converted).map_err(|source| RepoError::CorruptPoemText {
        title: title.clone(),
        source,
    })?;
    let poem = CanonicalPoem {
        text,
        word_count: row.get("word_count")?,
        author: row.get("author")?,
        centered: row.get("centered")?,
    };
    let quotes = load_quotes(conn, &title)?;
    let notes = load_notes(conn, &title)?;
    Ok(PoemRecord {
        title,
        poem,
        quotes,
        notes,
    })
}

fn load_quotes(conn: &Connection, title: &str) -> RepoResult<Vec<Quote>> {
    let mut stmt = conn.prepare(
        "SELECT words FROM quotes
         WHERE poem_title = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([title])?;
    let mut quotes = Vec::new();
    while let Some(row) = rows.next()? {
        let words: String = row.get(0)?;
        quotes.push(Quote::new(decode_words(&words)?));
    }
    Ok(quotes)
}

fn load_notes(conn: &Connection, title: &str) -> RepoResult<Vec<Note>> {
    let mut stmt = conn.prepare(
        "SELECT label, words FROM notes
         WHERE poem_title = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([title])?;
    let mut notes = Vec::new();
    while let Some(row) = rows.next()? {
        let label: String = row.get(0)?;
        let words: String = row.get(1)?;
        notes.push(Note::new(label, decode_words(&words)?));
    }
    Ok(notes)
}

fn write_annotations(
    tx: &Transaction<'_>,
    title: &str,
    notes: &[Note],
    quotes: &[Quote],
) -> RepoResult<()> {
    tx.execute("DELETE FROM quotes WHERE poem_title = ?1;", [title])?;
    tx.execute("DELETE FROM notes WHERE poem_title = ?1;", [title])?;

    for (position, quote) in quotes.iter().enumerate() {
        tx.execute(
            "INSERT INTO quotes (poem_title, position, words) VALUES (?1, ?2, ?3);",
            params![title, position as i64, encode_words(&quote.words)?],
        )?;
    }
    for (position, note) in notes.iter().enumerate() {
        tx.execute(
            "INSERT INTO notes (poem_title, position, label, words) VALUES (?1, ?2, ?3, ?4);",
            params![title, position as i64, note.label, encode_words(&note.words)?],
        )?;
    }
    Ok(())
}

fn append_invalid(tx: &Transaction<'_>, batch: &DemotedAnnotations) -> RepoResult<()> {
    let run_id = batch.run_id.to_string();
    for record in batch.invalid.records() {
        tx.execute(
            "INSERT INTO invalid_annotations (run_id, poem_title, annotation_kind, reason, label, words)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                run_id,
                batch.poem_title,
                record.kind.as_str(),
                record.reason.as_str(),
                record.label,
                encode_words(&record.words)?,
            ],
        )?;
    }
    Ok(())
}

fn parse_invalid_row(row: &Row<'_>) -> RepoResult<InvalidLogEntry> {
    let run_text: String = row.get("run_id")?;
    let run_id = Uuid::parse_str(&run_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid uuid value `{run_text}` in invalid_annotations.run_id"
        ))
    })?;
    let kind_text: String = row.get("annotation_kind")?;
    let kind = AnnotationKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("unknown annotation kind `{kind_text}`"))
    })?;
    let reason_text: String = row.get("reason")?;
    let reason = RejectionReason::parse(&reason_text)
        .ok_or_else(|| RepoError::InvalidData(format!("unknown rejection reason `{reason_text}`")))?;
    let words: String = row.get("words")?;

    Ok(InvalidLogEntry {
        run_id,
        poem_title: row.get("poem_title")?,
        record: InvalidRecord {
            kind,
            reason,
            label: row.get("label")?,
            words: decode_words(&words)?,
        },
        logged_at: row.get("logged_at")?,
    })
}

fn encode_words(words: &[OccurrenceKey]) -> RepoResult<String> {
    Ok(serde_json::to_string(words)?)
}

fn decode_words(value: &str) -> RepoResult<Vec<OccurrenceKey>> {
    Ok(serde_json::from_str(value)?)
}

fn poem_exists_in_tx(tx: &Transaction<'_>, title: &str) -> RepoResult<bool> {
    let found = tx
        .query_row("SELECT 1 FROM poems WHERE title = ?1;", [title], |row| {
            row.get::<_, i64>(0)
        })
        .optional()?;
    Ok(found.is_some())
}

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (
        "poems",
        &["title", "sort_order", "converted_poem", "word_count", "author", "centered"],
    ),
    ("quotes", &["poem_title", "position", "words"]),
    ("notes", &["poem_title", "position", "label", "words"]),
    (
        "invalid_annotations",
        &["run_id", "poem_title", "annotation_kind", "reason", "label", "words", "logged_at"],
    ),
];

fn ensure_poem_connection_ready(conn: &Connection) -> RepoResult<()> {
    for &(table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
