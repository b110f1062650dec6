//! Structured canonical poem text and its marked serialization.
//!
//! # Responsibility
//! - Hold every word occurrence as a tagged record instead of splicing
//!   instance markers into free text.
//! - Convert to and from the marked string stored as `convertedPoem`.
//!
//! # Invariants
//! - A `Section` surface is never empty and its `instance` is at least 1.
//! - Reserved characters (`\ { } |`) inside surface text are always escaped,
//!   so purely numeric words never collide with instance markers.
//! - `CanonicalText::parse(&text.to_marked_string())` returns `text` for any
//!   text produced by the word encoder.

use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Marked form of one word occurrence, e.g. `{2}rose{2}`.
///
/// Unique within one poem; used verbatim in stored notes and quotes.
pub type OccurrenceKey = String;

const MARKER_OPEN: char = '{';
const MARKER_CLOSE: char = '}';
const SECTION_SEPARATOR: char = '|';
const ESCAPE: char = '\\';
const TOKEN_SEPARATOR: char = ' ';
const LINE_SEPARATOR: char = '\n';

/// Errors raised while parsing marked canonical text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalTextError {
    /// Input ended inside a marker or section.
    UnexpectedEnd,
    /// A character appeared where the format does not allow it.
    UnexpectedCharacter { found: char, expected: &'static str },
    /// Marker content is not a positive decimal index.
    InvalidInstance(String),
    /// Opening and closing markers of one section disagree.
    MismatchedMarker { open: u32, close: u32 },
    /// A section carries no surface text.
    EmptySection,
    /// Escape prefix followed by a non-reserved character.
    InvalidEscape(char),
    /// A single occurrence key was expected but the input held several.
    NotSingleOccurrence(usize),
}

impl Display for CanonicalTextError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedEnd => write!(f, "marked text ended inside an occurrence"),
            Self::UnexpectedCharacter { found, expected } => {
                write!(f, "unexpected character `{found}`, expected {expected}")
            }
            Self::InvalidInstance(raw) => write!(f, "invalid instance marker `{raw}`"),
            Self::MismatchedMarker { open, close } => {
                write!(f, "instance markers disagree: opened {open}, closed {close}")
            }
            Self::EmptySection => write!(f, "occurrence has empty surface text"),
            Self::InvalidEscape(ch) => write!(f, "invalid escape sequence `\\{ch}`"),
            Self::NotSingleOccurrence(count) => {
                write!(f, "expected exactly one occurrence, found {count}")
            }
        }
    }
}

impl Error for CanonicalTextError {}

/// One addressable word occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Section {
    /// Visible text without markers.
    pub surface: String,
    /// 1-based count of this surface text in poem order.
    pub instance: u32,
}

impl Section {
    pub fn new(surface: impl Into<String>, instance: u32) -> Self {
        Self {
            surface: surface.into(),
            instance,
        }
    }

    /// Returns the marked form used as this occurrence's stable key.
    pub fn key(&self) -> OccurrenceKey {
        let mut out = String::with_capacity(self.surface.len() + 6);
        write_section(&mut out, self);
        out
    }

    /// Parses exactly one marked occurrence back into a section.
    pub fn parse_key(key: &str) -> Result<Self, CanonicalTextError> {
        let mut token = parse_token(key)?;
        if token.sections.len() != 1 {
            return Err(CanonicalTextError::NotSingleOccurrence(token.sections.len()));
        }
        Ok(token.sections.remove(0))
    }
}

/// One space-delimited token: either empty or a run of adjacent sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Token {
    pub sections: Vec<Section>,
}

impl Token {
    /// Empty tokens come from consecutive spaces and carry no occurrence.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Token text with sections reattached and markers removed.
    pub fn plain_text(&self) -> String {
        self.sections
            .iter()
            .map(|section| section.surface.as_str())
            .collect()
    }
}

/// Canonical poem body as lines of tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalText {
    pub lines: Vec<Vec<Token>>,
}

impl CanonicalText {
    /// Iterates occurrences in poem order: line, then token, then section.
    pub fn occurrences(&self) -> impl Iterator<Item = &Section> + '_ {
        self.lines
            .iter()
            .flat_map(|line| line.iter())
            .flat_map(|token| token.sections.iter())
    }

    /// Returns every occurrence key in poem order.
    pub fn occurrence_keys(&self) -> Vec<OccurrenceKey> {
        self.occurrences().map(Section::key).collect()
    }

    /// Number of word occurrences (punctuation sections included).
    pub fn occurrence_count(&self) -> usize {
        self.occurrences().count()
    }

    /// Non-empty tokens in poem order; one per counted word.
    pub fn words(&self) -> impl Iterator<Item = &Token> + '_ {
        self.lines
            .iter()
            .flat_map(|line| line.iter())
            .filter(|token| !token.is_empty())
    }

    /// Poem text with every marker and separator stripped.
    pub fn plain_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| {
                line.iter()
                    .map(Token::plain_text)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Serializes into the marked storage format.
    pub fn to_marked_string(&self) -> String {
        let mut out = String::new();
        for (line_index, line) in self.lines.iter().enumerate() {
            if line_index > 0 {
                out.push(LINE_SEPARATOR);
            }
            for (token_index, token) in line.iter().enumerate() {
                if token_index > 0 {
                    out.push(TOKEN_SEPARATOR);
                }
                for (section_index, section) in token.sections.iter().enumerate() {
                    if section_index > 0 {
                        out.push(SECTION_SEPARATOR);
                    }
                    write_section(&mut out, section);
                }
            }
        }
        out
    }

    /// Parses the marked storage format.
    ///
    /// # Errors
    /// - Returns `CanonicalTextError` for unterminated or mismatched markers,
    ///   invalid escapes and empty sections.
    pub fn parse(marked: &str) -> Result<Self, CanonicalTextError> {
        if marked.is_empty() {
            return Ok(Self::default());
        }

        let mut lines = Vec::new();
        for raw_line in marked.split(LINE_SEPARATOR) {
            let mut tokens = Vec::new();
            for raw_token in raw_line.split(TOKEN_SEPARATOR) {
                tokens.push(parse_token(raw_token)?);
            }
            lines.push(tokens);
        }
        Ok(Self { lines })
    }
}

/// Ordered occurrence keys with constant-time position lookup.
///
/// Built once per validation pass; positions follow poem order.
#[derive(Debug, Clone, Default)]
pub struct OccurrenceSequence {
    keys: Vec<OccurrenceKey>,
    positions: HashMap<OccurrenceKey, usize>,
}

impl OccurrenceSequence {
    pub fn from_text(text: &CanonicalText) -> Self {
        let keys = text.occurrence_keys();
        let mut positions = HashMap::with_capacity(keys.len());
        for (index, key) in keys.iter().enumerate() {
            positions.entry(key.clone()).or_insert(index);
        }
        Self { keys, positions }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    /// Position of the first occurrence with this key.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.keys.get(index).map(String::as_str)
    }

    pub fn keys(&self) -> &[OccurrenceKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn is_reserved(ch: char) -> bool {
    matches!(ch, MARKER_OPEN | MARKER_CLOSE | SECTION_SEPARATOR | ESCAPE)
}

fn write_section(out: &mut String, section: &Section) {
    let marker = format!("{MARKER_OPEN}{}{MARKER_CLOSE}", section.instance);
    out.push_str(&marker);
    for ch in section.surface.chars() {
        if is_reserved(ch) {
            out.push(ESCAPE);
        }
        out.push(ch);
    }
    out.push_str(&marker);
}

fn parse_token(raw: &str) -> Result<Token, CanonicalTextError> {
    let mut sections = Vec::new();
    let mut chars = raw.chars().peekable();

    while chars.peek().is_some() {
        let open = read_marker(&mut chars)?;
        let surface = read_surface(&mut chars)?;
        let close = read_marker(&mut chars)?;
        if open != close {
            return Err(CanonicalTextError::MismatchedMarker { open, close });
        }
        if surface.is_empty() {
            return Err(CanonicalTextError::EmptySection);
        }
        sections.push(Section::new(surface, open));

        match chars.next() {
            None => break,
            Some(SECTION_SEPARATOR) if chars.peek().is_some() => continue,
            Some(SECTION_SEPARATOR) => return Err(CanonicalTextError::UnexpectedEnd),
            Some(found) => {
                return Err(CanonicalTextError::UnexpectedCharacter {
                    found,
                    expected: "section separator or end of token",
                })
            }
        }
    }

    Ok(Token { sections })
}

fn read_marker(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Result<u32, CanonicalTextError> {
    match chars.next() {
        Some(MARKER_OPEN) => {}
        Some(found) => {
            return Err(CanonicalTextError::UnexpectedCharacter {
                found,
                expected: "instance marker",
            })
        }
        None => return Err(CanonicalTextError::UnexpectedEnd),
    }

    let mut digits = String::new();
    loop {
        match chars.next() {
            Some(MARKER_CLOSE) => break,
            Some(ch) => digits.push(ch),
            None => return Err(CanonicalTextError::UnexpectedEnd),
        }
    }

    match digits.parse::<u32>() {
        Ok(value) if value >= 1 && digits.chars().all(|ch| ch.is_ascii_digit()) => Ok(value),
        _ => Err(CanonicalTextError::InvalidInstance(digits)),
    }
}

fn read_surface(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Result<String, CanonicalTextError> {
    let mut surface = String::new();
    loop {
        match chars.peek().copied() {
            Some(MARKER_OPEN) => return Ok(surface),
            Some(ESCAPE) => {
                chars.next();
                match chars.next() {
                    Some(ch) if is_reserved(ch) => surface.push(ch),
                    Some(ch) => return Err(CanonicalTextError::InvalidEscape(ch)),
                    None => return Err(CanonicalTextError::UnexpectedEnd),
                }
            }
            Some(found @ (MARKER_CLOSE | SECTION_SEPARATOR)) => {
                return Err(CanonicalTextError::UnexpectedCharacter {
                    found,
                    expected: "surface text or instance marker",
                })
            }
            Some(ch) => {
                chars.next();
                surface.push(ch);
            }
            None => return Err(CanonicalTextError::UnexpectedEnd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CanonicalText, CanonicalTextError, OccurrenceSequence, Section, Token};

    fn token(sections: &[(&str, u32)]) -> Token {
        Token {
            sections: sections
                .iter()
                .map(|(surface, instance)| Section::new(*surface, *instance))
                .collect(),
        }
    }

    #[test]
    fn section_key_wraps_surface_in_instance_markers() {
        assert_eq!(Section::new("rose", 2).key(), "{2}rose{2}");
    }

    #[test]
    fn numeric_and_reserved_surfaces_stay_unambiguous() {
        let numeric = Section::new("1914", 1);
        assert_eq!(numeric.key(), "{1}1914{1}");
        assert_eq!(Section::parse_key(&numeric.key()).unwrap(), numeric);

        let braces = Section::new("{a|b}\\", 3);
        assert_eq!(braces.key(), "{3}\\{a\\|b\\}\\\\{3}");
        assert_eq!(Section::parse_key(&braces.key()).unwrap(), braces);
    }

    #[test]
    fn marked_string_round_trips_lines_tokens_and_empty_tokens() {
        let text = CanonicalText {
            lines: vec![
                vec![token(&[("rose", 1), (",", 1)]), Token::default(), token(&[("a", 1)])],
                vec![],
                vec![token(&[("rose", 2)])],
            ],
        };
        let marked = text.to_marked_string();
        assert_eq!(marked, "{1}rose{1}|{1},{1}  {1}a{1}\n\n{2}rose{2}");
        assert_eq!(CanonicalText::parse(&marked).unwrap().to_marked_string(), marked);
        assert_eq!(text.plain_text(), "rose,  a\n\nrose");
    }

    #[test]
    fn parse_rejects_malformed_markers() {
        assert_eq!(
            CanonicalText::parse("{1}rose{2}").unwrap_err(),
            CanonicalTextError::MismatchedMarker { open: 1, close: 2 }
        );
        assert_eq!(
            CanonicalText::parse("{1}rose").unwrap_err(),
            CanonicalTextError::UnexpectedEnd
        );
        assert_eq!(
            CanonicalText::parse("{0}rose{0}").unwrap_err(),
            CanonicalTextError::InvalidInstance("0".to_string())
        );
        assert_eq!(
            CanonicalText::parse("{1}{1}").unwrap_err(),
            CanonicalTextError::EmptySection
        );
        assert!(matches!(
            CanonicalText::parse("rose"),
            Err(CanonicalTextError::UnexpectedCharacter { found: 'r', .. })
        ));
        assert_eq!(
            CanonicalText::parse("{1}r\\ose{1}").unwrap_err(),
            CanonicalTextError::InvalidEscape('o')
        );
    }

    #[test]
    fn occurrence_sequence_reports_positions_in_poem_order() {
        let text = CanonicalText::parse("{1}a{1} {1}b{1}|{1}.{1}\n{2}a{2}").unwrap();
        let sequence = OccurrenceSequence::from_text(&text);
        assert_eq!(sequence.len(), 4);
        assert_eq!(sequence.position("{1}b{1}"), Some(1));
        assert_eq!(sequence.position("{2}a{2}"), Some(3));
        assert_eq!(sequence.get(2), Some("{1}.{1}"));
        assert!(!sequence.contains("{3}a{3}"));
    }
}
