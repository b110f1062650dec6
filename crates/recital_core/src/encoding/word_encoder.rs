//! Raw poem text to canonical, word-addressable text.
//!
//! # Responsibility
//! - Split tokens at punctuation so punctuation is addressed separately.
//! - Number repeated surface texts so every occurrence has a unique key.
//!
//! # Invariants
//! - Instance numbering follows line order, then token order, then section
//!   order, starting at 1 per surface text.
//! - `word_count` counts non-empty space-delimited tokens before splitting.
//! - Encoding is pure; empty input yields empty text and a zero count.

use crate::model::canonical::{CanonicalText, Section, Token};
use std::collections::HashMap;

/// Characters that start a separately addressable section.
pub const SPECIAL_CHARACTERS: [char; 4] = ['.', ',', ':', ';'];

/// Output of the word encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPoem {
    pub text: CanonicalText,
    pub word_count: u32,
}

impl EncodedPoem {
    /// Marked form stored as `convertedPoem`.
    pub fn converted_text(&self) -> String {
        self.text.to_marked_string()
    }
}

#[derive(Debug, Default)]
struct InstanceCounter {
    seen: HashMap<String, u32>,
}

impl InstanceCounter {
    fn next(&mut self, surface: &str) -> u32 {
        let count = self.seen.entry(surface.to_string()).or_insert(0);
        *count += 1;
        *count
    }
}

/// Encodes a raw poem body (title and author lines already removed).
///
/// Lines are split on `\n` and tokens on single spaces, so runs of spaces
/// survive as empty tokens.
pub fn encode_poem(raw: &str) -> EncodedPoem {
    if raw.is_empty() {
        return EncodedPoem {
            text: CanonicalText::default(),
            word_count: 0,
        };
    }

    let mut counter = InstanceCounter::default();
    let mut word_count = 0u32;
    let mut lines = Vec::new();

    for raw_line in raw.split('\n') {
        let mut tokens = Vec::new();
        for raw_token in raw_line.split(' ') {
            if !raw_token.is_empty() {
                word_count += 1;
            }
            let sections = split_sections(raw_token)
                .into_iter()
                .map(|surface| Section::new(surface, counter.next(surface)))
                .collect();
            tokens.push(Token { sections });
        }
        lines.push(tokens);
    }

    EncodedPoem {
        text: CanonicalText { lines },
        word_count,
    }
}

/// Splits a token before each special character, dropping empty sections.
///
/// `end.` -> `end`, `.`; `a.b` -> `a`, `.b`; `...` -> `.`, `.`, `.`.
pub fn split_sections(token: &str) -> Vec<&str> {
    let mut sections = Vec::new();
    let mut start = 0;
    for (index, ch) in token.char_indices() {
        if SPECIAL_CHARACTERS.contains(&ch) && index > start {
            sections.push(&token[start..index]);
            start = index;
        }
    }
    if start < token.len() {
        sections.push(&token[start..]);
    }
    sections
}
