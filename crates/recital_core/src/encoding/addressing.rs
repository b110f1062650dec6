//! Deterministic identifiers for word occurrences and their letters.
//!
//! # Responsibility
//! - Derive occurrence keys shared by the encoder, checker and UI layer.
//! - Derive element-safe identifiers for occurrences and single letters.
//!
//! # Invariants
//! - `element_id` output only contains `[A-Za-z0-9_-]`.
//! - Every character outside `[A-Za-z0-9-]` is substitution-encoded as
//!   `_<hex code point>_`, so the encoding is injective and reversible.
//! - `letter_key` is injective in the letter for a fixed occurrence key.

use crate::model::canonical::{CanonicalTextError, OccurrenceKey, Section};

const ELEMENT_PREFIX: &str = "w-";
const LETTER_INFIX: &str = "_L";
const SUBSTITUTION_MARK: char = '_';

/// Key for the `instance`-th occurrence of `surface`.
///
/// `surface` must be non-empty.
pub fn occurrence_key(surface: &str, instance: u32) -> OccurrenceKey {
    Section::new(surface, instance).key()
}

/// Splits a key back into surface text and instance index.
pub fn parse_occurrence_key(key: &str) -> Result<(String, u32), CanonicalTextError> {
    let section = Section::parse_key(key)?;
    Ok((section.surface, section.instance))
}

/// Identifier-safe form of an occurrence key.
pub fn element_id(key: &str) -> String {
    let mut out = String::with_capacity(ELEMENT_PREFIX.len() + key.len() * 2);
    out.push_str(ELEMENT_PREFIX);
    out.push_str(&encode_identifier(key));
    out
}

/// Identifier for one letter of an occurrence.
pub fn letter_key(key: &str, letter: char) -> String {
    format!("{}{LETTER_INFIX}{:x}", element_id(key), u32::from(letter))
}

/// Letter identifiers for every character of a section, in order.
pub fn section_letter_keys(section: &Section) -> Vec<String> {
    let key = section.key();
    section
        .surface
        .chars()
        .map(|letter| letter_key(&key, letter))
        .collect()
}

/// Reverses `element_id`.
pub fn decode_element_id(id: &str) -> Option<OccurrenceKey> {
    decode_identifier(id.strip_prefix(ELEMENT_PREFIX)?)
}

/// Reverses `letter_key`.
pub fn decode_letter_key(id: &str) -> Option<(OccurrenceKey, char)> {
    let (element, hex) = id.rsplit_once(LETTER_INFIX)?;
    let code_point = u32::from_str_radix(hex, 16).ok()?;
    Some((decode_element_id(element)?, char::from_u32(code_point)?))
}

/// Substitution-encodes every character outside `[A-Za-z0-9-]`.
pub fn encode_identifier(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' {
            out.push(ch);
        } else {
            out.push(SUBSTITUTION_MARK);
            out.push_str(&format!("{:x}", u32::from(ch)));
            out.push(SUBSTITUTION_MARK);
        }
    }
    out
}

/// Reverses `encode_identifier`; `None` on malformed input.
pub fn decode_identifier(encoded: &str) -> Option<String> {
    let mut out = String::with_capacity(encoded.len());
    let mut chars = encoded.chars();
    while let Some(ch) = chars.next() {
        if ch != SUBSTITUTION_MARK {
            out.push(ch);
            continue;
        }
        let mut hex = String::new();
        loop {
            match chars.next()? {
                SUBSTITUTION_MARK => break,
                digit => hex.push(digit),
            }
        }
        out.push(char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::{
        decode_element_id, decode_identifier, decode_letter_key, element_id, encode_identifier,
        letter_key, occurrence_key, parse_occurrence_key, section_letter_keys,
    };
    use crate::model::canonical::Section;

    #[test]
    fn occurrence_key_matches_encoder_marked_form() {
        assert_eq!(occurrence_key("rose", 2), "{2}rose{2}");
        assert_eq!(
            parse_occurrence_key("{2}rose{2}").unwrap(),
            ("rose".to_string(), 2)
        );
    }

    #[test]
    fn element_ids_only_use_identifier_safe_characters() {
        let id = element_id("{1}\"Hope\"{1}");
        assert!(id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'));
        assert_eq!(decode_element_id(&id).as_deref(), Some("{1}\"Hope\"{1}"));
    }

    #[test]
    fn quote_characters_are_encoded_not_collapsed() {
        let double = element_id("{1}\"a{1}");
        let single = element_id("{1}'a{1}");
        assert_ne!(double, single);
    }

    #[test]
    fn letter_keys_are_injective_and_reversible() {
        let key = occurrence_key("tea_L", 1);
        let upper = letter_key(&key, 'T');
        let lower = letter_key(&key, 't');
        let accented = letter_key(&key, 'é');
        assert_ne!(upper, lower);
        assert_ne!(lower, accented);
        assert_eq!(decode_letter_key(&accented), Some((key.clone(), 'é')));
        assert_eq!(decode_letter_key(&upper), Some((key, 'T')));
    }

    #[test]
    fn section_letter_keys_follow_surface_letters() {
        let keys = section_letter_keys(&Section::new("ab", 1));
        assert_eq!(keys.len(), 2);
        assert!(keys[0].ends_with("_L61"));
        assert!(keys[1].ends_with("_L62"));
    }

    #[test]
    fn identifier_encoding_round_trips_underscores_and_unicode() {
        let raw = "a_b cßd";
        let encoded = encode_identifier(raw);
        assert_eq!(decode_identifier(&encoded).as_deref(), Some(raw));
        assert_eq!(decode_identifier("_zz_"), None);
    }
}
