//! First-occurrence ordering for annotations and word lists.
//!
//! # Responsibility
//! - Keep notes, quotes and note word lists in poem order.
//!
//! # Invariants
//! - Sorting is a stable insertion sort keyed by the anchor word's position
//!   in the occurrence sequence; equal anchors keep their prior order.
//! - Anchors missing from the poem sort before every present anchor.

use crate::model::annotation::{Note, Quote};
use crate::model::canonical::{OccurrenceKey, OccurrenceSequence};

/// Sorts `items` by the poem position of the word returned by `anchor`.
pub fn sort_by_first_occurrence<T, F>(items: &mut [T], sequence: &OccurrenceSequence, anchor: F)
where
    F: Fn(&T) -> Option<&str>,
{
    let offset = |item: &T| -> i64 {
        anchor(item)
            .and_then(|word| sequence.position(word))
            .map_or(-1, |position| position as i64)
    };

    for index in 1..items.len() {
        let mut current = index;
        while current > 0 && offset(&items[current]) < offset(&items[current - 1]) {
            items.swap(current, current - 1);
            current -= 1;
        }
    }
}

/// Orders notes by their first word.
pub fn order_notes(notes: &mut [Note], sequence: &OccurrenceSequence) {
    sort_by_first_occurrence(notes, sequence, Note::first_word);
}

/// Orders quotes by their first word.
pub fn order_quotes(quotes: &mut [Quote], sequence: &OccurrenceSequence) {
    sort_by_first_occurrence(quotes, sequence, Quote::first_word);
}

/// Orders a word list into poem order.
pub fn order_words(words: &mut [OccurrenceKey], sequence: &OccurrenceSequence) {
    sort_by_first_occurrence(words, sequence, |word| Some(word.as_str()));
}
