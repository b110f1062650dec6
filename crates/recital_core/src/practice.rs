//! Random selection of occurrences to hide during recall practice.
//!
//! # Invariants
//! - Words are whole space-delimited tokens; a chosen word hides every one
//!   of its sections, so punctuation is never picked on its own.
//! - Selections never repeat a word and are returned in poem order.
//! - Randomness comes from the caller's RNG so runs can be seeded.

use crate::model::annotation::Quote;
use crate::model::canonical::{CanonicalText, OccurrenceKey, Section, Token};
use rand::seq::index::sample;
use rand::Rng;

/// Number of words hidden at `percent` (clamped to 0..=100), rounded.
pub fn hidden_word_count(text: &CanonicalText, percent: u32) -> usize {
    let percent = f64::from(percent.min(100));
    (text.words().count() as f64 * percent / 100.0).round() as usize
}

/// Picks `min(count, words)` distinct words and returns their section keys.
pub fn select_hidden_words<R: Rng + ?Sized>(
    text: &CanonicalText,
    count: usize,
    rng: &mut R,
) -> Vec<OccurrenceKey> {
    let words: Vec<&Token> = text.words().collect();
    let mut picked = sample(rng, words.len(), count.min(words.len())).into_vec();
    picked.sort_unstable();
    picked
        .into_iter()
        .flat_map(|index| words[index].sections.iter().map(Section::key))
        .collect()
}

/// Picks `min(count, len)` distinct quotes and returns all their words.
///
/// `quotes` are expected in stored (poem) order, which the output keeps.
pub fn select_hidden_quotes<R: Rng + ?Sized>(
    quotes: &[Quote],
    count: usize,
    rng: &mut R,
) -> Vec<OccurrenceKey> {
    let mut picked = sample(rng, quotes.len(), count.min(quotes.len())).into_vec();
    picked.sort_unstable();
    picked
        .into_iter()
        .flat_map(|index| quotes[index].words.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{hidden_word_count, select_hidden_quotes, select_hidden_words};
    use crate::encoding::word_encoder::encode_poem;
    use crate::model::annotation::Quote;
    use crate::model::canonical::{OccurrenceSequence, Section};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn hidden_count_rounds_and_clamps() {
        let text = encode_poem("a b c d e f g h i j").text;
        assert_eq!(hidden_word_count(&text, 25), 3);
        assert_eq!(hidden_word_count(&text, 250), 10);
        assert_eq!(hidden_word_count(&text, 0), 0);
    }

    #[test]
    fn hidden_count_is_based_on_words_not_sections() {
        let encoded = encode_poem("a, b, c, d.");
        assert_eq!(hidden_word_count(&encoded.text, 100), encoded.word_count as usize);
        assert_eq!(hidden_word_count(&encoded.text, 50), 2);
    }

    #[test]
    fn punctuation_is_only_hidden_with_its_word() {
        let text = encode_poem("a, b, c, d.").text;
        let words: Vec<Vec<String>> = text
            .words()
            .map(|token| token.sections.iter().map(Section::key).collect())
            .collect();
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let hidden = select_hidden_words(&text, 2, &mut rng);
            assert_eq!(hidden.len(), 4, "seed {seed}");
            for chunk in hidden.chunks(2) {
                assert!(words.iter().any(|word| word.as_slice() == chunk), "seed {seed}");
            }
        }
    }

    #[test]
    fn hidden_words_are_distinct_and_in_poem_order() {
        let text = encode_poem("the cat sat on the mat, the end.").text;
        let sequence = OccurrenceSequence::from_text(&text);
        let mut rng = StdRng::seed_from_u64(7);

        let hidden = select_hidden_words(&text, 5, &mut rng);
        assert!(hidden.len() >= 5);
        let positions: Vec<usize> = hidden
            .iter()
            .map(|key| sequence.position(key).unwrap())
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn requesting_more_than_available_returns_everything() {
        let text = encode_poem("one two").text;
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(select_hidden_words(&text, 10, &mut rng).len(), 2);
    }

    #[test]
    fn hidden_quotes_expand_to_their_words() {
        let quotes = vec![
            Quote::new(vec!["{1}a{1}".into(), "{1}b{1}".into()]),
            Quote::new(vec!["{1}d{1}".into()]),
        ];
        let mut rng = StdRng::seed_from_u64(3);
        let hidden = select_hidden_quotes(&quotes, 2, &mut rng);
        assert_eq!(hidden, vec!["{1}a{1}", "{1}b{1}", "{1}d{1}"]);
    }
}
