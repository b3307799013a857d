//! Word-frequency suggestions for find & replace.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Alphabetic runs bounded by non-word characters.
static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-z]+\b").unwrap());

/// Count case-folded alphabetic words of at least `min_len` letters across
/// `texts` and return the `limit` most frequent.
///
/// Order is descending count; ties keep the order in which the words were
/// first seen.
pub fn word_frequencies<S: AsRef<str>>(texts: &[S], min_len: usize, limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let mut seen = 0usize;

    for text in texts {
        let folded = text.as_ref().to_lowercase();
        for m in WORD.find_iter(&folded) {
            let word = m.as_str();
            if word.len() < min_len {
                continue;
            }
            let entry = counts.entry(word.to_string()).or_insert_with(|| {
                seen += 1;
                (0, seen)
            });
            entry.0 += 1;
        }
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(word, (count, first))| (word, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(word, count, _)| (word, count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_case_folded_words() {
        let words = word_frequencies(&["Invoice total", "INVOICE invoice Total"], 3, 30);
        assert_eq!(
            words,
            vec![("invoice".to_string(), 3), ("total".to_string(), 2)]
        );
    }

    #[test]
    fn skips_short_words_and_mixed_tokens() {
        let words = word_frequencies(&["an ox is big abc123 x_yz hello"], 3, 30);
        assert_eq!(
            words,
            vec![("big".to_string(), 1), ("hello".to_string(), 1)]
        );
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let words = word_frequencies(&["zebra apple mango", "mango apple zebra"], 3, 30);
        let order: Vec<&str> = words.iter().map(|(w, _)| w.as_str()).collect();
        assert_eq!(order, vec!["zebra", "apple", "mango"]);
    }

    #[test]
    fn limit_truncates() {
        let text: Vec<String> = (0..40)
            .map(|i| format!("word{}", "a".repeat(i + 1)))
            .collect();
        assert_eq!(word_frequencies(&[text.join(" ")], 3, 30).len(), 30);
    }

    #[test]
    fn empty_input() {
        let none: [&str; 0] = [];
        assert!(word_frequencies(&none, 3, 30).is_empty());
    }
}
