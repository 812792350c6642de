// Sentence and word utilities shared by the summarizer and example finder.
// Sentences break after terminal punctuation, never after known abbreviations
// or initials.
use once_cell::sync::Lazy;
use std::collections::HashSet;
use stop_words::{get, LANGUAGE};

const ABBREVIATIONS: &[&str] = &[
    "e.g", "i.e", "etc", "vs", "cf", "al", "approx", "dr", "mr", "mrs", "ms", "prof", "st", "jr",
    "sr", "fig", "figs", "eq", "eqs", "ch", "sec", "vol", "pp", "ref", "dept", "inc", "ltd",
];

const CLOSERS: &[char] = &['"', '\'', '”', '’', ')', ']'];
const OPENERS: &[char] = &['"', '\'', '“', '‘', '(', '['];

static STOPWORDS: Lazy<HashSet<String>> =
    Lazy::new(|| get(LANGUAGE::English).iter().map(|s| s.to_string()).collect());

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word.to_lowercase())
}

/// Split text into sentences, each with internal whitespace collapsed
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        let (pos, ch) = chars[i];
        if matches!(ch, '.' | '!' | '?') {
            // Absorb runs like "?!" or "..." and closing quotes/brackets
            let mut j = i + 1;
            while j < chars.len() && (matches!(chars[j].1, '.' | '!' | '?') || CLOSERS.contains(&chars[j].1)) {
                j += 1;
            }
            let end = chars.get(j).map(|(p, _)| *p).unwrap_or(text.len());

            if is_boundary(&chars, j) && !(ch == '.' && is_abbreviation(&text[..pos])) {
                push_sentence(&mut sentences, &text[start..end]);
                start = end;
            }
            i = j;
            continue;
        }
        i += 1;
    }

    if start < text.len() {
        push_sentence(&mut sentences, &text[start..]);
    }
    sentences
}

fn push_sentence(sentences: &mut Vec<String>, raw: &str) {
    let cleaned = clean_text(raw);
    if !cleaned.is_empty() {
        sentences.push(cleaned);
    }
}

// A boundary needs whitespace next, then an opener, capital or digit (or end of text)
fn is_boundary(chars: &[(usize, char)], next: usize) -> bool {
    match chars.get(next) {
        None => true,
        Some((_, c)) if c.is_whitespace() => {
            let following = chars[next..].iter().map(|(_, c)| *c).find(|c| !c.is_whitespace());
            match following {
                None => true,
                Some(c) => c.is_uppercase() || c.is_ascii_digit() || OPENERS.contains(&c),
            }
        }
        Some(_) => false,
    }
}

// `before` is the text preceding the period
fn is_abbreviation(before: &str) -> bool {
    let token: String = before
        .chars()
        .rev()
        .take_while(|c| c.is_alphanumeric() || *c == '.')
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let token = token.trim_matches('.');
    if token.is_empty() {
        return false;
    }

    // Single-letter initials such as "J. Smith"
    let mut letters = token.chars();
    if let (Some(first), None) = (letters.next(), letters.next()) {
        if first.is_uppercase() {
            return true;
        }
    }

    ABBREVIATIONS.contains(&token.to_lowercase().as_str())
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Collapse whitespace runs to single spaces and trim
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `n` sentences joined by spaces
pub fn leading_sentences(text: &str, n: usize) -> String {
    split_sentences(text).into_iter().take(n).collect::<Vec<_>>().join(" ")
}

/// Lowercased alphanumeric words with stopwords removed
pub fn content_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 1)
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(w))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_split() {
        let sentences = split_sentences("Force causes motion. Mass resists it! Does it? Yes.");
        assert_eq!(sentences, vec!["Force causes motion.", "Mass resists it!", "Does it?", "Yes."]);
    }

    #[test]
    fn test_abbreviations_do_not_split() {
        let sentences = split_sentences(
            "Vectors have direction, e.g. Velocity is one. See Fig. 3 for details. Dr. Lee agrees.",
        );
        assert_eq!(
            sentences,
            vec![
                "Vectors have direction, e.g. Velocity is one.",
                "See Fig. 3 for details.",
                "Dr. Lee agrees.",
            ]
        );
    }

    #[test]
    fn test_decimals_and_initials() {
        let sentences = split_sentences("The value is 3.14 exactly. J. Smith measured it.");
        assert_eq!(sentences, vec!["The value is 3.14 exactly.", "J. Smith measured it."]);
    }

    #[test]
    fn test_lowercase_continuation_and_quotes() {
        let sentences = split_sentences("He said \"stop.\" Then he left. it was late");
        assert_eq!(sentences, vec!["He said \"stop.\"", "Then he left. it was late"]);
    }

    #[test]
    fn test_whitespace_collapsed_and_trailing_fragment_kept() {
        let sentences = split_sentences("Line one\nwraps here.   Second part without end");
        assert_eq!(sentences, vec!["Line one wraps here.", "Second part without end"]);
    }

    #[test]
    fn test_word_helpers() {
        assert_eq!(word_count("  a b\nc  "), 3);
        assert_eq!(clean_text(" a \n\n b "), "a b");
        assert_eq!(leading_sentences("One. Two. Three.", 2), "One. Two.");
        let words = content_words("The energy of the system is conserved.");
        assert!(words.contains(&"energy".to_string()));
        assert!(!words.contains(&"the".to_string()));
    }
}
