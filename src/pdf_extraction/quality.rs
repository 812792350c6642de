// Extracted-text quality scoring, used to choose between extraction paths
// and to flag pages that are probably scanned images.

/// Below this score the content-stream walk is retried with lopdf's extractor
pub const FALLBACK_THRESHOLD: f32 = 0.4;

/// Calculate quality score for extracted text (0.0-1.0)
pub fn calculate_quality_score(text: &str) -> f32 {
    if text.trim().is_empty() {
        return 0.0;
    }

    let checks = [
        text.len() > 10,                  // Has content
        text.contains(". "),              // Has sentences
        !is_mostly_gibberish(text),       // Not gibberish
        has_dictionary_words(text),       // Has real words
        has_reasonable_whitespace(text),  // Proper formatting
    ];

    let passed = checks.iter().filter(|&&x| x).count() as f32;
    passed / checks.len() as f32
}

/// Check if text is mostly gibberish
fn is_mostly_gibberish(text: &str) -> bool {
    let letters = text.chars().filter(|c| c.is_alphabetic()).count();
    if letters == 0 {
        return true;
    }

    // Vowel ratio over letters only
    let vowel_count = text.chars().filter(|c| "aeiouAEIOU".contains(*c)).count();
    let vowel_ratio = vowel_count as f32 / letters as f32;

    vowel_ratio < 0.2 || vowel_ratio > 0.6
}

/// Check if text has dictionary words
fn has_dictionary_words(text: &str) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return false;
    }

    // Simple check: words should be mostly alphabetic and reasonable length
    let valid_words = words
        .iter()
        .filter(|w| w.chars().count() >= 2 && w.chars().count() <= 20)
        .filter(|w| {
            let total = w.chars().count() as f32;
            let alpha_ratio = w.chars().filter(|c| c.is_alphabetic()).count() as f32 / total;
            alpha_ratio > 0.7
        })
        .count();

    valid_words as f32 / words.len() as f32 > 0.5
}

/// Check if text has reasonable whitespace
fn has_reasonable_whitespace(text: &str) -> bool {
    let total = text.chars().count();
    if total == 0 {
        return false;
    }

    let whitespace_count = text.chars().filter(|c| c.is_whitespace()).count();
    let whitespace_ratio = whitespace_count as f32 / total as f32;

    whitespace_ratio > 0.05 && whitespace_ratio < 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_score() {
        assert!(calculate_quality_score("This is a normal sentence. It has good structure.") > 0.7);
        assert!(calculate_quality_score("xvqpz kljfd qwrty") < 0.7);
        assert_eq!(calculate_quality_score(""), 0.0);
        assert_eq!(calculate_quality_score("   \n "), 0.0);
    }

    #[test]
    fn test_cid_garbage_scores_low() {
        let garbage = "\u{1}\u{3}\u{0}\u{12}\u{1}\u{5}\u{0}\u{7}";
        assert!(calculate_quality_score(garbage) < FALLBACK_THRESHOLD);
    }
}
