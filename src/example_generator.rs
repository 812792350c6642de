// Worked examples for a topic: marked passages in the text first, then
// generated ones built around the topic's key concepts.
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::ExamplesConfig;
use crate::models::{ConceptRecall, TextGenerator};
use crate::nlp::{is_stopword, split_sentences};

// Passages shorter than this are not worth showing
const MIN_EXAMPLE_CHARS: usize = 20;
const MAX_EXAMPLE_SENTENCES: usize = 5;
const PROMPT_EXCERPT_CHARS: usize = 100;

static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]+)""#).expect("valid regex"));
static CAPITALIZED_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)\b").expect("valid regex"));

/// Where a marker's passage stops
#[derive(Debug, Clone, Copy)]
enum PassageEnd {
    /// Next line that starts a new numbered example
    NextNumberedExample,
    /// Next blank line
    BlankLine,
}

struct ExamplePattern {
    marker: Regex,
    end: PassageEnd,
}

static NEXT_NUMBERED_EXAMPLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\nexample\s+\d+").expect("valid regex"));

// Order matters: numbered examples, "for example", "e.g.", bare "example"
static PATTERNS: Lazy<Vec<ExamplePattern>> = Lazy::new(|| {
    [
        (r"(?i)example\s+\d+[\s:]+", PassageEnd::NextNumberedExample),
        (r"(?i)for example[\s:]+", PassageEnd::BlankLine),
        (r"(?i)e\.g\.\s+", PassageEnd::BlankLine),
        (r"(?i)\bexample\b[\s:]*", PassageEnd::BlankLine),
    ]
    .into_iter()
    .map(|(marker, end)| ExamplePattern { marker: Regex::new(marker).expect("valid regex"), end })
    .collect()
});

const MARKED_PATTERN_COUNT: usize = 3;

/// Passages following one marker, in text order. A passage starts at the
/// first non-blank character after the marker and runs to its terminator
/// (searched from the end of the passage's first line) or the end of text.
fn find_passages<'t>(text: &'t str, pattern: &ExamplePattern) -> Vec<&'t str> {
    let mut passages = Vec::new();
    let mut cursor = 0;

    while let Some(marker) = pattern.marker.find_at(text, cursor) {
        let start = marker.end();
        if start >= text.len() {
            break;
        }
        let first_line_end = text[start..].find('\n').map(|i| start + i).unwrap_or(text.len());
        let end = match pattern.end {
            PassageEnd::NextNumberedExample => NEXT_NUMBERED_EXAMPLE
                .find_at(text, first_line_end)
                .map(|m| m.start())
                .unwrap_or(text.len()),
            PassageEnd::BlankLine => text[first_line_end..]
                .find("\n\n")
                .map(|i| first_line_end + i)
                .unwrap_or(text.len()),
        };
        passages.push(&text[start..end]);
        cursor = end;
    }
    passages
}

/// Examples introduced by an explicit marker: numbered examples, "for
/// example" and "e.g." passages, trimmed
pub fn extract_marked_examples(text: &str) -> Vec<String> {
    PATTERNS
        .iter()
        .take(MARKED_PATTERN_COUNT)
        .flat_map(|pattern| find_passages(text, pattern))
        .map(|passage| passage.trim().to_string())
        .filter(|passage| !passage.is_empty())
        .collect()
}

/// All example passages worth showing: every marker including a bare
/// "example", leading punctuation removed, short and repeated passages
/// dropped
pub fn extract_examples(text: &str) -> Vec<String> {
    let mut examples: Vec<String> = Vec::new();
    for pattern in PATTERNS.iter() {
        for passage in find_passages(text, pattern) {
            let example = passage.trim().trim_start_matches([',', ';', ':']).trim();
            if example.chars().count() > MIN_EXAMPLE_CHARS && !examples.iter().any(|e| e == example) {
                examples.push(example.to_string());
            }
        }
    }
    examples
}

/// Quoted phrases, then runs of capitalised words; the first sentence when
/// neither exists
pub fn extract_key_concepts(text: &str) -> Vec<String> {
    let mut concepts: Vec<String> = QUOTED
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    concepts.extend(
        CAPITALIZED_RUN
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| crate::nlp::clean_text(m.as_str()))
            // A lone sentence-initial "The" or "This" is not a concept
            .filter(|run| run.contains(' ') || !is_stopword(run)),
    );

    if concepts.is_empty() {
        if let Some(first) = split_sentences(text).into_iter().next() {
            concepts.push(first);
        }
    }
    concepts
}

/// At most five sentences, cut back to the last sentence terminator when
/// the text stops mid-sentence
pub fn clean_generated_example(text: &str) -> String {
    let mut cleaned = split_sentences(text)
        .into_iter()
        .take(MAX_EXAMPLE_SENTENCES)
        .collect::<Vec<_>>()
        .join(" ");

    let is_terminator = |c: char| matches!(c, '.' | '!' | '?');
    if cleaned.chars().last().map_or(false, |c| !is_terminator(c)) {
        if let Some(last) = cleaned.rfind(is_terminator) {
            if last > 0 {
                cleaned.truncate(last + 1);
            }
        }
    }
    cleaned
}

pub fn placeholder_example(index: usize) -> String {
    format!("Example {}: This is a placeholder example for the topic.", index)
}

fn build_prompt(concepts: &[String], topic_text: &str, index: usize) -> String {
    if concepts.is_empty() {
        let excerpt: String = topic_text.chars().take(PROMPT_EXCERPT_CHARS).collect();
        format!("Example for this topic: {}...", excerpt)
    } else {
        format!("Example of {}: ", concepts[index % concepts.len()])
    }
}

// Generators echo the prompt; tokenizer round trips may alter its spacing
fn remove_prompt<'a>(generated: &'a str, prompt: &str) -> &'a str {
    if let Some(rest) = generated.strip_prefix(prompt) {
        return rest;
    }
    if let Some(rest) = generated.strip_prefix(prompt.trim_end()) {
        return rest;
    }
    generated.get(prompt.len()..).unwrap_or(generated)
}

pub struct ExampleGenerator {
    generator: Box<dyn TextGenerator>,
    config: ExamplesConfig,
}

impl ExampleGenerator {
    pub fn new(generator: Box<dyn TextGenerator>, config: ExamplesConfig) -> Self {
        Self { generator, config }
    }

    /// Generator that recalls sentences from the topic itself
    pub fn with_fallback(config: ExamplesConfig) -> Self {
        Self::new(Box::new(ConceptRecall::new()), config)
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Up to `num_examples` examples: the text's own first, generated ones
    /// after them
    pub fn generate_examples(&mut self, topic_text: &str, num_examples: usize) -> Vec<String> {
        let mut examples = extract_examples(topic_text);
        if examples.len() >= num_examples {
            examples.truncate(num_examples);
            return examples;
        }

        let needed = num_examples - examples.len();
        debug!("Found {} examples in text, generating {}", examples.len(), needed);
        examples.extend(self.generate_new(topic_text, needed));
        examples
    }

    fn generate_new(&mut self, topic_text: &str, count: usize) -> Vec<String> {
        let concepts = extract_key_concepts(topic_text);
        self.generator.set_context(topic_text);

        let mut generated = Vec::with_capacity(count);
        for i in 0..count {
            let prompt = build_prompt(&concepts, topic_text, i);
            match self.generator.generate(&prompt, self.config.max_length) {
                Ok(output) => {
                    let example = clean_generated_example(remove_prompt(&output, &prompt).trim());
                    if example.chars().count() > MIN_EXAMPLE_CHARS {
                        generated.push(example);
                    } else {
                        debug!("Discarded short generated example for prompt '{}'", prompt);
                    }
                }
                Err(e) => {
                    warn!("Example generation failed with {}: {}", self.generator.name(), e);
                    generated.push(placeholder_example(i + 1));
                }
            }
        }
        generated
    }
}
