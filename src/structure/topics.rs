// Topic boundary strategies inside one chapter's text. Offsets are relative
// to the chapter text.
use once_cell::sync::Lazy;
use regex::Regex;

static NUMBERED_SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*\d+\.\d+\s+([^\n]+)").expect("valid regex"));
static TITLE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([A-Z][^\n.]{0,99})\n").expect("valid regex"));
static BLANK_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n").expect("valid regex"));

const UPPERCASE_HEADING_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct TopicSpan {
    pub title: String,
    pub text: String,
}

/// "2.1 Title" lines
pub fn from_numbered_sections(text: &str) -> Vec<TopicSpan> {
    let marks: Vec<(usize, String)> = NUMBERED_SECTION
        .captures_iter(text)
        .filter_map(|caps| Some((caps.get(0)?.start(), caps.get(1)?.as_str().trim().to_string())))
        .collect();
    spans_between(text, &marks)
}

/// Heading lines found by font size, already mapped to chapter-relative offsets
pub fn from_heading_marks(text: &str, marks: &[(usize, String)]) -> Vec<TopicSpan> {
    spans_between(text, marks)
}

/// Short capitalised lines without a period that open a paragraph
pub fn from_title_lines(text: &str) -> Vec<TopicSpan> {
    let marks: Vec<(usize, String)> = TITLE_LINE
        .captures_iter(text)
        .filter_map(|caps| {
            let line = caps.get(1)?;
            if !opens_paragraph(text, line.start()) {
                return None;
            }
            Some((line.start(), line.as_str().trim().to_string()))
        })
        .collect();
    spans_between(text, &marks)
}

/// ALL-CAPS paragraphs act as headings for the paragraphs that follow.
/// Paragraphs before the first heading, or in a text without any, go under
/// "Topic".
pub fn from_uppercase_paragraphs(text: &str) -> Vec<TopicSpan> {
    let mut topics = Vec::new();
    let mut title = "Topic".to_string();
    let mut body: Vec<&str> = Vec::new();

    for paragraph in BLANK_LINE.split(text).map(str::trim).filter(|p| !p.is_empty()) {
        if paragraph.chars().count() < UPPERCASE_HEADING_MAX_CHARS && is_uppercase(paragraph) {
            if !body.is_empty() {
                topics.push(TopicSpan { title: title.clone(), text: body.join("\n\n") });
                body.clear();
            }
            title = paragraph.to_string();
        } else {
            body.push(paragraph);
        }
    }
    if !body.is_empty() {
        topics.push(TopicSpan { title, text: body.join("\n\n") });
    }
    topics
}

/// Fallback when the chapter holds nothing but headings
pub fn single_topic(text: &str) -> Vec<TopicSpan> {
    vec![TopicSpan { title: "Main Topic".to_string(), text: text.trim().to_string() }]
}

/// Paragraphs of a topic: blank-line separated, whitespace collapsed
pub fn split_paragraphs(text: &str) -> Vec<String> {
    BLANK_LINE
        .split(text)
        .map(crate::nlp::clean_text)
        .filter(|p| !p.is_empty())
        .collect()
}

fn spans_between(text: &str, marks: &[(usize, String)]) -> Vec<TopicSpan> {
    marks
        .iter()
        .enumerate()
        .filter_map(|(i, (start, title))| {
            let end = marks.get(i + 1).map(|m| m.0).unwrap_or(text.len());
            let body = text.get(*start..end)?.trim();
            Some(TopicSpan { title: title.clone(), text: body.to_string() })
        })
        .collect()
}

// Start of text, or the previous line is blank
fn opens_paragraph(text: &str, line_start: usize) -> bool {
    if line_start == 0 {
        return true;
    }
    let before = &text[..line_start - 1];
    before.rsplit('\n').next().map(|prev| prev.trim().is_empty()).unwrap_or(true)
}

// At least one cased character and no lowercase ones
fn is_uppercase(text: &str) -> bool {
    text.chars().any(char::is_uppercase) && !text.chars().any(char::is_lowercase)
}
