// Chapter / topic / paragraph reconstruction from extracted text
pub mod chapters;
pub mod headings;
pub mod topics;

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use self::chapters::ChapterSpan;
use self::headings::HeadingIndex;
use self::topics::TopicSpan;
use crate::pdf_extraction::ExtractedDocument;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    /// "{chapter}.{topic}", both 1-based
    pub id: String,
    pub title: String,
    pub text: String,
    pub paragraphs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub number: usize,
    pub title: String,
    pub text: String,
    pub topics: Vec<Topic>,
}

/// Which heuristic produced the chapter boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterSource {
    TableOfContents,
    ChapterKeyword,
    FontSize,
    Numbered,
    WholeDocument,
}

impl fmt::Display for ChapterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChapterSource::TableOfContents => "table of contents",
            ChapterSource::ChapterKeyword => "chapter keyword",
            ChapterSource::FontSize => "font size",
            ChapterSource::Numbered => "numbered headings",
            ChapterSource::WholeDocument => "whole document",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentStructure {
    pub chapters: Vec<Chapter>,
    pub source: ChapterSource,
}

impl DocumentStructure {
    pub fn topic(&self, id: &str) -> Option<&Topic> {
        self.chapters.iter().flat_map(|c| c.topics.iter()).find(|t| t.id == id)
    }

    pub fn topic_count(&self) -> usize {
        self.chapters.iter().map(|c| c.topics.len()).sum()
    }

    pub fn chapter(&self, number: usize) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.number == number)
    }
}

/// Segments text into chapters and topics
#[derive(Debug, Default)]
pub struct TextAnalyzer;

impl TextAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Full analysis with outline and font-size cues available
    pub fn analyze(&self, document: &ExtractedDocument) -> DocumentStructure {
        let full_text = document.full_text();
        let headings = HeadingIndex::build(document);
        debug!("{} heading size tiers", headings.tier_count());

        let mut spans = chapters::from_toc(document, &full_text);
        let mut source = ChapterSource::TableOfContents;
        if spans.is_empty() {
            spans = chapters::from_keyword(&full_text);
            source = ChapterSource::ChapterKeyword;
        }
        if spans.is_empty() {
            spans = chapters::from_font_size(&headings, &full_text);
            source = ChapterSource::FontSize;
        }
        if spans.is_empty() {
            spans = chapters::from_numbered(&full_text);
            source = ChapterSource::Numbered;
        }
        if spans.is_empty() {
            spans = chapters::whole_document(&full_text);
            source = ChapterSource::WholeDocument;
        }

        self.build(&full_text, spans, source, Some(&headings))
    }

    /// Analysis of plain text: keyword, numbered, then whole document
    pub fn analyze_text(&self, text: &str) -> DocumentStructure {
        let mut spans = chapters::from_keyword(text);
        let mut source = ChapterSource::ChapterKeyword;
        if spans.is_empty() {
            spans = chapters::from_numbered(text);
            source = ChapterSource::Numbered;
        }
        if spans.is_empty() {
            spans = chapters::whole_document(text);
            source = ChapterSource::WholeDocument;
        }

        self.build(text, spans, source, None)
    }

    /// Passages introduced by explicit example markers
    pub fn extract_examples(&self, text: &str) -> Vec<String> {
        crate::example_generator::extract_marked_examples(text)
    }

    fn build(
        &self,
        full_text: &str,
        spans: Vec<ChapterSpan>,
        source: ChapterSource,
        headings: Option<&HeadingIndex>,
    ) -> DocumentStructure {
        if full_text.trim().is_empty() {
            info!("No text to segment");
            return DocumentStructure { chapters: Vec::new(), source };
        }

        // Topic headings sit one tier below font-size chapters
        let topic_tier = (source == ChapterSource::FontSize).then_some(1);

        let mut chapters = Vec::with_capacity(spans.len());
        for span in spans {
            let Some(raw) = full_text.get(span.start..span.end) else {
                continue;
            };
            let lead = raw.len() - raw.trim_start().len();
            let text = raw.trim();
            if text.is_empty() {
                continue;
            }
            let number = chapters.len() + 1;
            let chapter_start = span.start + lead;

            let font_marks = headings
                .map(|h| heading_marks(h, text, chapter_start, topic_tier))
                .unwrap_or_default();
            let chapter_topics = detect_topics(text, &font_marks)
                .into_iter()
                .enumerate()
                .map(|(i, found)| Topic {
                    id: format!("{}.{}", number, i + 1),
                    paragraphs: topics::split_paragraphs(&found.text),
                    title: found.title,
                    text: found.text,
                })
                .collect::<Vec<_>>();

            debug!("Chapter {} '{}': {} topics", number, span.title, chapter_topics.len());
            chapters.push(Chapter {
                number,
                title: span.title,
                text: text.to_string(),
                topics: chapter_topics,
            });
        }

        let structure = DocumentStructure { chapters, source };
        info!(
            "Found {} chapters ({}), {} topics",
            structure.chapters.len(),
            source,
            structure.topic_count()
        );
        structure
    }
}

fn detect_topics(text: &str, font_marks: &[(usize, String)]) -> Vec<TopicSpan> {
    let found = topics::from_numbered_sections(text);
    if !found.is_empty() {
        return found;
    }
    let found = topics::from_heading_marks(text, font_marks);
    if !found.is_empty() {
        return found;
    }
    let found = topics::from_title_lines(text);
    if !found.is_empty() {
        return found;
    }
    let found = topics::from_uppercase_paragraphs(text);
    if !found.is_empty() {
        return found;
    }
    topics::single_topic(text)
}

// Font-size headings inside the chapter, as chapter-relative offsets. The
// heading on the chapter's first line is its title, not a topic.
fn heading_marks(
    headings: &HeadingIndex,
    text: &str,
    chapter_start: usize,
    tier: Option<usize>,
) -> Vec<(usize, String)> {
    let first_line_end = chapter_start + text.find('\n').unwrap_or(text.len());
    headings
        .in_range(first_line_end, chapter_start + text.len())
        .filter(|m| tier.map_or(true, |t| m.tier == t))
        .map(|m| (m.offset - chapter_start, m.text.trim().to_string()))
        .collect()
}
