// Font-size heading cues: lines set noticeably larger than the body text
use crate::pdf_extraction::ExtractedDocument;

// A line counts as a heading at this multiple of the body size
const HEADING_SCALE: f32 = 1.2;
const MAX_HEADING_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct HeadingMark {
    /// Byte offset of the heading line in the document's full text
    pub offset: usize,
    pub text: String,
    /// 0 is the largest size in the document
    pub tier: usize,
}

#[derive(Debug, Clone, Default)]
pub struct HeadingIndex {
    marks: Vec<HeadingMark>,
    tier_count: usize,
}

impl HeadingIndex {
    pub fn build(document: &ExtractedDocument) -> Self {
        let Some(body) = document.body_font_size() else {
            return Self::default();
        };
        let threshold = body * HEADING_SCALE;

        let mut candidates = Vec::new();
        for (page, page_offset) in document.pages.iter().zip(document.page_offsets()) {
            for line in &page.lines {
                if line.font_size >= threshold && is_heading_text(&line.text) {
                    let bucket = (line.font_size * 2.0).round() as u32;
                    candidates.push((page_offset + line.offset, line.text.clone(), bucket));
                }
            }
        }

        let mut buckets: Vec<u32> = candidates.iter().map(|c| c.2).collect();
        buckets.sort_unstable_by(|a, b| b.cmp(a));
        buckets.dedup();

        let marks = candidates
            .into_iter()
            .map(|(offset, text, bucket)| HeadingMark {
                offset,
                text,
                tier: buckets.iter().position(|b| *b == bucket).unwrap_or(0),
            })
            .collect();

        Self { marks, tier_count: buckets.len() }
    }

    pub fn tier_count(&self) -> usize {
        self.tier_count
    }

    pub fn in_tier(&self, tier: usize) -> impl Iterator<Item = &HeadingMark> {
        self.marks.iter().filter(move |m| m.tier == tier)
    }

    /// Headings whose line starts inside `[start, end)`
    pub fn in_range(&self, start: usize, end: usize) -> impl Iterator<Item = &HeadingMark> {
        self.marks.iter().filter(move |m| m.offset >= start && m.offset < end)
    }
}

fn is_heading_text(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty()
        && trimmed.chars().count() <= MAX_HEADING_CHARS
        && !trimmed.ends_with('.')
        && trimmed.chars().any(|c| c.is_alphabetic())
}
