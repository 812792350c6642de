// Chapter boundary strategies. Each returns byte spans into the full text,
// empty when the strategy finds nothing.
use once_cell::sync::Lazy;
use regex::Regex;

use super::headings::HeadingIndex;
use crate::pdf_extraction::ExtractedDocument;

static CHAPTER_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bchapter\s+\d+[\s:]+([^\n]+)").expect("valid regex"));
static NUMBERED_CHAPTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\d+\.\s+([^\n]+)").expect("valid regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct ChapterSpan {
    pub title: String,
    pub start: usize,
    pub end: usize,
}

/// Top-level bookmarks (or bookmarks named "chapter") mapped onto page ranges
pub fn from_toc(document: &ExtractedDocument, full_text: &str) -> Vec<ChapterSpan> {
    if document.pages.is_empty() {
        return Vec::new();
    }
    let entries: Vec<_> = document
        .toc
        .iter()
        .filter(|e| e.level == 1 || e.title.to_lowercase().contains("chapter"))
        .collect();
    if entries.is_empty() {
        return Vec::new();
    }

    let offsets = document.page_offsets();
    let last_index = document.pages.len() - 1;
    // First page at or after the bookmark's page
    let index_of = |page: u32| {
        document
            .pages
            .iter()
            .position(|p| p.page_num >= page)
            .unwrap_or(last_index)
    };

    let mut spans = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let first = index_of(entry.page);
        let last = match entries.get(i + 1) {
            Some(next) => index_of(next.page).saturating_sub(1).max(first),
            None => last_index,
        };
        let start = offsets[first];
        let end = (offsets[last] + document.pages[last].text.len()).min(full_text.len());
        spans.push(ChapterSpan { title: entry.title.trim().to_string(), start, end });
    }
    spans
}

/// "Chapter N: Title" markers anywhere in the text
pub fn from_keyword(full_text: &str) -> Vec<ChapterSpan> {
    spans_from_regex(&CHAPTER_KEYWORD, full_text)
}

/// Lines such as "3. Energy" at the start of a line
pub fn from_numbered(full_text: &str) -> Vec<ChapterSpan> {
    spans_from_regex(&NUMBERED_CHAPTER, full_text)
}

/// Largest heading tier, when the document has at least two tiers and the
/// top one repeats
pub fn from_font_size(headings: &HeadingIndex, full_text: &str) -> Vec<ChapterSpan> {
    if headings.tier_count() < 2 {
        return Vec::new();
    }
    let top: Vec<_> = headings.in_tier(0).collect();
    if top.len() < 2 {
        return Vec::new();
    }

    top.iter()
        .enumerate()
        .map(|(i, mark)| ChapterSpan {
            title: mark.text.trim().to_string(),
            start: mark.offset,
            end: top.get(i + 1).map(|m| m.offset).unwrap_or(full_text.len()),
        })
        .collect()
}

pub fn whole_document(full_text: &str) -> Vec<ChapterSpan> {
    vec![ChapterSpan { title: "Chapter 1".to_string(), start: 0, end: full_text.len() }]
}

fn spans_from_regex(pattern: &Regex, text: &str) -> Vec<ChapterSpan> {
    let matches: Vec<(usize, String)> = pattern
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let title = caps.get(1)?.as_str().trim().to_string();
            Some((whole.start(), title))
        })
        .collect();

    matches
        .iter()
        .enumerate()
        .map(|(i, (start, title))| ChapterSpan {
            title: title.clone(),
            start: *start,
            end: matches.get(i + 1).map(|m| m.0).unwrap_or(text.len()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf_extraction::{PageText, PdfMetadata, TocEntry};

    fn page(num: u32, text: &str) -> PageText {
        PageText { page_num: num, text: text.to_string(), lines: vec![], quality: 1.0 }
    }

    fn toc(level: u32, title: &str, page: u32) -> TocEntry {
        TocEntry { level, title: title.to_string(), page }
    }

    #[test]
    fn test_keyword_spans() {
        let text = "Preface\n\nChapter 1: Motion\nBodies move.\n\nCHAPTER 2 Forces\nPushes.";
        let spans = from_keyword(text);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].title, "Motion");
        assert_eq!(&text[spans[0].start..spans[0].end], "Chapter 1: Motion\nBodies move.\n\n");
        assert_eq!(spans[1].title, "Forces");
        assert_eq!(spans[1].end, text.len());
    }

    #[test]
    fn test_numbered_ignores_section_numbers() {
        let text = "1. Kinematics\n1.1 Speed\nText.\n2. Dynamics\nMore.";
        let titles: Vec<_> = from_numbered(text).into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["Kinematics", "Dynamics"]);
    }

    #[test]
    fn test_toc_page_ranges() {
        let document = ExtractedDocument {
            metadata: PdfMetadata::default(),
            toc: vec![
                toc(1, "Motion", 1),
                toc(2, "Speed", 1),
                toc(1, "Energy", 3),
                toc(1, "Heat", 3),
            ],
            pages: vec![page(1, "p one"), page(2, "p two"), page(3, "p three")],
        };
        let full = document.full_text();
        let spans = from_toc(&document, &full);
        assert_eq!(spans.len(), 3);
        assert_eq!(&full[spans[0].start..spans[0].end], "p one\n\np two");
        // Two chapters on the same page: the first keeps that page
        assert_eq!(&full[spans[1].start..spans[1].end], "p three");
        assert_eq!(&full[spans[2].start..spans[2].end], "p three");
    }

    #[test]
    fn test_toc_chapter_keyword_at_any_level() {
        let document = ExtractedDocument {
            metadata: PdfMetadata::default(),
            toc: vec![toc(2, "Chapter One", 1), toc(3, "Detail", 1)],
            pages: vec![page(1, "only page")],
        };
        let spans = from_toc(&document, &document.full_text());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].title, "Chapter One");
    }

    #[test]
    fn test_whole_document() {
        let spans = whole_document("abc");
        assert_eq!(spans, vec![ChapterSpan { title: "Chapter 1".into(), start: 0, end: 3 }]);
    }
}
