// Whole-document extraction: metadata, outline and per-page text
use lopdf::{Document, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::content_stream::{assemble_page_text, extract_lines, TextLine};
use super::lopdf_helper::{get_content_data, load_pdf, load_pdf_mem};
use super::outline::{read_metadata, read_outline, PdfMetadata, TocEntry};
use super::quality::{calculate_quality_score, FALLBACK_THRESHOLD};
use crate::types::Result;

/// Separator placed between pages when the document is read as one text
pub const PAGE_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageText {
    /// 1-based page number
    pub page_num: u32,
    pub text: String,
    /// Visual lines with font sizes; empty when the text came from the
    /// fallback extractor
    pub lines: Vec<TextLine>,
    pub quality: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub metadata: PdfMetadata,
    pub toc: Vec<TocEntry>,
    pub pages: Vec<PageText>,
}

impl ExtractedDocument {
    /// All pages joined by a blank line
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(PAGE_SEPARATOR)
    }

    /// Byte offset in `full_text()` where each page starts
    pub fn page_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.pages.len());
        let mut cursor = 0;
        for (i, page) in self.pages.iter().enumerate() {
            if i > 0 {
                cursor += PAGE_SEPARATOR.len();
            }
            offsets.push(cursor);
            cursor += page.text.len();
        }
        offsets
    }

    /// Most common font size, weighted by characters
    pub fn body_font_size(&self) -> Option<f32> {
        let mut weights: HashMap<u32, usize> = HashMap::new();
        for line in self.pages.iter().flat_map(|p| p.lines.iter()) {
            // Bucket to half points
            let bucket = (line.font_size * 2.0).round() as u32;
            *weights.entry(bucket).or_insert(0) += line.text.chars().count();
        }
        weights
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(bucket, _)| bucket as f32 / 2.0)
    }

    pub fn page(&self, page_num: u32) -> Option<&PageText> {
        self.pages.iter().find(|p| p.page_num == page_num)
    }
}

/// PDF text extractor built on lopdf
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn extract_file(path: &Path) -> Result<ExtractedDocument> {
        info!("Extracting text from {}", path.display());
        let document = load_pdf(path)?;
        Ok(Self::extract_document(&document))
    }

    pub fn extract_bytes(bytes: &[u8]) -> Result<ExtractedDocument> {
        let document = load_pdf_mem(bytes)?;
        Ok(Self::extract_document(&document))
    }

    pub fn page_count(path: &Path) -> Result<usize> {
        let document = load_pdf(path)?;
        Ok(document.get_pages().len())
    }

    pub fn extract_document(document: &Document) -> ExtractedDocument {
        let start = Instant::now();
        let metadata = read_metadata(document);
        let toc = read_outline(document);

        let pages: Vec<PageText> = document
            .get_pages()
            .into_iter()
            .map(|(page_num, page_id)| extract_page(document, page_num, page_id))
            .collect();

        let empty_pages = pages.iter().filter(|p| p.text.trim().is_empty()).count();
        if empty_pages > 0 {
            warn!(
                "{} of {} pages have no extractable text (scanned or image-only?)",
                empty_pages,
                pages.len()
            );
        }

        info!(
            "Extracted {} pages, {} outline entries in {:?}",
            pages.len(),
            toc.len(),
            start.elapsed()
        );

        ExtractedDocument { metadata, toc, pages }
    }
}

fn extract_page(document: &Document, page_num: u32, page_id: ObjectId) -> PageText {
    let (lines, text) = match walk_page(document, page_id) {
        Ok(mut lines) => {
            let text = assemble_page_text(&mut lines);
            (lines, text)
        }
        Err(e) => {
            debug!("Page {}: content stream walk failed: {}", page_num, e);
            (Vec::new(), String::new())
        }
    };
    settle_page(page_num, lines, text, || document.extract_text(&[page_num]))
}

// Keep the walked text unless it scores below the fallback threshold and
// lopdf's own extractor does better. Lines only describe the walked text.
fn settle_page<E: fmt::Display>(
    page_num: u32,
    mut lines: Vec<TextLine>,
    mut text: String,
    fallback: impl FnOnce() -> std::result::Result<String, E>,
) -> PageText {
    let mut quality = calculate_quality_score(&text);

    if quality < FALLBACK_THRESHOLD {
        match fallback() {
            Ok(fallback) => {
                let fallback = fallback.trim().to_string();
                let fallback_quality = calculate_quality_score(&fallback);
                if fallback_quality > quality {
                    debug!(
                        "Page {}: lopdf extractor scored {:.2} over {:.2}",
                        page_num, fallback_quality, quality
                    );
                    text = fallback;
                    quality = fallback_quality;
                    lines.clear();
                }
            }
            Err(e) => warn!("Page {}: lopdf extract_text failed: {}", page_num, e),
        }
    }

    PageText { page_num, text, lines, quality }
}

fn walk_page(document: &Document, page_id: ObjectId) -> Result<Vec<TextLine>> {
    let page = document.get_object(page_id)?.as_dict()?;
    let Ok(contents) = page.get(b"Contents") else {
        return Ok(Vec::new());
    };
    let data = get_content_data(document, contents)?;
    extract_lines(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str, size: f32) -> TextLine {
        TextLine { text: text.to_string(), font_size: size, y: 0.0, offset: 0 }
    }

    fn page(num: u32, text: &str, lines: Vec<TextLine>) -> PageText {
        PageText { page_num: num, text: text.to_string(), lines, quality: 1.0 }
    }

    #[test]
    fn test_good_walk_skips_fallback() {
        let text = "Velocity is the rate of change of position. It has a direction.".to_string();
        let page = settle_page(1, vec![line(&text, 11.0)], text.clone(), || -> std::result::Result<String, String> {
            panic!("fallback must not run")
        });
        assert_eq!(page.text, text);
        assert_eq!(page.lines.len(), 1);
        assert!(page.quality >= FALLBACK_THRESHOLD);
    }

    #[test]
    fn test_better_fallback_replaces_walk() {
        let garbled = "\u{1}\u{2}\u{3}".to_string();
        let page = settle_page(2, vec![line(&garbled, 11.0)], garbled, || {
            Ok::<_, String>("  Energy is conserved. Heat flows from hot to cold.\n".to_string())
        });
        assert_eq!(page.text, "Energy is conserved. Heat flows from hot to cold.");
        assert!(page.lines.is_empty());
        assert!(page.quality > 0.7);
    }

    #[test]
    fn test_worse_fallback_keeps_walk() {
        let page = settle_page(3, vec![line("zzz", 11.0)], "zzz".to_string(), || Ok::<_, String>(String::new()));
        assert_eq!(page.text, "zzz");
        assert_eq!(page.lines.len(), 1);

        let page = settle_page(4, vec![], String::new(), || Err("no content"));
        assert_eq!(page.text, "");
        assert_eq!(page.quality, 0.0);
    }

    #[test]
    fn test_full_text_and_offsets_agree() {
        let doc = ExtractedDocument {
            metadata: PdfMetadata::default(),
            toc: vec![],
            pages: vec![page(1, "alpha", vec![]), page(2, "beta", vec![]), page(3, "gamma", vec![])],
        };
        let full = doc.full_text();
        assert_eq!(full, "alpha\n\nbeta\n\ngamma");
        let offsets = doc.page_offsets();
        assert_eq!(offsets, vec![0, 7, 13]);
        assert!(full[offsets[1]..].starts_with("beta"));
        assert!(full[offsets[2]..].starts_with("gamma"));
    }

    #[test]
    fn test_body_font_size_is_char_weighted() {
        let doc = ExtractedDocument {
            metadata: PdfMetadata::default(),
            toc: vec![],
            pages: vec![page(
                1,
                "",
                vec![
                    line("Big Title", 24.0),
                    line("A long body line with many characters in it", 10.0),
                    line("Another body line", 10.2),
                ],
            )],
        };
        assert_eq!(doc.body_font_size(), Some(10.0));
    }

    #[test]
    fn test_body_font_size_none_without_lines() {
        let doc = ExtractedDocument {
            metadata: PdfMetadata::default(),
            toc: vec![],
            pages: vec![page(1, "text", vec![])],
        };
        assert_eq!(doc.body_font_size(), None);
    }
}
