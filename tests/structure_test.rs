// Chapter and topic detection on generated PDFs
mod common;

use booksum::pdf_extraction::PdfExtractor;
use booksum::structure::{ChapterSource, DocumentStructure, TextAnalyzer};
use common::{build_pdf, font_size_book, keyword_book, outlined_book, plain_book, BookSpec};
use rstest::rstest;

fn analyze(book: BookSpec) -> DocumentStructure {
    let document = PdfExtractor::extract_bytes(&build_pdf(&book)).unwrap();
    TextAnalyzer::new().analyze(&document)
}

#[rstest]
#[case::outline(outlined_book(), ChapterSource::TableOfContents, &["Forces", "Energy"])]
#[case::keyword(keyword_book(), ChapterSource::ChapterKeyword, &["Atoms", "Bonds"])]
#[case::font_size(font_size_book(), ChapterSource::FontSize, &["Motion", "Energy"])]
#[case::whole(plain_book(), ChapterSource::WholeDocument, &["Chapter 1"])]
fn test_chapter_strategy(
    #[case] book: BookSpec,
    #[case] source: ChapterSource,
    #[case] titles: &[&str],
) {
    let structure = analyze(book);
    assert_eq!(structure.source, source);
    let found: Vec<&str> = structure.chapters.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(found, titles);
    let numbers: Vec<usize> = structure.chapters.iter().map(|c| c.number).collect();
    assert_eq!(numbers, (1..=titles.len()).collect::<Vec<_>>());
}

#[test]
fn test_outline_chapters_span_their_pages() {
    let structure = analyze(outlined_book());
    let forces = &structure.chapters[0];
    assert!(forces.text.contains("Friction slows"));
    assert!(forces.text.contains("Gravity pulls"));
    assert!(!forces.text.contains("Heat flows"));
    assert!(structure.chapters[1].text.starts_with("Energy can change form"));
}

#[test]
fn test_numbered_sections_become_topics() {
    let structure = analyze(keyword_book());
    let atoms = structure.chapter(1).unwrap();

    let titles: Vec<&str> = atoms.topics.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Electrons", "Protons"]);
    assert_eq!(atoms.topics[0].id, "1.1");
    assert_eq!(
        atoms.topics[0].paragraphs,
        vec!["1.1 Electrons", "Electrons orbit the nucleus. They carry a negative charge."]
    );
    assert!(structure.topic("1.2").unwrap().text.contains("positive charge"));
}

#[test]
fn test_smaller_headings_become_topics() {
    let structure = analyze(font_size_book());

    let motion: Vec<&str> = structure.chapters[0].topics.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(motion, vec!["Velocity", "Acceleration"]);
    let energy: Vec<&str> = structure.chapters[1].topics.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(energy, vec!["Kinetic Energy", "Potential Energy"]);

    let velocity = structure.topic("1.1").unwrap();
    assert!(velocity.text.contains("ten meters per second"));
    assert!(!velocity.text.contains("Falling objects"));
}

#[test]
fn test_unstructured_text_is_one_topic() {
    let structure = analyze(plain_book());
    let chapter = &structure.chapters[0];
    assert_eq!(chapter.topics.len(), 1);
    assert_eq!(chapter.topics[0].title, "Topic");
    assert_eq!(chapter.topics[0].paragraphs.len(), 2);
}

#[test]
fn test_marked_examples() {
    let structure = analyze(font_size_book());
    let examples = TextAnalyzer::new().extract_examples(&structure.chapters[0].text);
    assert_eq!(examples, vec!["a car heading north at ten meters per second has a velocity."]);
}
