// Plain text and JSON rendering of digests and outlines
use serde::Serialize;
use std::fmt::Write;

use crate::nlp::word_count;
use crate::pipeline::TextbookDigest;
use crate::structure::DocumentStructure;
use crate::types::Result;

const RULE_WIDTH: usize = 72;

pub fn render_text(digest: &TextbookDigest) -> String {
    let mut out = String::new();
    let title = digest
        .metadata
        .title
        .clone()
        .unwrap_or_else(|| digest.source.display().to_string());

    let _ = writeln!(out, "{}", title);
    if let Some(author) = &digest.metadata.author {
        let _ = writeln!(out, "by {}", author);
    }
    let _ = writeln!(
        out,
        "{} chapters, {} topics (chapters by {})",
        digest.chapters.len(),
        digest.topic_count(),
        digest.detected_by
    );

    for chapter in &digest.chapters {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
        let _ = writeln!(out, "Chapter {}: {}", chapter.number, chapter.title);
        let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", chapter.summary.trim());

        for topic in &chapter.topics {
            let _ = writeln!(out);
            let _ = writeln!(out, "{} {}", topic.id, topic.title);
            let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
            let _ = writeln!(out, "{}", topic.summary.trim());

            if !topic.examples.is_empty() {
                let _ = writeln!(out);
                let _ = writeln!(out, "Examples:");
                for (i, example) in topic.examples.iter().enumerate() {
                    let _ = writeln!(out, "  {}. {}", i + 1, example);
                }
            }
        }
    }
    out
}

/// Chapter and topic tree with word counts
pub fn render_outline(structure: &DocumentStructure) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} chapters, {} topics (chapters by {})",
        structure.chapters.len(),
        structure.topic_count(),
        structure.source
    );

    for chapter in &structure.chapters {
        let _ = writeln!(
            out,
            "{:>3}. {} [{} words]",
            chapter.number,
            chapter.title,
            word_count(&chapter.text)
        );
        for topic in &chapter.topics {
            let _ = writeln!(
                out,
                "     {} {} [{} words, {} paragraphs]",
                topic.id,
                topic.title,
                word_count(&topic.text),
                topic.paragraphs.len()
            );
        }
    }
    out
}

pub fn render_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
