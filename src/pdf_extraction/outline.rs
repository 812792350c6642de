// Document metadata and outline (bookmark) reading
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::lopdf_helper::{get_dict, get_text, resolve};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub page_count: usize,
}

/// One bookmark: nesting level (1 = top), title and 1-based page number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub level: u32,
    pub title: String,
    pub page: u32,
}

pub fn read_metadata(document: &Document) -> PdfMetadata {
    let mut metadata = PdfMetadata {
        page_count: document.get_pages().len(),
        ..Default::default()
    };

    let info = document
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| resolve(document, obj).as_dict().ok());

    if let Some(info) = info {
        metadata.title = get_text(document, info, b"Title");
        metadata.author = get_text(document, info, b"Author");
        metadata.subject = get_text(document, info, b"Subject");
        metadata.keywords = get_text(document, info, b"Keywords");
    }

    metadata
}

fn catalog(document: &Document) -> Option<&Dictionary> {
    let root = document.trailer.get(b"Root").ok()?;
    resolve(document, root).as_dict().ok()
}

/// Flatten the outline tree depth-first
pub fn read_outline(document: &Document) -> Vec<TocEntry> {
    let mut entries = Vec::new();

    let Some(outlines) = catalog(document).and_then(|c| get_dict(document, c, b"Outlines")) else {
        return entries;
    };
    let Ok(first) = outlines.get(b"First").and_then(Object::as_reference) else {
        return entries;
    };

    let page_lookup: HashMap<ObjectId, u32> = document
        .get_pages()
        .into_iter()
        .map(|(num, id)| (id, num))
        .collect();
    let mut visited = HashSet::new();

    walk_outline(document, first, 1, &page_lookup, &mut visited, &mut entries);
    entries
}

fn walk_outline(
    document: &Document,
    first: ObjectId,
    level: u32,
    page_lookup: &HashMap<ObjectId, u32>,
    visited: &mut HashSet<ObjectId>,
    entries: &mut Vec<TocEntry>,
) {
    let mut current = Some(first);

    while let Some(id) = current {
        if !visited.insert(id) {
            break;
        }
        let Ok(item) = document.get_object(id).and_then(Object::as_dict) else {
            break;
        };

        let title = get_text(document, item, b"Title").unwrap_or_default();
        if let Some(page) = destination_page(document, item, page_lookup) {
            entries.push(TocEntry { level, title, page });
        }

        if let Ok(child) = item.get(b"First").and_then(Object::as_reference) {
            walk_outline(document, child, level + 1, page_lookup, visited, entries);
        }

        current = item.get(b"Next").and_then(Object::as_reference).ok();
    }
}

// Explicit destinations only: [pageRef /XYZ ...] in /Dest or a GoTo action's /D
fn destination_page(
    document: &Document,
    item: &Dictionary,
    page_lookup: &HashMap<ObjectId, u32>,
) -> Option<u32> {
    let destination = match item.get(b"Dest") {
        Ok(dest) => resolve(document, dest),
        Err(_) => {
            let action = get_dict(document, item, b"A")?;
            resolve(document, action.get(b"D").ok()?)
        }
    };

    let target = match destination {
        Object::Array(parts) => parts.first()?,
        Object::Dictionary(dict) => match dict.get(b"D").ok()? {
            Object::Array(parts) => parts.first()?,
            _ => return None,
        },
        _ => return None,
    };

    match target {
        Object::Reference(page_id) => page_lookup.get(page_id).copied(),
        _ => None,
    }
}
