// lopdf helper - Pure Rust PDF operations
use lopdf::{Dictionary, Document, Object};
use std::path::Path;

use crate::types::{BooksumError, Result};

/// Load a PDF document using lopdf
pub fn load_pdf(path: &Path) -> Result<Document> {
    ensure_readable(Document::load(path)?, &path.display().to_string())
}

/// Load a PDF document from memory
pub fn load_pdf_mem(bytes: &[u8]) -> Result<Document> {
    ensure_readable(Document::load_mem(bytes)?, "<memory>")
}

fn ensure_readable(document: Document, source: &str) -> Result<Document> {
    if document.trailer.get(b"Encrypt").is_ok() {
        return Err(BooksumError::Encrypted(source.to_string()));
    }
    Ok(document)
}

/// Follow indirect references until a direct object is reached
pub fn resolve<'a>(document: &'a Document, object: &'a Object) -> &'a Object {
    let mut current = object;
    // Bounded so a reference loop cannot spin forever
    for _ in 0..16 {
        match current {
            Object::Reference(id) => match document.get_object(*id) {
                Ok(target) => current = target,
                Err(_) => return current,
            },
            _ => return current,
        }
    }
    current
}

/// Look up a key and resolve it to a dictionary
pub fn get_dict<'a>(document: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Dictionary> {
    let object = dict.get(key).ok()?;
    resolve(document, object).as_dict().ok()
}

/// Look up a key and decode it as a text string
pub fn get_text(document: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    let object = dict.get(key).ok()?;
    match resolve(document, object) {
        Object::String(bytes, _) => {
            let text = decode_text_string(bytes);
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        _ => None,
    }
}

/// Numeric operand as f32 (PDF integers and reals are interchangeable)
pub fn as_number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f),
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE with BOM, UTF-8 with BOM or valid
/// UTF-8, otherwise single-byte
pub fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if bytes.len() >= 3 && bytes[..3] == [0xEF, 0xBB, 0xBF] {
        return String::from_utf8_lossy(&bytes[3..]).into_owned();
    }
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }
    decode_single_byte(bytes)
}

/// Decode bytes shown through a simple font (WinAnsi-style)
pub fn decode_single_byte(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| win_ansi_char(b)).collect()
}

fn win_ansi_char(byte: u8) -> char {
    match byte {
        0x85 => '…',
        0x91 => '‘',
        0x92 => '’',
        0x93 => '“',
        0x94 => '”',
        0x95 => '•',
        0x96 => '–',
        0x97 => '—',
        0xA0 => ' ',
        b => b as char,
    }
}

// Get content data from content object
pub fn get_content_data(document: &Document, contents: &Object) -> Result<Vec<u8>> {
    match contents {
        Object::Reference(r) => {
            let obj = document.get_object(*r)?;
            get_content_data(document, obj)
        }
        Object::Stream(stream) => {
            // Uncompressed streams report an error from decompressed_content
            Ok(stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone()))
        }
        Object::Array(arr) => {
            let mut data = Vec::new();
            for item in arr {
                let item_data = get_content_data(document, item)?;
                data.extend_from_slice(&item_data);
                data.push(b'\n');
            }
            Ok(data)
        }
        _ => Ok(Vec::new()),
    }
}
