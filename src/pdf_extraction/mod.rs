// PDF extraction module
pub mod content_stream;
pub mod document;
pub mod lopdf_helper;
pub mod outline;
pub mod quality;

pub use content_stream::TextLine;
pub use document::{ExtractedDocument, PageText, PdfExtractor, PAGE_SEPARATOR};
pub use outline::{PdfMetadata, TocEntry};
pub use quality::calculate_quality_score;
