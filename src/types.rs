// Core error type and shared constants for booksum

// Word-count thresholds below which text is returned as its own summary
pub const TOPIC_SUMMARY_MIN_WORDS: usize = 100;
pub const CHAPTER_SUMMARY_MIN_WORDS: usize = 200;

// Approximate token budget per model input chunk
pub const MAX_CHUNK_TOKENS: usize = 1024;

// Error types
#[derive(Debug, thiserror::Error)]
pub enum BooksumError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("PDF is encrypted: {0}")]
    Encrypted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BooksumError>;
