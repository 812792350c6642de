// booksum: textbook PDF -> chapters, topics, summaries and examples
pub mod config;
pub mod example_generator;
pub mod models;
pub mod nlp;
pub mod pdf_extraction;
pub mod pipeline;
pub mod report;
pub mod storage;
pub mod structure;
pub mod summarizer;
pub mod types;

pub use config::Config;
pub use pipeline::{Pipeline, ProcessOptions, TextbookDigest};
pub use structure::{DocumentStructure, TextAnalyzer};
pub use types::{BooksumError, Result};
