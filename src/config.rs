// Configuration for booksum: model locations, summary lengths, storage
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::types::{BooksumError, Result};

pub const CONFIG_ENV: &str = "BOOKSUM_CONFIG";
pub const MODELS_DIR_ENV: &str = "BOOKSUM_MODELS_DIR";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub examples: ExamplesConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Where the ONNX exports live. Each model sits in its own subdirectory
/// holding the `.onnx` files and a `tokenizer.json`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelsConfig {
    #[serde(default = "default_models_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_summarizer")]
    pub summarizer: String,
    #[serde(default = "default_embedder")]
    pub embedder: String,
    #[serde(default = "default_generator")]
    pub generator: String,
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SummaryConfig {
    #[serde(default = "default_topic_max_length")]
    pub topic_max_length: usize,
    #[serde(default = "default_topic_min_length")]
    pub topic_min_length: usize,
    #[serde(default = "default_chapter_max_length")]
    pub chapter_max_length: usize,
    #[serde(default = "default_chapter_min_length")]
    pub chapter_min_length: usize,
    #[serde(default = "default_max_topic_sentences")]
    pub max_topic_sentences: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExamplesConfig {
    #[serde(default = "default_num_examples")]
    pub per_topic: usize,
    #[serde(default = "default_generation_max_length")]
    pub max_length: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database: PathBuf,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            dir: default_models_dir(),
            summarizer: default_summarizer(),
            embedder: default_embedder(),
            generator: default_generator(),
            intra_threads: default_intra_threads(),
        }
    }
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            topic_max_length: default_topic_max_length(),
            topic_min_length: default_topic_min_length(),
            chapter_max_length: default_chapter_max_length(),
            chapter_min_length: default_chapter_min_length(),
            max_topic_sentences: default_max_topic_sentences(),
        }
    }
}

impl Default for ExamplesConfig {
    fn default() -> Self {
        Self {
            per_topic: default_num_examples(),
            max_length: default_generation_max_length(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { database: default_database_path() }
    }
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_summarizer() -> String {
    "bart-large-cnn".to_string()
}

fn default_embedder() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_generator() -> String {
    "gpt2".to_string()
}

fn default_intra_threads() -> usize {
    4
}

fn default_topic_max_length() -> usize {
    150
}

fn default_topic_min_length() -> usize {
    30
}

fn default_chapter_max_length() -> usize {
    300
}

fn default_chapter_min_length() -> usize {
    50
}

fn default_max_topic_sentences() -> usize {
    5
}

fn default_num_examples() -> usize {
    2
}

fn default_generation_max_length() -> usize {
    150
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.9
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("booksum").join("digests.db"))
        .unwrap_or_else(|| PathBuf::from("booksum.db"))
}

impl Config {
    /// Resolve configuration: explicit path, then `$BOOKSUM_CONFIG`, then the
    /// per-user config file if it exists, then defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let candidate = explicit
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match candidate {
            Some(path) => Self::from_file(&path)?,
            None => match user_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        if let Some(dir) = env::var_os(MODELS_DIR_ENV) {
            config.models.dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
            .map_err(|e| BooksumError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn summarizer_dir(&self) -> PathBuf {
        self.models.dir.join(&self.models.summarizer)
    }

    pub fn embedder_dir(&self) -> PathBuf {
        self.models.dir.join(&self.models.embedder)
    }

    pub fn generator_dir(&self) -> PathBuf {
        self.models.dir.join(&self.models.generator)
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("booksum").join("config.toml"))
}
