// End-to-end processing: PDF -> structure -> summaries and examples
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::example_generator::ExampleGenerator;
use crate::models::{
    ConceptRecall, ExtractiveSummarizer, HashedBagOfWords, OnnxEmbedder, OnnxGenerator,
    OnnxSummarizer, SentenceEmbedder, SummaryModel, TextGenerator,
};
use crate::pdf_extraction::{ExtractedDocument, PdfExtractor, PdfMetadata};
use crate::structure::{Chapter, ChapterSource, DocumentStructure, TextAnalyzer};
use crate::summarizer::Summarizer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicDigest {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterDigest {
    pub number: usize,
    pub title: String,
    pub summary: String,
    pub topics: Vec<TopicDigest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextbookDigest {
    pub source: PathBuf,
    pub metadata: PdfMetadata,
    pub detected_by: ChapterSource,
    pub chapters: Vec<ChapterDigest>,
}

impl TextbookDigest {
    pub fn topic_count(&self) -> usize {
        self.chapters.iter().map(|c| c.topics.len()).sum()
    }
}

#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Only digest this chapter (1-based)
    pub chapter: Option<usize>,
    pub max_topics_per_chapter: Option<usize>,
    pub num_examples: usize,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self { chapter: None, max_topics_per_chapter: None, num_examples: 2 }
    }
}

pub struct Pipeline {
    analyzer: TextAnalyzer,
    summarizer: Summarizer,
    examples: ExampleGenerator,
    config: Config,
}

impl Pipeline {
    pub fn new(summarizer: Summarizer, examples: ExampleGenerator, config: Config) -> Self {
        Self { analyzer: TextAnalyzer::new(), summarizer, examples, config }
    }

    /// Pipeline on the built-in models only
    pub fn with_fallbacks(config: Config) -> Self {
        let summarizer = Summarizer::with_fallbacks(config.summary.clone());
        let examples = ExampleGenerator::with_fallback(config.examples.clone());
        Self::new(summarizer, examples, config)
    }

    /// ONNX models where their files are installed, built-in models elsewhere
    pub fn from_config(config: &Config) -> Self {
        let threads = config.models.intra_threads;

        let summary_model = load_or_fallback::<dyn SummaryModel>(
            "summarizer",
            &config.summarizer_dir(),
            OnnxSummarizer::available,
            |dir| Ok(Box::new(OnnxSummarizer::load(dir, threads)?) as Box<dyn SummaryModel>),
            || Box::new(ExtractiveSummarizer::new()) as Box<dyn SummaryModel>,
        );
        let embedder = load_or_fallback::<dyn SentenceEmbedder>(
            "embedder",
            &config.embedder_dir(),
            OnnxEmbedder::available,
            |dir| Ok(Box::new(OnnxEmbedder::load(dir, threads)?) as Box<dyn SentenceEmbedder>),
            || Box::new(HashedBagOfWords::new()) as Box<dyn SentenceEmbedder>,
        );
        let examples = &config.examples;
        let generator = load_or_fallback::<dyn TextGenerator>(
            "generator",
            &config.generator_dir(),
            OnnxGenerator::available,
            |dir| {
                let model = OnnxGenerator::load(dir, threads, examples.temperature, examples.top_p)?;
                Ok(Box::new(model) as Box<dyn TextGenerator>)
            },
            || Box::new(ConceptRecall::new()) as Box<dyn TextGenerator>,
        );

        let summarizer = Summarizer::new(summary_model, embedder, config.summary.clone());
        let examples = ExampleGenerator::new(generator, config.examples.clone());
        Self::new(summarizer, examples, config.clone())
    }

    pub fn model_names(&self) -> (String, String) {
        (self.summarizer.model_name().to_string(), self.examples.generator_name().to_string())
    }

    pub async fn process(&mut self, path: &Path, options: &ProcessOptions) -> Result<TextbookDigest> {
        let owned = path.to_path_buf();
        let document = tokio::task::spawn_blocking(move || PdfExtractor::extract_file(&owned))
            .await
            .context("Extraction task panicked")?
            .with_context(|| format!("Failed to extract {}", path.display()))?;

        let mut digest = self.digest_document(&document, options)?;
        digest.source = path.to_path_buf();
        Ok(digest)
    }

    /// Digest of an already extracted document
    pub fn digest_document(
        &mut self,
        document: &ExtractedDocument,
        options: &ProcessOptions,
    ) -> Result<TextbookDigest> {
        let structure = self.analyzer.analyze(document);
        info!(
            "Found {} chapters and {} topics ({})",
            structure.chapters.len(),
            structure.topic_count(),
            structure.source
        );

        let chapters = self.digest_structure(&structure, options)?;
        Ok(TextbookDigest {
            source: PathBuf::new(),
            metadata: document.metadata.clone(),
            detected_by: structure.source,
            chapters,
        })
    }

    pub fn digest_structure(
        &mut self,
        structure: &DocumentStructure,
        options: &ProcessOptions,
    ) -> Result<Vec<ChapterDigest>> {
        let selected: Vec<&Chapter> = match options.chapter {
            Some(number) => {
                let chapter = structure.chapter(number).with_context(|| {
                    format!("Chapter {} not found ({} chapters detected)", number, structure.chapters.len())
                })?;
                vec![chapter]
            }
            None => structure.chapters.iter().collect(),
        };

        let mut digests = Vec::with_capacity(selected.len());
        for chapter in selected {
            digests.push(self.digest_chapter(chapter, options));
        }
        Ok(digests)
    }

    fn digest_chapter(&mut self, chapter: &Chapter, options: &ProcessOptions) -> ChapterDigest {
        let start = Instant::now();
        info!("Processing chapter {}: {}", chapter.number, chapter.title);

        let summary = self
            .summarizer
            .summarize_chapter(&chapter.text, self.config.summary.chapter_max_length);

        let limit = options.max_topics_per_chapter.unwrap_or(usize::MAX);
        if chapter.topics.len() > limit {
            warn!(
                "Chapter {} has {} topics, processing the first {}",
                chapter.number,
                chapter.topics.len(),
                limit
            );
        }

        let mut topics = Vec::new();
        for topic in chapter.topics.iter().take(limit) {
            debug!("Topic {}: {}", topic.id, topic.title);
            let topic_summary = self
                .summarizer
                .summarize_topic(&topic.text, self.config.summary.topic_max_length);
            let examples = self.examples.generate_examples(&topic.text, options.num_examples);
            topics.push(TopicDigest {
                id: topic.id.clone(),
                title: topic.title.clone(),
                summary: topic_summary,
                examples,
            });
        }

        debug!("Chapter {} done in {:?}", chapter.number, start.elapsed());
        ChapterDigest { number: chapter.number, title: chapter.title.clone(), summary, topics }
    }
}

fn load_or_fallback<T: ?Sized>(
    role: &str,
    dir: &Path,
    available: fn(&Path) -> bool,
    load: impl FnOnce(&Path) -> Result<Box<T>>,
    fallback: impl FnOnce() -> Box<T>,
) -> Box<T> {
    if !available(dir) {
        warn!("No {} model at {}, using built-in fallback", role, dir.display());
        return fallback();
    }
    match load(dir) {
        Ok(model) => model,
        Err(e) => {
            warn!("Failed to load {} from {}: {:#}, using built-in fallback", role, dir.display(), e);
            fallback()
        }
    }
}
