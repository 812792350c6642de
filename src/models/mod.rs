// Model seams: summarization, sentence embeddings, text generation.
// ONNX Runtime backs each seam when exported models are on disk; the
// deterministic fallbacks keep the pipeline usable without them.
pub mod causal_lm;
pub mod embedder;
pub mod extractive;
pub mod seq2seq;

use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::debug;

pub use causal_lm::{ConceptRecall, OnnxGenerator};
pub use embedder::{HashedBagOfWords, OnnxEmbedder};
pub use extractive::ExtractiveSummarizer;
pub use seq2seq::OnnxSummarizer;

/// Abstractive (or extractive) summary of one chunk of text
pub trait SummaryModel: Send {
    /// `max_tokens` and `min_tokens` bound the summary length
    fn summarize(&mut self, text: &str, max_tokens: usize, min_tokens: usize) -> Result<String>;

    fn name(&self) -> &str;
}

/// Fixed-size sentence vectors for similarity ranking
pub trait SentenceEmbedder: Send {
    fn embed_batch(&mut self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    fn name(&self) -> &str;
}

/// Free text continuation of a prompt. The returned text starts with the
/// prompt.
pub trait TextGenerator: Send {
    fn generate(&mut self, prompt: &str, max_length: usize) -> Result<String>;

    /// Source text the next prompts are about
    fn set_context(&mut self, _context: &str) {}

    fn name(&self) -> &str;
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Scale a vector to unit length in place (zero vectors stay zero)
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

pub(crate) fn load_session(path: &Path, intra_threads: usize) -> Result<Session> {
    debug!("Loading ONNX model {}", path.display());
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(intra_threads)?
        .commit_from_file(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    Ok(session)
}

pub(crate) fn load_tokenizer(path: &Path) -> Result<Tokenizer> {
    Tokenizer::from_file(path)
        .map_err(|e| anyhow::anyhow!("Failed to load tokenizer {}: {}", path.display(), e))
}

/// Logits of the last position from a `[1, seq, vocab]` tensor
pub(crate) fn last_position_logits(shape: &[i64], data: &[f32]) -> Result<Vec<f32>> {
    if shape.len() != 3 || shape[1] < 1 {
        anyhow::bail!("Unexpected logits shape {:?}", shape);
    }
    let vocab = shape[2] as usize;
    let start = (shape[1] as usize - 1) * vocab;
    data.get(start..start + vocab)
        .map(<[f32]>::to_vec)
        .context("Logits tensor shorter than its shape")
}

pub(crate) fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
}
