// Topic and chapter summaries over a pluggable summary model
use anyhow::Result;
use tracing::{debug, warn};

use crate::config::SummaryConfig;
use crate::models::{
    cosine_similarity, ExtractiveSummarizer, HashedBagOfWords, SentenceEmbedder, SummaryModel,
};
use crate::nlp::{leading_sentences, split_sentences, word_count};
use crate::types::{CHAPTER_SUMMARY_MIN_WORDS, MAX_CHUNK_TOKENS, TOPIC_SUMMARY_MIN_WORDS};

// Per-sentence allowance for tokenizer overhead when sizing chunks
const SENTENCE_TOKEN_OVERHEAD: usize = 5;
// Sentences kept when the model fails on a chunk
const TOPIC_FALLBACK_SENTENCES: usize = 3;
const CHAPTER_FALLBACK_SENTENCES: usize = 5;
// Chapter summaries at or above this many sentences become two paragraphs
const CHAPTER_PARAGRAPH_SPLIT: usize = 6;

pub struct Summarizer {
    model: Box<dyn SummaryModel>,
    embedder: Box<dyn SentenceEmbedder>,
    config: SummaryConfig,
}

impl Summarizer {
    pub fn new(
        model: Box<dyn SummaryModel>,
        embedder: Box<dyn SentenceEmbedder>,
        config: SummaryConfig,
    ) -> Self {
        Self { model, embedder, config }
    }

    /// Summarizer backed only by the built-in fallback models
    pub fn with_fallbacks(config: SummaryConfig) -> Self {
        Self::new(Box::new(ExtractiveSummarizer::new()), Box::new(HashedBagOfWords::new()), config)
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Short texts come back as-is; longer ones are chunked, summarized and
    /// reduced to the most representative sentences
    pub fn summarize_topic(&mut self, text: &str, max_length: usize) -> String {
        if word_count(text) < TOPIC_SUMMARY_MIN_WORDS {
            return text.to_string();
        }

        let min_length = self.config.topic_min_length;
        let chunks = split_into_chunks(text, MAX_CHUNK_TOKENS);
        let mut summaries = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            summaries.push(self.summarize_chunk(chunk, max_length, min_length, TOPIC_FALLBACK_SENTENCES, i));
        }

        let summary = summaries.join(" ");
        let sentences = split_sentences(&summary);
        let limit = self.config.max_topic_sentences;
        if sentences.len() > limit {
            return self.select_important_sentences(&sentences, text, limit).join(" ");
        }
        summary
    }

    /// Short chapters come back as-is; the summary length budget is shared
    /// across chunks, and long results are split into two paragraphs
    pub fn summarize_chapter(&mut self, text: &str, max_length: usize) -> String {
        if word_count(text) < CHAPTER_SUMMARY_MIN_WORDS {
            return text.to_string();
        }

        let min_length = self.config.chapter_min_length;
        let chunks = split_into_chunks(text, MAX_CHUNK_TOKENS);
        let per_chunk = (max_length / chunks.len().max(1)).max(min_length);
        debug!("Chapter: {} chunks, {} tokens each", chunks.len(), per_chunk);

        let mut summaries = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            summaries.push(self.summarize_chunk(chunk, per_chunk, min_length, CHAPTER_FALLBACK_SENTENCES, i));
        }

        let summary = summaries.join(" ");
        let sentences = split_sentences(&summary);
        if sentences.len() >= CHAPTER_PARAGRAPH_SPLIT {
            let middle = sentences.len() / 2;
            return format!("{}\n\n{}", sentences[..middle].join(" "), sentences[middle..].join(" "));
        }
        summary
    }

    fn summarize_chunk(
        &mut self,
        chunk: &str,
        max_length: usize,
        min_length: usize,
        fallback_sentences: usize,
        index: usize,
    ) -> String {
        match self.model.summarize(chunk, max_length, min_length) {
            Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            Ok(_) => {
                warn!("Chunk {}: {} returned an empty summary", index, self.model.name());
                leading_sentences(chunk, fallback_sentences)
            }
            Err(e) => {
                warn!("Chunk {}: summarization failed ({}), keeping leading sentences", index, e);
                leading_sentences(chunk, fallback_sentences)
            }
        }
    }

    /// The `n` sentences closest to `original`, in their original order
    pub fn select_important_sentences(&mut self, sentences: &[String], original: &str, n: usize) -> Vec<String> {
        if sentences.len() <= n {
            return sentences.to_vec();
        }

        match self.rank_by_similarity(sentences, original) {
            Ok(scores) => {
                let mut ranked: Vec<usize> = (0..sentences.len()).collect();
                ranked.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
                let mut keep: Vec<usize> = ranked.into_iter().take(n).collect();
                keep.sort_unstable();
                keep.into_iter().map(|i| sentences[i].clone()).collect()
            }
            Err(e) => {
                warn!("Sentence ranking failed ({}), keeping the first {}", e, n);
                sentences[..n].to_vec()
            }
        }
    }

    fn rank_by_similarity(&mut self, sentences: &[String], original: &str) -> Result<Vec<f32>> {
        let mut texts: Vec<&str> = Vec::with_capacity(sentences.len() + 1);
        texts.push(original);
        texts.extend(sentences.iter().map(String::as_str));

        let vectors = self.embedder.embed_batch(&texts)?;
        let Some((reference, rest)) = vectors.split_first() else {
            anyhow::bail!("Embedder returned no vectors");
        };
        if rest.len() != sentences.len() {
            anyhow::bail!("Embedder returned {} vectors for {} sentences", rest.len(), sentences.len());
        }
        Ok(rest.iter().map(|v| cosine_similarity(v, reference)).collect())
    }
}

/// Group sentences into chunks of at most `max_chunk_size` approximate
/// tokens (words plus a fixed per-sentence overhead). A sentence larger than
/// the limit becomes a chunk of its own.
pub fn split_into_chunks(text: &str, max_chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_size = 0;

    for sentence in split_sentences(text) {
        let size = word_count(&sentence) + SENTENCE_TOKEN_OVERHEAD;
        if current_size + size > max_chunk_size && !current.is_empty() {
            chunks.push(current.join(" "));
            current.clear();
            current_size = 0;
        }
        current.push(sentence);
        current_size += size;
    }
    if !current.is_empty() {
        chunks.push(current.join(" "));
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Returns a fixed reply, or fails; records requested lengths
    struct Scripted {
        reply: Option<String>,
        calls: Arc<Mutex<Vec<(usize, usize)>>>,
    }

    impl SummaryModel for Scripted {
        fn summarize(&mut self, _text: &str, max_tokens: usize, min_tokens: usize) -> Result<String> {
            self.calls.lock().unwrap().push((max_tokens, min_tokens));
            self.reply.clone().ok_or_else(|| anyhow::anyhow!("model unavailable"))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn scripted_with_calls(reply: Option<&str>) -> (Summarizer, Arc<Mutex<Vec<(usize, usize)>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let model = Scripted { reply: reply.map(String::from), calls: Arc::clone(&calls) };
        let summarizer = Summarizer::new(
            Box::new(model),
            Box::new(HashedBagOfWords::new()),
            SummaryConfig::default(),
        );
        (summarizer, calls)
    }

    fn scripted(reply: Option<&str>) -> Summarizer {
        scripted_with_calls(reply).0
    }

    fn words(n: usize) -> String {
        // Ten-word sentences
        (0..n / 10)
            .map(|i| format!("Sentence number {} talks about energy and work in physics.", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_short_text_is_returned_unchanged() {
        let mut summarizer = scripted(Some("ignored"));
        let text = "Momentum is mass times velocity.";
        assert_eq!(summarizer.summarize_topic(text, 150), text);
        assert_eq!(summarizer.summarize_chapter(text, 300), text);
    }

    #[test]
    fn test_topic_failure_falls_back_to_leading_sentences() {
        let mut summarizer = scripted(None);
        let text = words(120);
        let summary = summarizer.summarize_topic(&text, 150);
        assert_eq!(split_sentences(&summary).len(), 3);
        assert!(summary.starts_with("Sentence number 0 "));
    }

    #[test]
    fn test_topic_summary_capped_at_five_sentences() {
        let reply = "Energy is conserved. Work moves energy. Heat is energy. Power is a rate. \
                     Force does work. Cats are mammals. Energy and work are related.";
        let mut summarizer = scripted(Some(reply));
        let text = format!("{} Energy work heat power force.", words(150));
        let summary = summarizer.summarize_topic(&text, 150);
        let sentences = split_sentences(&summary);
        assert_eq!(sentences.len(), 5);
        assert!(!summary.contains("Cats"));
        // Original order preserved
        let positions: Vec<_> = sentences.iter().map(|s| reply.find(s.as_str()).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_chapter_budget_split_across_chunks() {
        let (mut summarizer, calls) = scripted_with_calls(Some("One. Two. Three."));
        // 210 ten-word sentences at 15 tokens each: 68 per chunk, 4 chunks
        let text = words(2100);
        assert_eq!(split_into_chunks(&text, MAX_CHUNK_TOKENS).len(), 4);

        summarizer.summarize_chapter(&text, 300);
        assert_eq!(*calls.lock().unwrap(), vec![(75, 50); 4]);
    }

    #[test]
    fn test_topic_chunks_use_topic_lengths() {
        let (mut summarizer, calls) = scripted_with_calls(Some("Short."));
        summarizer.summarize_topic(&words(120), 150);
        assert_eq!(*calls.lock().unwrap(), vec![(150, 30)]);
    }

    #[test]
    fn test_chapter_summary_two_paragraphs() {
        let mut summarizer = scripted(Some("A one. B two. C three. D four. E five. F six."));
        let text = words(250);
        let summary = summarizer.summarize_chapter(&text, 300);
        assert_eq!(summary, "A one. B two. C three.\n\nD four. E five. F six.");
    }

    #[test]
    fn test_chapter_per_chunk_length_has_floor() {
        let (mut summarizer, calls) = scripted_with_calls(Some("Short."));
        summarizer.summarize_chapter(&words(2100), 120);
        // 120 / 4 = 30, raised to the minimum length
        assert!(calls.lock().unwrap().iter().all(|&(max, min)| max == 50 && min == 50));
    }

    #[test]
    fn test_split_into_chunks_limits() {
        let text = "One two three. Four five six. Seven eight nine.";
        // Each sentence costs 3 + 5 = 8
        assert_eq!(split_into_chunks(text, 16), vec!["One two three. Four five six.", "Seven eight nine."]);
        // Oversize sentence stands alone
        assert_eq!(split_into_chunks(text, 4).len(), 3);
        assert!(split_into_chunks("", 16).is_empty());
    }

    #[test]
    fn test_select_important_keeps_order() {
        let mut summarizer = Summarizer::with_fallbacks(SummaryConfig::default());
        let sentences: Vec<String> = vec![
            "Gravity pulls masses together.".into(),
            "Bananas are yellow.".into(),
            "Gravity keeps planets in orbit around massive stars.".into(),
        ];
        let picked = summarizer.select_important_sentences(
            &sentences,
            "Gravity pulls masses and keeps planets in orbit.",
            2,
        );
        assert_eq!(picked, vec![sentences[0].clone(), sentences[2].clone()]);
    }
}
