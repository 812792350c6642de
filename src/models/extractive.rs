// Extractive summarizer used when no seq2seq export is installed.
//
// Sentences are scored by centrality (similarity of their term vector to the
// whole text) and picked with maximal marginal relevance, so near-duplicate
// sentences do not crowd out the rest. The picks are returned in text order.
use anyhow::Result;

use super::{cosine_similarity, HashedBagOfWords, SummaryModel};
use crate::nlp::{split_sentences, word_count};

/// Relevance versus diversity weight for selection
const MMR_LAMBDA: f32 = 0.7;

#[derive(Debug, Clone, Default)]
pub struct ExtractiveSummarizer {
    embedder: HashedBagOfWords,
}

impl ExtractiveSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sentence indexes in text order whose words fit `max_words`; at least
    /// one sentence, and more until `min_words` when the budget allows
    pub fn select(&self, sentences: &[String], max_words: usize, min_words: usize) -> Vec<usize> {
        if sentences.is_empty() {
            return Vec::new();
        }

        let document = self.embedder.embed(&sentences.join(" "));
        let vectors: Vec<Vec<f32>> = sentences.iter().map(|s| self.embedder.embed(s)).collect();
        let relevance: Vec<f32> = vectors.iter().map(|v| cosine_similarity(v, &document)).collect();

        let mut selected: Vec<usize> = Vec::new();
        let mut words = 0;
        let mut remaining: Vec<usize> = (0..sentences.len()).collect();

        loop {
            let Some((position, &best)) = remaining.iter().enumerate().max_by(|&(_, a), &(_, b)| {
                let score_a = mmr_score(*a, &relevance, &vectors, &selected);
                let score_b = mmr_score(*b, &relevance, &vectors, &selected);
                // Earlier sentence wins ties
                score_a.total_cmp(&score_b).then(b.cmp(a))
            }) else {
                break;
            };

            let length = word_count(&sentences[best]);
            if !selected.is_empty() && words + length > max_words {
                if words >= min_words {
                    break;
                }
                remaining.remove(position);
                continue;
            }
            words += length;
            selected.push(best);
            remaining.remove(position);
            if words >= max_words {
                break;
            }
        }

        selected.sort_unstable();
        selected
    }
}

fn mmr_score(candidate: usize, relevance: &[f32], vectors: &[Vec<f32>], selected: &[usize]) -> f32 {
    let redundancy = selected
        .iter()
        .map(|&s| cosine_similarity(&vectors[candidate], &vectors[s]))
        .fold(0.0_f32, f32::max);
    MMR_LAMBDA * relevance[candidate] - (1.0 - MMR_LAMBDA) * redundancy
}

impl SummaryModel for ExtractiveSummarizer {
    fn summarize(&mut self, text: &str, max_tokens: usize, min_tokens: usize) -> Result<String> {
        let sentences = split_sentences(text);
        let picked = self.select(&sentences, max_tokens, min_tokens);
        Ok(picked
            .into_iter()
            .map(|i| sentences[i].as_str())
            .collect::<Vec<_>>()
            .join(" "))
    }

    fn name(&self) -> &str {
        "extractive"
    }
}
