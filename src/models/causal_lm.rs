// Causal language model generation (GPT-2 style ONNX export) with nucleus
// sampling, plus a retrieval fallback that quotes the topic text back
use anyhow::{Context, Result};
use ort::{inputs, session::Session, value::Value};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::{last_position_logits, load_session, load_tokenizer, TextGenerator};
use crate::nlp::split_sentences;

const MODEL_FILE: &str = "model.onnx";

#[derive(Debug, Clone, Deserialize)]
struct LmConfig {
    #[serde(default = "default_eos")]
    eos_token_id: u32,
    #[serde(default = "default_positions")]
    n_positions: usize,
}

fn default_eos() -> u32 {
    50256
}
fn default_positions() -> usize {
    1024
}

impl Default for LmConfig {
    fn default() -> Self {
        Self { eos_token_id: default_eos(), n_positions: default_positions() }
    }
}

pub struct OnnxGenerator {
    session: Session,
    tokenizer: Tokenizer,
    config: LmConfig,
    temperature: f32,
    top_p: f32,
    uses_attention_mask: bool,
    uses_position_ids: bool,
    rng: StdRng,
    name: String,
}

impl OnnxGenerator {
    pub fn available(dir: &Path) -> bool {
        dir.join(MODEL_FILE).exists() && dir.join("tokenizer.json").exists()
    }

    pub fn load(dir: &Path, intra_threads: usize, temperature: f32, top_p: f32) -> Result<Self> {
        let _ = ort::init();

        let session = load_session(&dir.join(MODEL_FILE), intra_threads)?;
        let tokenizer = load_tokenizer(&dir.join("tokenizer.json"))?;
        let config_path = dir.join("config.json");
        let config = if config_path.exists() {
            let raw = fs::read_to_string(&config_path)?;
            serde_json::from_str(&raw).context("Invalid generator config.json")?
        } else {
            LmConfig::default()
        };

        let uses_attention_mask = session.inputs.iter().any(|i| i.name == "attention_mask");
        let uses_position_ids = session.inputs.iter().any(|i| i.name == "position_ids");
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "causal-lm".to_string());
        info!("Loaded generator model {}", name);

        Ok(Self {
            session,
            tokenizer,
            config,
            temperature,
            top_p,
            uses_attention_mask,
            uses_position_ids,
            rng: StdRng::from_entropy(),
            name,
        })
    }

    fn next_token_logits(&mut self, ids: &[i64]) -> Result<Vec<f32>> {
        let len = ids.len();
        let shape = [1_usize, len];
        let input_ids = Value::from_array((shape, ids.to_vec().into_boxed_slice()))?;
        let mask = Value::from_array((shape, vec![1_i64; len].into_boxed_slice()))?;
        let positions = Value::from_array((shape, (0..len as i64).collect::<Vec<_>>().into_boxed_slice()))?;

        let outputs = match (self.uses_attention_mask, self.uses_position_ids) {
            (true, true) => self.session.run(inputs![
                "input_ids" => input_ids,
                "attention_mask" => mask,
                "position_ids" => positions
            ])?,
            (true, false) => self.session.run(inputs![
                "input_ids" => input_ids,
                "attention_mask" => mask
            ])?,
            (false, true) => self.session.run(inputs![
                "input_ids" => input_ids,
                "position_ids" => positions
            ])?,
            (false, false) => self.session.run(inputs!["input_ids" => input_ids])?,
        };
        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        let logits = last_position_logits(shape, data)?;
        Ok(logits)
    }
}

impl TextGenerator for OnnxGenerator {
    fn generate(&mut self, prompt: &str, max_length: usize) -> Result<String> {
        let encoding = self
            .tokenizer
            .encode(prompt, false)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;
        let mut ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let prompt_tokens = ids.len();
        let limit = max_length.min(self.config.n_positions);

        while ids.len() < limit {
            let logits = self.next_token_logits(&ids)?;
            let next = sample_top_p(&logits, self.temperature, self.top_p, &mut self.rng)
                .context("Empty logits")?;
            if next as u32 == self.config.eos_token_id {
                break;
            }
            ids.push(next as i64);
        }
        debug!("Generated {} tokens", ids.len() - prompt_tokens);

        let tokens: Vec<u32> = ids.iter().map(|&id| id as u32).collect();
        self.tokenizer
            .decode(&tokens, true)
            .map_err(|e| anyhow::anyhow!("Decoding failed: {}", e))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Nucleus sampling: softmax at `temperature`, keep the smallest set of
/// tokens whose probability mass reaches `top_p`, draw from it
pub fn sample_top_p<R: Rng>(logits: &[f32], temperature: f32, top_p: f32, rng: &mut R) -> Option<usize> {
    if logits.is_empty() {
        return None;
    }
    let temperature = temperature.max(1e-5);
    let max_logit = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    let mut probs: Vec<(usize, f32)> = logits
        .iter()
        .enumerate()
        .map(|(i, &l)| (i, ((l - max_logit) / temperature).exp()))
        .collect();
    let total: f32 = probs.iter().map(|(_, p)| p).sum();
    if !(total > 0.0) {
        return Some(0);
    }
    probs.sort_unstable_by(|a, b| b.1.total_cmp(&a.1));

    let mut nucleus = Vec::new();
    let mut mass = 0.0;
    for (index, p) in probs {
        let p = p / total;
        nucleus.push((index, p));
        mass += p;
        if mass >= top_p {
            break;
        }
    }

    let mut draw = rng.gen::<f32>() * mass;
    for &(index, p) in &nucleus {
        if draw < p {
            return Some(index);
        }
        draw -= p;
    }
    nucleus.last().map(|(index, _)| *index)
}

/// Answers "Example of X: " prompts with sentences from the topic text that
/// mention X, rotating through them on repeated calls
#[derive(Debug, Default)]
pub struct ConceptRecall {
    sentences: Vec<String>,
    calls: usize,
}

impl ConceptRecall {
    pub fn new() -> Self {
        Self::default()
    }
}

const SENTENCES_PER_EXAMPLE: usize = 2;

impl TextGenerator for ConceptRecall {
    fn set_context(&mut self, context: &str) {
        self.sentences = split_sentences(context);
        self.calls = 0;
    }

    fn generate(&mut self, prompt: &str, max_length: usize) -> Result<String> {
        if self.sentences.is_empty() {
            anyhow::bail!("No topic text to draw examples from");
        }

        let concept = prompt
            .strip_prefix("Example of ")
            .and_then(|rest| rest.trim_end().strip_suffix(':'))
            .map(|c| c.trim().to_lowercase());
        let mut pool: Vec<&String> = match &concept {
            Some(c) => self.sentences.iter().filter(|s| s.to_lowercase().contains(c.as_str())).collect(),
            None => Vec::new(),
        };
        if pool.is_empty() {
            pool = self.sentences.iter().collect();
        }

        let start = self.calls % pool.len();
        self.calls += 1;

        let mut words = 0;
        let mut picked = Vec::new();
        for sentence in pool.iter().skip(start).take(SENTENCES_PER_EXAMPLE) {
            let length = sentence.split_whitespace().count();
            if !picked.is_empty() && words + length > max_length {
                break;
            }
            words += length;
            picked.push(sentence.as_str());
        }

        Ok(format!("{}{}", prompt, picked.join(" ")))
    }

    fn name(&self) -> &str {
        "concept-recall"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_p_restricts_to_nucleus() {
        let mut rng = StdRng::seed_from_u64(7);
        // One dominant token holds well over 90% of the mass
        let logits = vec![10.0, 0.0, 0.0, 0.0];
        for _ in 0..50 {
            assert_eq!(sample_top_p(&logits, 0.7, 0.9, &mut rng), Some(0));
        }
        assert_eq!(sample_top_p(&[], 0.7, 0.9, &mut rng), None);
    }

    #[test]
    fn test_top_p_samples_within_flat_distribution() {
        let mut rng = StdRng::seed_from_u64(1);
        let logits = vec![1.0, 1.0, 1.0];
        for _ in 0..20 {
            let token = sample_top_p(&logits, 1.0, 0.9, &mut rng).unwrap();
            assert!(token < 3);
        }
    }

    #[test]
    fn test_concept_recall_quotes_matching_sentences() {
        let mut recall = ConceptRecall::new();
        recall.set_context(
            "Friction opposes motion. A sled slows on snow because of friction. Gravity pulls down.",
        );
        let first = recall.generate("Example of Friction: ", 150).unwrap();
        assert_eq!(
            first,
            "Example of Friction: Friction opposes motion. A sled slows on snow because of friction."
        );
        let second = recall.generate("Example of Friction: ", 150).unwrap();
        assert_eq!(second, "Example of Friction: A sled slows on snow because of friction.");
    }

    #[test]
    fn test_concept_recall_without_context_fails() {
        let mut recall = ConceptRecall::new();
        assert!(recall.generate("Example of Energy: ", 50).is_err());
    }
}
