// Encoder/decoder summarizer (BART-style ONNX export)
use anyhow::{Context, Result};
use ort::{inputs, session::Session, value::Value};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::{argmax, last_position_logits, load_session, load_tokenizer, SummaryModel};
use crate::types::MAX_CHUNK_TOKENS;

const ENCODER_FILE: &str = "encoder_model.onnx";
const DECODER_FILE: &str = "decoder_model.onnx";
const NO_REPEAT_NGRAM: usize = 3;

/// Special token ids from the export's `config.json`. Defaults are BART's.
#[derive(Debug, Clone, Deserialize)]
struct GenerationIds {
    #[serde(default = "default_decoder_start")]
    decoder_start_token_id: u32,
    #[serde(default = "default_eos")]
    eos_token_id: u32,
    #[serde(default)]
    forced_bos_token_id: Option<u32>,
    #[serde(default = "default_max_positions")]
    max_position_embeddings: usize,
}

fn default_decoder_start() -> u32 {
    2
}
fn default_eos() -> u32 {
    2
}
fn default_max_positions() -> usize {
    MAX_CHUNK_TOKENS
}

impl Default for GenerationIds {
    fn default() -> Self {
        Self {
            decoder_start_token_id: default_decoder_start(),
            eos_token_id: default_eos(),
            forced_bos_token_id: Some(0),
            max_position_embeddings: default_max_positions(),
        }
    }
}

pub struct OnnxSummarizer {
    encoder: Session,
    decoder: Session,
    tokenizer: Tokenizer,
    ids: GenerationIds,
    name: String,
}

impl OnnxSummarizer {
    /// Whether `dir` holds a complete export
    pub fn available(dir: &Path) -> bool {
        dir.join(ENCODER_FILE).exists()
            && dir.join(DECODER_FILE).exists()
            && dir.join("tokenizer.json").exists()
    }

    pub fn load(dir: &Path, intra_threads: usize) -> Result<Self> {
        let _ = ort::init();

        let encoder = load_session(&dir.join(ENCODER_FILE), intra_threads)?;
        let decoder = load_session(&dir.join(DECODER_FILE), intra_threads)?;
        let tokenizer = load_tokenizer(&dir.join("tokenizer.json"))?;

        let config_path = dir.join("config.json");
        let ids = if config_path.exists() {
            let raw = fs::read_to_string(&config_path)?;
            serde_json::from_str(&raw).context("Invalid summarizer config.json")?
        } else {
            GenerationIds::default()
        };

        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "seq2seq".to_string());
        info!("Loaded summarizer model {}", name);

        Ok(Self { encoder, decoder, tokenizer, ids, name })
    }

    fn encode(&self, text: &str) -> Result<Vec<i64>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;
        let mut ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();

        let limit = self.ids.max_position_embeddings.min(MAX_CHUNK_TOKENS);
        if ids.len() > limit {
            debug!("Truncating summarizer input from {} to {} tokens", ids.len(), limit);
            ids.truncate(limit);
            if let Some(last) = ids.last_mut() {
                *last = self.ids.eos_token_id as i64;
            }
        }
        Ok(ids)
    }
}

impl SummaryModel for OnnxSummarizer {
    fn summarize(&mut self, text: &str, max_tokens: usize, min_tokens: usize) -> Result<String> {
        let input_ids = self.encode(text)?;
        let seq_len = input_ids.len();
        let attention_mask = vec![1_i64; seq_len];

        let encoder_outputs = self.encoder.run(inputs![
            "input_ids" => Value::from_array(([1_usize, seq_len], input_ids.into_boxed_slice()))?,
            "attention_mask" => Value::from_array(([1_usize, seq_len], attention_mask.clone().into_boxed_slice()))?
        ])?;
        let (hidden_shape, hidden_data) = encoder_outputs[0].try_extract_tensor::<f32>()?;
        let hidden_shape = hidden_shape.clone();
        let hidden_data = hidden_data.to_vec();
        drop(encoder_outputs);

        let eos = self.ids.eos_token_id as usize;
        let mut decoder_ids: Vec<i64> = vec![self.ids.decoder_start_token_id as i64];
        let mut generated: Vec<u32> = Vec::new();

        for step in 0..max_tokens {
            let outputs = self.decoder.run(inputs![
                "input_ids" => Value::from_array(([1_usize, decoder_ids.len()], decoder_ids.clone().into_boxed_slice()))?,
                "encoder_hidden_states" => Value::from_array((hidden_shape.clone(), hidden_data.clone().into_boxed_slice()))?,
                "encoder_attention_mask" => Value::from_array(([1_usize, seq_len], attention_mask.clone().into_boxed_slice()))?
            ])?;
            let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
            let mut logits = last_position_logits(shape, data)?;
            drop(outputs);

            let next = match (step, self.ids.forced_bos_token_id) {
                (0, Some(bos)) => bos as usize,
                _ => {
                    if generated.len() < min_tokens {
                        if let Some(l) = logits.get_mut(eos) {
                            *l = f32::NEG_INFINITY;
                        }
                    }
                    for banned in banned_ngram_tokens(&generated, NO_REPEAT_NGRAM) {
                        if let Some(l) = logits.get_mut(banned as usize) {
                            *l = f32::NEG_INFINITY;
                        }
                    }
                    argmax(&logits).context("Empty logits")?
                }
            };

            if next == eos {
                debug!("EOS after {} tokens", generated.len());
                break;
            }
            generated.push(next as u32);
            decoder_ids.push(next as i64);
        }

        let summary = self
            .tokenizer
            .decode(&generated, true)
            .map_err(|e| anyhow::anyhow!("Decoding failed: {}", e))?;
        Ok(summary.trim().to_string())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Tokens that would repeat an n-gram already present in `tokens`
pub(crate) fn banned_ngram_tokens(tokens: &[u32], n: usize) -> Vec<u32> {
    if n == 0 || tokens.len() + 1 < n {
        return Vec::new();
    }
    let prefix = &tokens[tokens.len() + 1 - n..];
    tokens
        .windows(n)
        .filter(|window| &window[..n - 1] == prefix)
        .map(|window| window[n - 1])
        .collect()
}
