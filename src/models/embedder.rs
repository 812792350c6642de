// Sentence embeddings: sentence-transformer ONNX export, or hashed bag of words
use anyhow::{Context, Result};
use ndarray::ArrayView3;
use ort::{inputs, session::Session, value::Value};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use tokenizers::{Encoding, PaddingParams, PaddingStrategy, Tokenizer};
use tracing::info;

use super::{l2_normalize, load_session, load_tokenizer, SentenceEmbedder};
use crate::nlp::content_words;

const MODEL_FILE: &str = "model.onnx";
const MAX_SEQUENCE_TOKENS: usize = 256;
pub const HASHED_DIMENSIONS: usize = 512;

pub struct OnnxEmbedder {
    session: Session,
    tokenizer: Tokenizer,
    uses_token_types: bool,
    name: String,
}

impl OnnxEmbedder {
    pub fn available(dir: &Path) -> bool {
        dir.join(MODEL_FILE).exists() && dir.join("tokenizer.json").exists()
    }

    pub fn load(dir: &Path, intra_threads: usize) -> Result<Self> {
        let _ = ort::init();

        let session = load_session(&dir.join(MODEL_FILE), intra_threads)?;
        let mut tokenizer = load_tokenizer(&dir.join("tokenizer.json"))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        let uses_token_types = session.inputs.iter().any(|input| input.name == "token_type_ids");

        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sentence-embedder".to_string());
        info!("Loaded embedding model {}", name);

        Ok(Self { session, tokenizer, uses_token_types, name })
    }
}

impl SentenceEmbedder for OnnxEmbedder {
    fn embed_batch(&mut self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let batch = encodings.len();
        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(MAX_SEQUENCE_TOKENS);
        if seq_len == 0 {
            return Ok(vec![Vec::new(); batch]);
        }

        // Row-major [batch, seq_len], cut to the sequence limit
        let gather = |field: fn(&Encoding) -> &[u32]| -> Vec<i64> {
            encodings
                .iter()
                .flat_map(|e| {
                    let values = field(e);
                    (0..seq_len).map(move |i| values.get(i).copied().unwrap_or(0) as i64)
                })
                .collect()
        };
        let input_ids = gather(Encoding::get_ids);
        let attention_mask = gather(Encoding::get_attention_mask);
        let token_types = gather(Encoding::get_type_ids);

        let shape = [batch, seq_len];
        let outputs = if self.uses_token_types {
            self.session.run(inputs![
                "input_ids" => Value::from_array((shape, input_ids.into_boxed_slice()))?,
                "attention_mask" => Value::from_array((shape, attention_mask.clone().into_boxed_slice()))?,
                "token_type_ids" => Value::from_array((shape, token_types.into_boxed_slice()))?
            ])?
        } else {
            self.session.run(inputs![
                "input_ids" => Value::from_array((shape, input_ids.into_boxed_slice()))?,
                "attention_mask" => Value::from_array((shape, attention_mask.clone().into_boxed_slice()))?
            ])?
        };

        let (hidden_shape, hidden_data) = outputs[0].try_extract_tensor::<f32>()?;
        if hidden_shape.len() != 3 {
            anyhow::bail!("Unexpected embedding output shape {:?}", hidden_shape);
        }
        let dims = (hidden_shape[0] as usize, hidden_shape[1] as usize, hidden_shape[2] as usize);
        let hidden = ArrayView3::from_shape(dims, hidden_data)
            .context("Embedding output does not match its shape")?;

        Ok(mean_pool(&hidden, &attention_mask, seq_len))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Attention-masked mean over the sequence axis, then L2 normalization
fn mean_pool(hidden: &ArrayView3<f32>, attention_mask: &[i64], seq_len: usize) -> Vec<Vec<f32>> {
    let (batch, tokens, dim) = hidden.dim();
    let mut embeddings = Vec::with_capacity(batch);

    for b in 0..batch {
        let mut sum = vec![0.0_f32; dim];
        let mut count = 0.0_f32;
        for t in 0..tokens.min(seq_len) {
            if attention_mask.get(b * seq_len + t).copied().unwrap_or(0) == 1 {
                for (k, value) in sum.iter_mut().enumerate() {
                    *value += hidden[[b, t, k]];
                }
                count += 1.0;
            }
        }
        if count > 0.0 {
            for value in sum.iter_mut() {
                *value /= count;
            }
        }
        l2_normalize(&mut sum);
        embeddings.push(sum);
    }
    embeddings
}

/// Hashed term-frequency vectors over content words
#[derive(Debug, Clone)]
pub struct HashedBagOfWords {
    dimensions: usize,
}

impl Default for HashedBagOfWords {
    fn default() -> Self {
        Self { dimensions: HASHED_DIMENSIONS }
    }
}

impl HashedBagOfWords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions];
        for word in content_words(text) {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            let slot = (hasher.finish() % self.dimensions as u64) as usize;
            vector[slot] += 1.0;
        }
        l2_normalize(&mut vector);
        vector
    }
}

impl SentenceEmbedder for HashedBagOfWords {
    fn embed_batch(&mut self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }

    fn name(&self) -> &str {
        "hashed-bag-of-words"
    }
}
