//! Local sentence encoder on Candle.
//!
//! Runs a BERT sentence-transformer (all-MiniLM-L6-v2 by default) on the
//! CPU. Texts are tokenized with padding to the longest input and truncation
//! at [`MAX_SEQ_LENGTH`], the hidden states are mean-pooled over real tokens,
//! and the pooled vector is scaled to unit length.

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::cache::{ModelCache, ModelFiles};
use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingModel, ModelInfo};

/// Output size of all-MiniLM-L6-v2
pub const EMBEDDING_DIM: usize = 384;

/// Tokens kept per text
pub const MAX_SEQ_LENGTH: usize = 256;

/// Texts per forward pass
const MAX_BATCH: usize = 32;

/// Sentence encoder backed by a Candle BERT model.
pub struct CandleEncoder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    info: ModelInfo,
}

impl CandleEncoder {
    /// Load the cached model, downloading missing files first.
    pub fn load(cache: &ModelCache) -> Result<Self, EmbeddingError> {
        let files = cache.fetch()?;
        Self::from_files(cache.model_name(), &files)
    }

    /// Load from files already on disk.
    pub fn from_files(name: &str, files: &ModelFiles) -> Result<Self, EmbeddingError> {
        let device = Device::Cpu;

        let raw_config = std::fs::read_to_string(&files.config)?;
        let config: BertConfig = serde_json::from_str(&raw_config).map_err(|e| {
            EmbeddingError::ModelNotFound(format!("{}: {}", files.config.display(), e))
        })?;
        let dimension = hidden_size(&raw_config).unwrap_or(EMBEDDING_DIM);

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQ_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        // SAFETY: the cache owns the weights file and never rewrites it in place.
        let vars = unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weights.clone()], DType::F32, &device)?
        };
        let model = BertModel::load(vars, &config)?;

        info!(model = name, dimension, "Encoder loaded");

        Ok(Self {
            model,
            tokenizer,
            device,
            info: ModelInfo {
                name: name.to_string(),
                dimension,
                max_sequence_length: MAX_SEQ_LENGTH,
            },
        })
    }

    fn forward(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;
        if encodings.iter().all(|e| e.get_ids().is_empty()) {
            return Err(EmbeddingError::InvalidInput(
                "text produced no tokens".to_string(),
            ));
        }

        let mut ids = Vec::with_capacity(encodings.len());
        let mut masks = Vec::with_capacity(encodings.len());
        for encoding in &encodings {
            ids.push(Tensor::new(encoding.get_ids(), &self.device)?);
            masks.push(Tensor::new(encoding.get_attention_mask(), &self.device)?);
        }
        let input_ids = Tensor::stack(&ids, 0)?;
        let attention_mask = Tensor::stack(&masks, 0)?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = mean_pool(&hidden, &attention_mask)?;

        Ok(pooled
            .to_vec2::<f32>()?
            .into_iter()
            .map(Embedding::new)
            .collect())
    }
}

/// Average hidden states over positions where the mask is set.
fn mean_pool(hidden: &Tensor, mask: &Tensor) -> Result<Tensor, EmbeddingError> {
    let mask = mask.to_dtype(DType::F32)?.unsqueeze(2)?;
    let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
    let tokens = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
    Ok(summed.broadcast_div(&tokens)?)
}

/// `hidden_size` from a BERT config.json.
fn hidden_size(raw_config: &str) -> Option<usize> {
    let value: serde_json::Value = serde_json::from_str(raw_config).ok()?;
    value.get("hidden_size")?.as_u64().map(|v| v as usize)
}

impl EmbeddingModel for CandleEncoder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.forward(&[text])?
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidInput("encoder returned no vector".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(MAX_BATCH) {
            out.extend(self.forward(chunk)?);
        }
        debug!(count = out.len(), "Encoded texts");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_size() {
        assert_eq!(hidden_size(r#"{"hidden_size": 384}"#), Some(384));
        assert_eq!(hidden_size(r#"{"hidden_size": 768, "layers": 12}"#), Some(768));
        assert_eq!(hidden_size("{}"), None);
        assert_eq!(hidden_size("not json"), None);
    }

    #[test]
    fn test_mean_pool_ignores_padding() {
        let device = Device::Cpu;
        // One text, three positions, two features; the last position is padding.
        let hidden = Tensor::new(&[[[1.0f32, 2.0], [3.0, 4.0], [100.0, 100.0]]], &device).unwrap();
        let mask = Tensor::new(&[[1u32, 1, 0]], &device).unwrap();

        let pooled = mean_pool(&hidden, &mask).unwrap().to_vec2::<f32>().unwrap();
        assert_eq!(pooled, vec![vec![2.0, 3.0]]);
    }

    // The tests below download the model; run with `-- --ignored`.

    #[test]
    #[ignore = "requires model download"]
    fn test_load_default_model() {
        let encoder = CandleEncoder::load(&ModelCache::default()).unwrap();
        assert_eq!(encoder.info().dimension, EMBEDDING_DIM);
        assert_eq!(encoder.info().name, "all-MiniLM-L6-v2");
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_encode_is_deterministic() {
        let encoder = CandleEncoder::load(&ModelCache::default()).unwrap();
        let text = "Inception: A thief who steals corporate secrets through dream-sharing.";
        let first = encoder.encode(text).unwrap();
        assert_eq!(first.len(), EMBEDDING_DIM);
        assert_eq!(first, encoder.encode(text).unwrap());
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_batch_matches_single() {
        let encoder = CandleEncoder::load(&ModelCache::default()).unwrap();
        let texts = ["Heat: A group of robbers", "Amélie: A shy waitress in Paris"];
        let batch = encoder.embed_batch(&texts).unwrap();
        let single = encoder.embed(texts[1]).unwrap();
        assert!(batch[1].cosine_similarity(&single) > 0.999);
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_similar_synopses_score_higher() {
        let encoder = CandleEncoder::load(&ModelCache::default()).unwrap();
        let heist = encoder.embed("A crew of thieves plans a bank robbery").unwrap();
        let heist2 = encoder.embed("Robbers prepare to rob a bank vault").unwrap();
        let romance = encoder.embed("Two strangers fall in love in Paris").unwrap();
        assert!(heist.cosine_similarity(&heist2) > heist.cosine_similarity(&romance));
    }
}
