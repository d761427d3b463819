//! Sentence embeddings via Candle.
//!
//! Loads a BERT-architecture sentence-transformer from the HuggingFace Hub
//! and produces L2-normalized embeddings with mean pooling over the
//! attention mask. The model identifier comes from configuration and must
//! be the same model that produced the vector index.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::{api::sync::Api, Repo, RepoType};
use tokenizers::Tokenizer;
use tracing::{debug, info};

/// Maps text to fixed-dimension normalized vectors.
///
/// Carried in the ML context as `Arc<dyn EmbeddingProvider>` so the backend
/// can be swapped without touching the engine.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Encodes each input string into one L2-normalized vector.
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Output dimension. Must equal the vector index dimension.
    fn dimension(&self) -> usize;

    /// The pretrained model identifier this provider was loaded from.
    fn model_id(&self) -> &str;
}

/// Default provider: in-process BERT inference on CPU.
pub struct BertEmbedder {
    inner: Arc<BertInner>,
    model_id: String,
    dimension: usize,
}

struct BertInner {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl BertEmbedder {
    /// Loads the model from the HuggingFace Hub, downloading on first use
    /// (cached under ~/.cache/huggingface afterwards).
    pub fn from_hub(model_id: &str) -> Result<Self> {
        info!("Loading embedding model: {model_id}");

        let device = Device::Cpu;

        let api = Api::new().context("Failed to create HuggingFace API client")?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo
            .get("config.json")
            .context("Failed to download config.json")?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .context("Failed to download tokenizer.json")?;
        let weights_path = repo
            .get("model.safetensors")
            .context("Failed to download model.safetensors")?;

        debug!("Model files downloaded to cache");

        let config: Config = serde_json::from_str(
            &std::fs::read_to_string(&config_path).context("Failed to read config.json")?,
        )
        .context("Failed to parse config.json")?;

        let dimension = config.hidden_size;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {e}"))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)
                .context("Failed to load model weights")?
        };
        let model = BertModel::load(vb, &config).context("Failed to build BERT model")?;

        info!("Embedding model loaded (dimension: {dimension})");

        Ok(Self {
            inner: Arc::new(BertInner {
                model,
                tokenizer,
                device,
            }),
            model_id: model_id.to_string(),
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for BertEmbedder {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let inner = self.inner.clone();
        let texts = texts.to_vec();

        // Inference is CPU-bound; keep it off the async worker threads.
        tokio::task::spawn_blocking(move || inner.forward_batch(&texts))
            .await
            .context("Embedding task panicked")?
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

impl BertInner {
    fn forward_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {e}"))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut all_input_ids = Vec::new();
        let mut all_attention_mask = Vec::new();
        let mut all_token_type_ids = Vec::new();

        for encoding in &encodings {
            let mut ids = encoding.get_ids().to_vec();
            let mut attention = encoding.get_attention_mask().to_vec();
            let mut type_ids = encoding.get_type_ids().to_vec();

            ids.resize(max_len, 0);
            attention.resize(max_len, 0);
            type_ids.resize(max_len, 0);

            all_input_ids.extend(ids);
            all_attention_mask.extend(attention);
            all_token_type_ids.extend(type_ids);
        }

        let batch_size = texts.len();

        let input_ids = Tensor::from_vec(all_input_ids, (batch_size, max_len), &self.device)?
            .to_dtype(DType::U32)?;
        let attention_mask =
            Tensor::from_vec(all_attention_mask, (batch_size, max_len), &self.device)?;
        let token_type_ids =
            Tensor::from_vec(all_token_type_ids, (batch_size, max_len), &self.device)?
                .to_dtype(DType::U32)?;

        // (batch, seq, hidden)
        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // Mean pooling over real tokens only, then L2 normalize.
        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let summed = output.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
        let mean = summed.broadcast_div(&counts)?;
        let normalized = l2_normalize(&mean)?;

        Ok(normalized.to_vec2::<f32>()?)
    }
}

fn l2_normalize(tensor: &Tensor) -> Result<Tensor> {
    let norm = tensor
        .sqr()?
        .sum_keepdim(1)?
        .sqrt()?
        .clamp(1e-12, f64::MAX)?;
    Ok(tensor.broadcast_div(&norm)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires model download
    async fn test_encode_returns_unit_vectors() {
        let embedder = BertEmbedder::from_hub("sentence-transformers/all-MiniLM-L6-v2")
            .expect("Failed to load embedder");

        let embeddings = embedder
            .encode(&["database administration".to_string(), "welding".to_string()])
            .await
            .expect("Failed to encode");

        assert_eq!(embeddings.len(), 2);
        for embedding in &embeddings {
            assert_eq!(embedding.len(), embedder.dimension());
            let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 0.01);
        }
    }
}
