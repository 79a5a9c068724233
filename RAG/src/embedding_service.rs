//! Sentence embedding encoder.
//!
//! Runs a BERT sentence-transformer (e.g. `sentence-transformers/all-MiniLM-L6-v2`)
//! with Candle: token embeddings are mean-pooled and L2-normalised, matching
//! what sentence-transformers produces for these models.

use crate::error::EmbedError;
use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::api::tokio::{Api, ApiRepo};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokenizers::{Tokenizer, TruncationParams};

pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// sentence-transformers' `max_seq_length` for MiniLM-class models,
/// special tokens included.
const MAX_SEQ_LENGTH: usize = 256;

/// Turns text into a fixed-length vector.
#[async_trait]
pub trait Encoder: Send + Sync {
    fn dimension(&self) -> usize;

    async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

/// Produces an encoder on demand. Loading may be slow (model download).
#[async_trait]
pub trait EncoderLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn Encoder>, EmbedError>;
}

/// Loads a [`CandleEncoder`] from the HuggingFace Hub or a local directory.
pub struct CandleLoader {
    model_id: String,
}

impl CandleLoader {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
        }
    }
}

#[async_trait]
impl EncoderLoader for CandleLoader {
    async fn load(&self) -> Result<Arc<dyn Encoder>, EmbedError> {
        let encoder = CandleEncoder::load(&self.model_id).await?;
        Ok(Arc::new(encoder))
    }
}

struct ModelFiles {
    tokenizer: PathBuf,
    config: PathBuf,
    weights: PathBuf,
}

async fn locate_model_files(model_id: &str) -> Result<ModelFiles, EmbedError> {
    let local = Path::new(model_id);
    if local.is_dir() {
        log::info!("Using local embedding model at {}", local.display());
        return Ok(ModelFiles {
            tokenizer: local.join("tokenizer.json"),
            config: local.join("config.json"),
            weights: local.join("model.safetensors"),
        });
    }

    log::info!("Fetching embedding model {} from the HuggingFace Hub", model_id);
    let api = Api::new().map_err(|e| EmbedError::ModelLoad(format!("failed to create HF API: {e}")))?;
    let repo = api.model(model_id.to_string());

    Ok(ModelFiles {
        tokenizer: fetch(&repo, "tokenizer.json").await?,
        config: fetch(&repo, "config.json").await?,
        weights: fetch(&repo, "model.safetensors").await?,
    })
}

async fn fetch(repo: &ApiRepo, name: &str) -> Result<PathBuf, EmbedError> {
    repo.get(name)
        .await
        .map_err(|e| EmbedError::ModelLoad(format!("failed to download {name}: {e}")))
}

struct LoadedModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
}

pub struct CandleEncoder {
    inner: Arc<LoadedModel>,
}

impl CandleEncoder {
    pub async fn load(model_id: &str) -> Result<Self, EmbedError> {
        let files = locate_model_files(model_id).await?;

        let inner = tokio::task::spawn_blocking(move || load_model(files))
            .await
            .map_err(|e| EmbedError::ModelLoad(format!("model load task failed: {e}")))??;

        log::info!(
            "Embedding model {} ready ({} dimensions, device {:?})",
            model_id,
            inner.dimension,
            inner.device
        );
        Ok(Self {
            inner: Arc::new(inner),
        })
    }
}

fn load_model(files: ModelFiles) -> Result<LoadedModel, EmbedError> {
    let device = Device::Cpu;

    let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
        .map_err(|e| EmbedError::ModelLoad(format!("failed to load tokenizer: {e}")))?;
    limit_sequence_length(&mut tokenizer)?;

    let config_str = std::fs::read_to_string(&files.config)
        .map_err(|e| EmbedError::ModelLoad(format!("failed to read config: {e}")))?;
    let config: Config = serde_json::from_str(&config_str)
        .map_err(|e| EmbedError::ModelLoad(format!("failed to parse config: {e}")))?;
    let dimension = serde_json::from_str::<serde_json::Value>(&config_str)
        .ok()
        .and_then(|v| v["hidden_size"].as_u64())
        .ok_or_else(|| EmbedError::ModelLoad("config has no hidden_size".to_string()))?
        as usize;

    // SAFETY: the weights file is only read, and is not modified while mapped.
    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[files.weights], DType::F32, &device)
            .map_err(|e| EmbedError::ModelLoad(format!("failed to load weights: {e}")))?
    };
    let model = BertModel::load(vb, &config)
        .map_err(|e| EmbedError::ModelLoad(format!("failed to build BERT model: {e}")))?;

    Ok(LoadedModel {
        model,
        tokenizer,
        device,
        dimension,
    })
}

/// Long inputs are cut before `[SEP]` is appended, so the sequence still ends
/// with it.
fn limit_sequence_length(tokenizer: &mut Tokenizer) -> Result<(), EmbedError> {
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: MAX_SEQ_LENGTH,
            ..Default::default()
        }))
        .map_err(|e| EmbedError::ModelLoad(format!("failed to configure truncation: {e}")))?;
    Ok(())
}

fn token_ids(tokenizer: &Tokenizer, text: &str) -> Result<Vec<u32>, EmbedError> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| EmbedError::Inference(format!("tokenization failed: {e}")))?;
    Ok(encoding.get_ids().to_vec())
}

fn inference(e: candle_core::Error) -> EmbedError {
    EmbedError::Inference(e.to_string())
}

impl LoadedModel {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let ids = token_ids(&self.tokenizer, text)?;
        let len = ids.len();
        if len == 0 {
            return Err(EmbedError::Inference("tokenizer produced no tokens".to_string()));
        }

        let input_ids = Tensor::from_vec(ids, (1, len), &self.device).map_err(inference)?;
        let token_type_ids = input_ids.zeros_like().map_err(inference)?;
        let attention_mask = input_ids.ones_like().map_err(inference)?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(inference)?;

        // Single unpadded sequence: mean pooling is a plain mean over tokens.
        let pooled = (output.sum(1).map_err(inference)? / len as f64).map_err(inference)?;
        let norm = pooled
            .sqr()
            .and_then(|t| t.sum_keepdim(1))
            .and_then(|t| t.sqrt())
            .and_then(|t| t.clamp(1e-12, f64::MAX))
            .map_err(inference)?;
        let normalized = pooled.broadcast_div(&norm).map_err(inference)?;

        normalized
            .squeeze(0)
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(inference)
    }
}

#[async_trait]
impl Encoder for CandleEncoder {
    fn dimension(&self) -> usize {
        self.inner.dimension
    }

    async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let inner = Arc::clone(&self.inner);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || inner.embed(&text))
            .await
            .map_err(|e| EmbedError::Inference(format!("encode task failed: {e}")))?
    }
}
