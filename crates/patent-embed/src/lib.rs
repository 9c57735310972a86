//! Embedding providers for patent text.
//!
//! `LocalEmbedder` runs BGE-M3 (XLM-RoBERTa) through candle, `OllamaEmbedder`
//! calls a local Ollama host, and `FakeEmbedder` hashes tokens into a
//! deterministic vector for tests. All of them return L2-normalised vectors of
//! the configured dimension and implement `patent_core::traits::Embedder`.

use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{Device, Tensor, DType};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{XLMRobertaModel, Config as XLMRobertaConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use patent_core::config::{EmbeddingProvider, EmbeddingSettings, OllamaSettings};
use patent_core::traits::Embedder;

pub mod device;
pub mod fake;
pub mod ollama;
pub mod pool;
pub mod tokenize;

pub use device::select_device;
pub use fake::FakeEmbedder;
pub use ollama::OllamaEmbedder;
pub use pool::masked_mean_l2;

pub struct LocalEmbedder { model: XLMRobertaModel, tokenizer: Tokenizer, device: Device, dim: usize, max_len: usize }

impl LocalEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        let device = select_device();
        let model_dir = resolve_model_dir(settings.model_dir.as_deref())?;
        info!(dir = %model_dir.display(), "loading BGE-M3 model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path)?;
        let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        info!(dim = settings.dimension, max_len = settings.max_len, "BGE-M3 model loaded");
        Ok(Self { model, tokenizer, device, dim: settings.dimension, max_len: settings.max_len })
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize::tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = Tensor::zeros((1, self.max_len), DType::I64, &self.device)?;
        let hidden_states = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden_states, &attention_mask)?;
        let emb = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1::<f32>()?;
        if emb.len() != self.dim {
            return Err(anyhow!("model produced {} dims, configured for {}", emb.len(), self.dim));
        }
        if start.elapsed().as_millis() > 100 { debug!(ms = start.elapsed().as_millis() as u64, "slow embedding"); }
        Ok(emb)
    }

    /// Token length of `text` under the model tokenizer.
    pub fn count_tokens(&self, text: &str) -> Result<usize> {
        tokenize::count_tokens(&self.tokenizer, text)
    }
}

impl Embedder for LocalEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_one(t)).collect()
    }
}

/// `APP_USE_FAKE_EMBEDDINGS=1` (or `true`) forces the fake embedder.
pub fn fake_forced() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

pub fn embedder_from_settings(settings: &EmbeddingSettings, ollama: &OllamaSettings) -> Result<Box<dyn Embedder>> {
    if fake_forced() || settings.provider == EmbeddingProvider::Fake {
        info!(dim = settings.dimension, "using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(settings.dimension)));
    }
    match settings.provider {
        EmbeddingProvider::Local => Ok(Box::new(LocalEmbedder::new(settings)?)),
        EmbeddingProvider::Ollama => Ok(Box::new(OllamaEmbedder::new(&ollama.base_url, &settings.ollama_model, settings.dimension)?)),
        EmbeddingProvider::Fake => Ok(Box::new(FakeEmbedder::new(settings.dimension))),
    }
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    let candidates = [
        configured.map(patent_core::config::expand_path),
        std::env::var("APP_MODEL_DIR").ok().map(PathBuf::from),
        std::env::var("MODEL_DIR").ok().map(PathBuf::from),
        Some(PathBuf::from("models/bge-m3")),
        Some(PathBuf::from("../models/bge-m3")),
    ];
    for p in candidates.into_iter().flatten() {
        if is_model_dir(&p) { return Ok(p); }
        warn!(dir = %p.display(), "model directory not found");
    }
    Err(anyhow!("Could not locate BGE-M3 model directory (set embedding.model_dir or APP_MODEL_DIR)"))
}

fn is_model_dir(p: &Path) -> bool {
    p.join("tokenizer.json").exists() && p.join("config.json").exists()
}
