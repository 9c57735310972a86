//! Embeddings from a local Ollama host (`POST /api/embed`).

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use patent_core::traits::Embedder;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

pub struct OllamaEmbedder {
    client: reqwest::blocking::Client,
    url: String,
    model: String,
    dim: usize,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, dim: usize) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("building Ollama HTTP client")?;
        Ok(Self { client, url: format!("{}/api/embed", base_url.trim_end_matches('/')), model: model.to_string(), dim })
    }
}

impl Embedder for OllamaEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { 8192 }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        debug!(model = %self.model, n = texts.len(), "ollama embed");
        let resp = self
            .client
            .post(&self.url)
            .json(&EmbedRequest { model: &self.model, input: texts })
            .send()
            .with_context(|| format!("Ollama unreachable at {}", self.url))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(anyhow!("Ollama returned {status}: {body}"));
        }
        let parsed: EmbedResponse = resp.json().context("decoding Ollama embed response")?;
        if parsed.embeddings.len() != texts.len() {
            return Err(anyhow!("Ollama returned {} vectors for {} inputs", parsed.embeddings.len(), texts.len()));
        }
        Ok(parsed
            .embeddings
            .into_iter()
            .map(|mut v| { v.resize(self.dim, 0.0); v })
            .collect())
    }
}
