//! Shared pieces of the `patent-cli` and `patent-indexer` binaries.

pub mod args;
pub mod display;
pub mod logging;

use anyhow::anyhow;
use patent_core::traits::Embedder;

/// Stands in for an embedding model that failed to load, so lexical search
/// keeps working and vector search degrades to empty results.
pub struct UnavailableEmbedder {
    reason: String,
    dim: usize,
}

impl UnavailableEmbedder {
    pub fn new(reason: impl Into<String>, dim: usize) -> Self {
        Self { reason: reason.into(), dim }
    }
}

impl Embedder for UnavailableEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { 0 }
    fn embed_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Err(anyhow!("embedding model unavailable: {}", self.reason))
    }
}
