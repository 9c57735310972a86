use std::sync::Arc;

use crate::error::Result;
use crate::query::SearchRequest;
use crate::types::PatentHit;

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Query side of the external document store.
pub trait DocumentIndex: Send + Sync {
    fn search(&self, request: &SearchRequest) -> Result<Vec<PatentHit>>;
}

impl<T: DocumentIndex + ?Sized> DocumentIndex for Arc<T> {
    fn search(&self, request: &SearchRequest) -> Result<Vec<PatentHit>> {
        (**self).search(request)
    }
}

impl<T: DocumentIndex + ?Sized> DocumentIndex for &T {
    fn search(&self, request: &SearchRequest) -> Result<Vec<PatentHit>> {
        (**self).search(request)
    }
}
