#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::NaiveDate;
use patent_core::error::{Error, Result};
use patent_core::query::{Clause, SearchRequest};
use patent_core::traits::{DocumentIndex, Embedder};
use patent_core::types::{PatentHit, PatentSource};
use patent_embed::FakeEmbedder;

pub fn hit(id: &str, title: &str, abstract_text: &str, score: f32) -> PatentHit {
    PatentHit {
        doc_id: Some(id.to_string()),
        score: Some(score),
        source: PatentSource {
            title: title.to_string(),
            abstract_text: abstract_text.to_string(),
            publication_date: Some("2020-01-01".to_string()),
            patent_id: id.to_string(),
        },
    }
}

pub fn titles(hits: &[PatentHit]) -> Vec<&str> {
    hits.iter().map(|h| h.source.title.as_str()).collect()
}

/// Returns canned hits per match text and records every request.
#[derive(Default)]
pub struct ScriptedIndex {
    by_text: HashMap<String, Vec<PatentHit>>,
    knn_hits: Vec<PatentHit>,
    fail_on: Option<String>,
    pub requests: Mutex<Vec<SearchRequest>>,
}

impl ScriptedIndex {
    pub fn new() -> Self { Self::default() }

    pub fn on(mut self, text: &str, hits: Vec<PatentHit>) -> Self {
        self.by_text.insert(text.to_string(), hits);
        self
    }

    pub fn on_knn(mut self, hits: Vec<PatentHit>) -> Self {
        self.knn_hits = hits;
        self
    }

    /// Fail with `IndexUnavailable` when the match text equals `text`.
    pub fn failing_on(mut self, text: &str) -> Self {
        self.fail_on = Some(text.to_string());
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn match_texts(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().filter_map(|r| r.match_text().map(str::to_string)).collect()
    }
}

impl DocumentIndex for ScriptedIndex {
    fn search(&self, request: &SearchRequest) -> Result<Vec<PatentHit>> {
        self.requests.lock().unwrap().push(request.clone());
        match request.match_text() {
            Some(text) if self.fail_on.as_deref() == Some(text) => Err(Error::IndexUnavailable("connection refused".into())),
            Some(text) => Ok(self.by_text.get(text).cloned().unwrap_or_default()),
            None => Ok(self.knn_hits.clone()),
        }
    }
}

/// Always unavailable.
#[derive(Default)]
pub struct DownIndex {
    pub calls: AtomicUsize,
}

impl DocumentIndex for DownIndex {
    fn search(&self, _request: &SearchRequest) -> Result<Vec<PatentHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::IndexUnavailable("timed out".into()))
    }
}

/// Rejects k-NN clauses, answers lexical ones from an inner index.
pub struct NoKnnIndex<I>(pub I);

impl<I: DocumentIndex> DocumentIndex for NoKnnIndex<I> {
    fn search(&self, request: &SearchRequest) -> Result<Vec<PatentHit>> {
        if request.has_knn() {
            return Err(Error::Query("unknown query [knn]".into()));
        }
        self.0.search(request)
    }
}

pub struct FailingEmbedder {
    pub calls: AtomicUsize,
}

impl FailingEmbedder {
    pub fn new() -> Self { Self { calls: AtomicUsize::new(0) } }
}

impl Embedder for FailingEmbedder {
    fn dim(&self) -> usize { 16 }
    fn max_len(&self) -> usize { 16 }
    fn embed_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("embedding model not loaded")
    }
}

/// Small deterministic corpus scored the way a lexical/vector engine would.
pub struct MemoryIndex {
    docs: Vec<(PatentSource, NaiveDate, Vec<f32>)>,
}

pub const MEMORY_DIM: usize = 64;

impl MemoryIndex {
    pub fn new(docs: &[(&str, &str, &str, &str)]) -> Self {
        let embedder = FakeEmbedder::new(MEMORY_DIM);
        let docs = docs
            .iter()
            .map(|(id, title, abs, date)| {
                let vector = embedder.embed(&format!("{title} {abs}")).unwrap();
                let source = PatentSource {
                    title: title.to_string(),
                    abstract_text: abs.to_string(),
                    publication_date: Some(date.to_string()),
                    patent_id: id.to_string(),
                };
                (source, NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(), vector)
            })
            .collect();
        Self { docs }
    }

    pub fn battery_corpus() -> Self {
        Self::new(&[
            ("US1", "Solid electrolyte", "solid electrolyte for lithium battery cells", "2015-03-01"),
            ("US2", "Silicon anode", "silicon anode with binder for lithium ion battery", "2017-06-12"),
            ("US3", "Cathode coating", "nickel rich cathode coating improves battery cycle life", "2019-09-30"),
            ("US4", "Thermal runaway", "sensor detects thermal runaway in battery packs", "2021-01-15"),
            ("US5", "Irrigation valve", "valve for agricultural irrigation systems", "2018-04-04"),
            ("US6", "Separator film", "ceramic coated separator film for lithium cells", "2022-11-11"),
        ])
    }

    fn score(&self, clause: &Clause, idx: usize) -> f32 {
        let (source, _, vector) = &self.docs[idx];
        match clause {
            Clause::Match { text, .. } => {
                let abs = source.abstract_text.to_lowercase();
                let terms: Vec<&str> = abs.split_whitespace().collect();
                text.to_lowercase().split_whitespace().filter(|t| terms.contains(t)).count() as f32
            }
            Clause::Knn { vector: q, .. } => {
                let sim: f32 = q.iter().zip(vector).map(|(a, b)| a * b).sum();
                if sim > 0.0 { sim } else { 0.0 }
            }
            Clause::Should(clauses) => clauses.iter().map(|c| self.score(c, idx)).sum(),
        }
    }

    pub fn embedder(&self) -> FakeEmbedder {
        FakeEmbedder::new(MEMORY_DIM)
    }
}

impl DocumentIndex for MemoryIndex {
    fn search(&self, request: &SearchRequest) -> Result<Vec<PatentHit>> {
        let mut scored: Vec<(usize, f32)> = (0..self.docs.len())
            .filter(|&i| request.date_range.map_or(true, |r| r.contains(self.docs[i].1)))
            .map(|i| (i, self.score(&request.clause, i)))
            .filter(|(_, s)| *s > 0.0)
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));
        Ok(scored
            .into_iter()
            .take(request.size)
            .map(|(i, s)| PatentHit {
                doc_id: Some(self.docs[i].0.patent_id.clone()),
                score: Some(s),
                source: self.docs[i].0.clone(),
            })
            .collect())
    }
}
