//! patent-retrieval
//!
//! Keyword, semantic, hybrid and iterative (relevance feedback) retrieval over
//! a [`DocumentIndex`]. Every public search degrades instead of failing: index
//! or embedding errors are logged with their tag and turned into an empty (or,
//! for iterative search, partial) result.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, info, warn};

use patent_core::config::SearchSettings;
use patent_core::error::{Error, Result};
use patent_core::query::{Clause, SearchRequest};
use patent_core::traits::{DocumentIndex, Embedder};
use patent_core::types::{DateRange, PatentHit};

pub mod format;

pub use format::format_hits_for_llm;

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalOptions {
    pub top_k: usize,
    pub refinement_steps: usize,
    /// Upper bound on the refined query length in characters; 0 disables it.
    pub max_query_chars: usize,
    pub date_range: Option<DateRange>,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self { top_k: 20, refinement_steps: 3, max_query_chars: 512, date_range: None }
    }
}

impl From<&SearchSettings> for RetrievalOptions {
    fn from(s: &SearchSettings) -> Self {
        Self {
            top_k: s.top_k,
            refinement_steps: s.refinement_steps,
            max_query_chars: s.max_query_chars,
            date_range: s.date_range(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Keyword,
    Semantic,
    Hybrid,
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "keyword" | "k" => Ok(SearchMode::Keyword),
            "2" | "semantic" | "s" => Ok(SearchMode::Semantic),
            "3" | "hybrid" | "h" | "" => Ok(SearchMode::Hybrid),
            other => Err(format!("unknown search type '{other}' (keyword, semantic, hybrid)")),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SearchMode::Keyword => "keyword",
            SearchMode::Semantic => "semantic",
            SearchMode::Hybrid => "hybrid",
        };
        f.write_str(s)
    }
}

/// What one iterative round did.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundSummary {
    pub query: String,
    pub returned: usize,
    pub added: usize,
    pub accumulated: usize,
}

#[derive(Debug, Clone, Default)]
pub struct IterativeOutcome {
    pub hits: Vec<PatentHit>,
    pub rounds: Vec<RoundSummary>,
}

pub struct RetrievalEngine<I> where I: DocumentIndex {
    index: I,
    embedder: Box<dyn Embedder>,
    options: RetrievalOptions,
}

impl<I> RetrievalEngine<I> where I: DocumentIndex {
    pub fn new(index: I, embedder: Box<dyn Embedder>, options: RetrievalOptions) -> Self {
        Self { index, embedder, options }
    }

    pub fn options(&self) -> &RetrievalOptions { &self.options }

    pub fn embedder(&self) -> &dyn Embedder { self.embedder.as_ref() }

    /// Dispatch on `mode`; used by the front ends.
    pub fn search(&self, mode: SearchMode, query: &str, top_k: usize) -> Vec<PatentHit> {
        match mode {
            SearchMode::Keyword => self.keyword_search(query, top_k),
            SearchMode::Semantic => self.semantic_search(query, top_k),
            SearchMode::Hybrid => self.hybrid_search(query, top_k),
        }
    }

    /// Lexical match on `abstract`.
    pub fn keyword_search(&self, query: &str, top_k: usize) -> Vec<PatentHit> {
        degrade("keyword", self.try_keyword(query, top_k))
    }

    /// k-NN over `embedding` with `k = top_k`.
    pub fn semantic_search(&self, query: &str, top_k: usize) -> Vec<PatentHit> {
        degrade("semantic", self.try_semantic(query, top_k))
    }

    /// OR of the k-NN and lexical clauses. Falls back to the keyword query on
    /// any failure, then to empty.
    pub fn hybrid_search(&self, query: &str, top_k: usize) -> Vec<PatentHit> {
        match self.try_hybrid(query, top_k) {
            Ok(hits) => hits,
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "hybrid search failed, falling back to keyword");
                degrade("keyword fallback", self.try_keyword(query, top_k))
            }
        }
    }

    pub fn iterative_search(&self, query: &str, refinement_steps: usize, top_k: usize) -> Vec<PatentHit> {
        self.iterative_search_traced(query, refinement_steps, top_k).hits
    }

    /// Greedy relevance feedback: each round runs a keyword search with the
    /// current query, keeps hits not seen before, and appends the top hit's
    /// title to the query. Stops on the first empty round, on an error
    /// (keeping what was accumulated), or when the query cannot be refined.
    pub fn iterative_search_traced(&self, query: &str, refinement_steps: usize, top_k: usize) -> IterativeOutcome {
        let mut outcome = IterativeOutcome::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut current = query.to_string();

        for step in 1..=refinement_steps {
            let hits = match self.try_keyword(&current, top_k) {
                Ok(hits) => hits,
                Err(e) => {
                    warn!(step, kind = e.kind(), error = %e, "iterative search round failed, returning partial results");
                    break;
                }
            };
            if hits.is_empty() {
                info!(step, query = %current, "no hits, ending exploration");
                outcome.rounds.push(RoundSummary { query: current, returned: 0, added: 0, accumulated: outcome.hits.len() });
                break;
            }

            let returned = hits.len();
            let top_title = hits[0].source.title.trim().to_string();
            let mut added = 0;
            for hit in hits {
                if seen.insert(hit.dedup_key()) {
                    outcome.hits.push(hit);
                    added += 1;
                }
            }
            debug!(step, returned, added, total = outcome.hits.len(), "iterative round");
            outcome.rounds.push(RoundSummary { query: current.clone(), returned, added, accumulated: outcome.hits.len() });

            if step == refinement_steps { break; }
            match refine_query(&current, &top_title, self.options.max_query_chars) {
                Some(next) => current = next,
                None => {
                    info!(step, title = %top_title, "query cannot be refined further");
                    break;
                }
            }
        }
        outcome
    }

    /// `keyword_search` with the configured `top_k`.
    pub fn keyword(&self, query: &str) -> Vec<PatentHit> {
        self.keyword_search(query, self.options.top_k)
    }

    pub fn semantic(&self, query: &str) -> Vec<PatentHit> {
        self.semantic_search(query, self.options.top_k)
    }

    pub fn hybrid(&self, query: &str) -> Vec<PatentHit> {
        self.hybrid_search(query, self.options.top_k)
    }

    /// `iterative_search` with the configured step count and `top_k`.
    pub fn iterative(&self, query: &str) -> Vec<PatentHit> {
        self.iterative_search(query, self.options.refinement_steps, self.options.top_k)
    }

    fn try_keyword(&self, query: &str, top_k: usize) -> Result<Vec<PatentHit>> {
        self.run(Clause::match_abstract(query), top_k)
    }

    fn try_semantic(&self, query: &str, top_k: usize) -> Result<Vec<PatentHit>> {
        let vector = self.embed_query(query)?;
        self.run(Clause::knn_embedding(vector, top_k), top_k)
    }

    fn try_hybrid(&self, query: &str, top_k: usize) -> Result<Vec<PatentHit>> {
        let vector = self.embed_query(query)?;
        let clause = Clause::Should(vec![Clause::knn_embedding(vector, top_k), Clause::match_abstract(query)]);
        self.run(clause, top_k)
    }

    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let vector = self.embedder.embed(query).map_err(|e| Error::EmbeddingUnavailable(format!("{e:#}")))?;
        if vector.is_empty() {
            return Err(Error::EmbeddingUnavailable("empty query vector".into()));
        }
        Ok(vector)
    }

    fn run(&self, clause: Clause, top_k: usize) -> Result<Vec<PatentHit>> {
        if top_k == 0 { return Ok(Vec::new()); }
        let request = SearchRequest::new(clause, top_k).with_date_range(self.options.date_range);
        let mut hits = self.index.search(&request)?;
        hits.truncate(top_k);
        Ok(hits)
    }
}

fn degrade(op: &str, result: Result<Vec<PatentHit>>) -> Vec<PatentHit> {
    match result {
        Ok(hits) => hits,
        Err(e) => {
            warn!(op, kind = e.kind(), error = %e, "search failed, returning no results");
            Vec::new()
        }
    }
}

/// `current + " " + title`, or `None` when there is no title or the result
/// would exceed `max_chars` (0 means no limit).
pub fn refine_query(current: &str, title: &str, max_chars: usize) -> Option<String> {
    let title = title.trim();
    if title.is_empty() { return None; }
    let next = format!("{current} {title}");
    if max_chars > 0 && next.chars().count() > max_chars { return None; }
    Some(next)
}
