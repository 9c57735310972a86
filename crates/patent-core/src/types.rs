//! Domain types shared by the index client, the retrieval engine and ingest.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type PatentId = String;

/// Fields every search request projects. Nothing else is read back from the
/// index at query time.
pub const DISPLAY_FIELDS: [&str; 4] = ["title", "abstract", "publication_date", "patent_id"];

/// A patent as written to the index by the ingest pipeline.
///
/// - `patent_id`: opaque identifier, also used as the index document id
/// - `publication_date`: normalised from any accepted input format
/// - `embedding`: vector of `title + abstract`, fixed dimension per index
/// - `token_count`: approximate token length of the abstract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatentRecord {
    pub patent_id: PatentId,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub publication_date: NaiveDate,
    pub embedding: Vec<f32>,
    pub token_count: usize,
}

impl PatentRecord {
    /// Text fed to the embedder for this record.
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.title, self.abstract_text)
    }
}

/// The display projection of a patent returned by searches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatentSource {
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub patent_id: String,
}

/// One result row: optional index id, optional score, projected fields.
///
/// `score` only orders results for display; nothing in the engine re-ranks on
/// it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatentHit {
    #[serde(default, rename = "_id")]
    pub doc_id: Option<String>,
    #[serde(default, rename = "_score")]
    pub score: Option<f32>,
    #[serde(default, rename = "_source")]
    pub source: PatentSource,
}

impl PatentHit {
    /// Identity used when accumulating results across queries.
    ///
    /// Prefers `patent_id`, then the index document id, and only falls back
    /// to the serialized projection when both are missing. Score never takes
    /// part in the key.
    pub fn dedup_key(&self) -> String {
        if !self.source.patent_id.is_empty() {
            return format!("patent:{}", self.source.patent_id);
        }
        if let Some(id) = self.doc_id.as_deref().filter(|id| !id.is_empty()) {
            return format!("doc:{id}");
        }
        let projection = serde_json::to_string(&self.source).unwrap_or_default();
        format!("source:{projection}")
    }
}

/// Inclusive bounds over `publication_date`. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Option<Self> {
        if from.is_none() && to.is_none() {
            return None;
        }
        Some(Self { from, to })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |f| date >= f) && self.to.map_or(true, |t| date <= t)
    }
}
