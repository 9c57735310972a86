use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::Error;
use crate::types::PatentRecord;

/// Date layouts accepted for `publication_date`, tried in order.
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// A patent as it appears in the source files, before normalisation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPatent {
    #[serde(default, alias = "id", alias = "publication_number")]
    pub patent_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "abstract", alias = "abstract_text")]
    pub abstract_text: Option<String>,
    #[serde(default, alias = "date", alias = "publication_date_raw")]
    pub publication_date: Option<serde_json::Value>,
}

/// A validated patent waiting for its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPatent {
    pub patent_id: String,
    pub title: String,
    pub abstract_text: String,
    pub publication_date: NaiveDate,
    pub token_count: usize,
}

impl PendingPatent {
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.title, self.abstract_text)
    }

    pub fn into_record(self, embedding: Vec<f32>) -> PatentRecord {
        PatentRecord {
            patent_id: self.patent_id,
            title: self.title,
            abstract_text: self.abstract_text,
            publication_date: self.publication_date,
            embedding,
            token_count: self.token_count,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkippedRecord {
    pub file: PathBuf,
    /// 1-based line in a `.jsonl` file, or 1-based element of a `.json` array.
    pub position: usize,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub patents: Vec<PendingPatent>,
    pub skipped: Vec<SkippedRecord>,
    pub files: usize,
}

#[derive(Default)]
pub struct PatentLoader {
    limit: Option<usize>,
}

impl PatentLoader {
    pub fn new() -> Self { Self::default() }

    /// Stop after this many accepted records.
    pub fn with_limit(limit: usize) -> Self { Self { limit: Some(limit) } }

    pub fn load_dir(&self, data_dir: &Path) -> Result<LoadReport> {
        let files = self.list_patent_files(data_dir);
        let mut report = LoadReport::default();
        if files.is_empty() {
            warn!(dir = %data_dir.display(), "no .json or .jsonl files found");
            return Ok(report);
        }
        for (file_index, file_path) in files.iter().enumerate() {
            if self.limit_reached(&report) { break; }
            info!(file = %file_path.display(), "processing file {}/{}", file_index + 1, files.len());
            let raws = self.read_raw(file_path)?;
            for (position, raw) in raws {
                if self.limit_reached(&report) { break; }
                match normalize(raw) {
                    Ok(p) => report.patents.push(p),
                    Err(e) => report.skipped.push(SkippedRecord { file: file_path.clone(), position, reason: e.to_string() }),
                }
            }
            report.files += 1;
        }
        info!(files = report.files, patents = report.patents.len(), skipped = report.skipped.len(), "loaded patent records");
        Ok(report)
    }

    fn limit_reached(&self, report: &LoadReport) -> bool {
        self.limit.is_some_and(|l| report.patents.len() >= l)
    }

    /// Parsed records paired with their 1-based line (`.jsonl`) or array
    /// position (`.json`).
    fn read_raw(&self, file_path: &Path) -> Result<Vec<(usize, Result<RawPatent, String>)>> {
        let content = match fs::read_to_string(file_path) {
            Ok(content) => content,
            Err(_) => String::from_utf8_lossy(&fs::read(file_path)?).to_string(),
        };
        let is_jsonl = file_path.extension().and_then(|s| s.to_str()) == Some("jsonl");
        if is_jsonl {
            return Ok(content
                .lines()
                .enumerate()
                .filter(|(_, l)| !l.trim().is_empty())
                .map(|(i, l)| (i + 1, serde_json::from_str::<RawPatent>(l).map_err(|e| format!("malformed line: {e}"))))
                .collect());
        }
        let values: Vec<serde_json::Value> = serde_json::from_str(&content)
            .with_context(|| format!("{} is not a JSON array of patents", file_path.display()))?;
        Ok(values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i + 1, serde_json::from_value::<RawPatent>(v).map_err(|e| format!("malformed record: {e}"))))
            .collect())
    }

    fn list_patent_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path();
            if matches!(path.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) { files.push(path.to_path_buf()); }
        }
        files.sort(); files
    }
}

fn normalize(raw: Result<RawPatent, String>) -> crate::error::Result<PendingPatent> {
    let raw = raw.map_err(Error::InvalidRecord)?;
    let patent_id = raw
        .patent_id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::InvalidRecord("missing patent_id".into()))?;
    let date_raw = match raw.publication_date {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => return Err(Error::InvalidRecord(format!("{patent_id}: missing publication_date"))),
    };
    let publication_date = parse_publication_date(&date_raw)
        .ok_or_else(|| Error::InvalidRecord(format!("{patent_id}: unrecognised publication_date '{date_raw}'")))?;
    let abstract_text = raw.abstract_text.unwrap_or_default().trim().to_string();
    let token_count = count_tokens(&abstract_text);
    Ok(PendingPatent {
        patent_id,
        title: raw.title.unwrap_or_default().trim().to_string(),
        abstract_text,
        publication_date,
        token_count,
    })
}

/// Parse a publication date in any of the accepted layouts.
pub fn parse_publication_date(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if s.is_empty() { return None; }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) { return Some(d); }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) { return Some(dt.date_naive()); }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") { return Some(dt.date()); }
    None
}

/// Rough token estimate: words / 0.75.
pub fn count_tokens(text: &str) -> usize {
    let word_count = text.split_whitespace().count();
    (word_count as f32 / 0.75) as usize
}
