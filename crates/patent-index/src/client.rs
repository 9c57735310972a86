//! Blocking OpenSearch client with timeout, gzip and retry-on-timeout.
//!
//! Build one with [`OpenSearchClient::connect`] at startup and share it (it is
//! cheap to clone and safe to use from several threads).

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use patent_core::config::OpenSearchSettings;
use patent_core::error::{Error, Result};
use patent_core::query::SearchRequest;
use patent_core::traits::DocumentIndex;
use patent_core::types::{PatentHit, PatentRecord};

use crate::{dsl, mapping};

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterInfo {
    pub cluster_name: String,
    pub version: VersionInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    pub number: String,
}

/// One row of `_cat/indices`.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexStats {
    pub index: String,
    #[serde(rename = "docs.count", default)]
    pub docs_count: Option<String>,
    #[serde(default)]
    pub health: Option<String>,
}

#[derive(Debug, Default)]
pub struct BulkOutcome {
    pub indexed: usize,
    pub failed: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<PatentHit>,
}

#[derive(Deserialize)]
struct BulkResponse {
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct OpenSearchClient {
    http: Client,
    base_url: String,
    index: String,
    max_retries: u32,
    retry_on_timeout: bool,
    auth: Option<(String, Option<String>)>,
}

impl OpenSearchClient {
    pub fn new(settings: &OpenSearchSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .gzip(settings.compress)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("building HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: settings.base_url(),
            index: settings.index.clone(),
            max_retries: settings.max_retries,
            retry_on_timeout: settings.retry_on_timeout,
            auth: settings.username.clone().map(|u| (u, settings.password.clone())),
        })
    }

    /// Build, ping, and log cluster name and version. Fails when the cluster
    /// does not answer.
    pub fn connect(settings: &OpenSearchSettings) -> Result<Self> {
        let client = Self::new(settings)?;
        if !client.ping() {
            return Err(Error::IndexUnavailable(format!("no answer from {}", client.base_url)));
        }
        let info = client.info()?;
        info!(cluster = %info.cluster_name, version = %info.version.number, url = %client.base_url, "connected to OpenSearch");
        Ok(client)
    }

    pub fn index_name(&self) -> &str { &self.index }

    pub fn base_url(&self) -> &str { &self.base_url }

    pub fn ping(&self) -> bool {
        match self.send(Method::HEAD, "/", None) {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(error = %e, "ping failed");
                false
            }
        }
    }

    pub fn info(&self) -> Result<ClusterInfo> {
        let resp = self.checked(Method::GET, "/", None)?;
        decode(resp)
    }

    pub fn cat_indices(&self) -> Result<Vec<IndexStats>> {
        let resp = self.checked(Method::GET, "/_cat/indices?format=json", None)?;
        decode(resp)
    }

    pub fn index_exists(&self) -> Result<bool> {
        let resp = self.send(Method::HEAD, &format!("/{}", self.index), None)?;
        match resp.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(status_error(s, String::new())),
        }
    }

    pub fn create_index(&self, dimension: usize) -> Result<()> {
        let body = mapping::patent_index_body(dimension);
        self.checked(Method::PUT, &format!("/{}", self.index), Some(Body::Json(&body)))?;
        info!(index = %self.index, dimension, "created index");
        Ok(())
    }

    pub fn delete_index(&self) -> Result<()> {
        self.checked(Method::DELETE, &format!("/{}", self.index), None)?;
        info!(index = %self.index, "deleted index");
        Ok(())
    }

    pub fn refresh(&self) -> Result<()> {
        self.checked(Method::POST, &format!("/{}/_refresh", self.index), None)?;
        Ok(())
    }

    pub fn bulk_index(&self, records: &[PatentRecord]) -> Result<BulkOutcome> {
        if records.is_empty() { return Ok(BulkOutcome::default()); }
        let body = mapping::bulk_body(&self.index, records).map_err(|e| Error::InvalidRecord(e.to_string()))?;
        let resp = self.checked(Method::POST, "/_bulk", Some(Body::NdJson(body)))?;
        let parsed: BulkResponse = decode(resp)?;
        Ok(bulk_outcome(&parsed.items))
    }

    fn checked(&self, method: Method, path: &str, body: Option<Body<'_>>) -> Result<Response> {
        let resp = self.send(method, path, body)?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let text = resp.text().unwrap_or_default();
        Err(status_error(status, text))
    }

    /// Send with retries on transport timeouts only.
    fn send(&self, method: Method, path: &str, body: Option<Body<'_>>) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0u32;
        loop {
            let mut req: RequestBuilder = self.http.request(method.clone(), &url);
            if let Some((user, pass)) = &self.auth {
                req = req.basic_auth(user, pass.as_ref());
            }
            req = match &body {
                Some(Body::Json(v)) => req.json(v),
                Some(Body::NdJson(s)) => req.header("Content-Type", "application/x-ndjson").body(s.clone()),
                None => req,
            };
            match req.send() {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_timeout() && self.retry_on_timeout && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(%url, attempt, max = self.max_retries, "OpenSearch request timed out, retrying");
                }
                Err(e) => return Err(Error::IndexUnavailable(format!("{method} {url}: {e}"))),
            }
        }
    }
}

enum Body<'a> {
    Json(&'a Value),
    NdJson(String),
}

impl DocumentIndex for OpenSearchClient {
    fn search(&self, request: &SearchRequest) -> Result<Vec<PatentHit>> {
        let body = dsl::render(request);
        debug!(index = %self.index, size = request.size, knn = request.has_knn(), "search");
        let resp = self.checked(Method::POST, &format!("/{}/_search", self.index), Some(Body::Json(&body)))?;
        let parsed: SearchResponse = decode(resp)?;
        Ok(parsed.hits.hits)
    }
}

fn decode<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T> {
    let text = resp.text().map_err(|e| Error::IndexUnavailable(format!("reading response: {e}")))?;
    parse_json(&text)
}

fn parse_json<T: serde::de::DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| Error::Query(format!("unexpected response: {e}")))
}

/// 5xx means the cluster is unhealthy; anything else was a bad request.
fn status_error(status: StatusCode, body: String) -> Error {
    let msg = format!("HTTP {status}: {}", body.chars().take(500).collect::<String>());
    if status.is_server_error() { Error::IndexUnavailable(msg) } else { Error::Query(msg) }
}

fn bulk_outcome(items: &[Value]) -> BulkOutcome {
    let mut outcome = BulkOutcome::default();
    for item in items {
        let Some(action) = item.as_object().and_then(|o| o.values().next()) else { continue };
        let id = action.get("_id").and_then(Value::as_str).unwrap_or_default().to_string();
        match action.get("error") {
            Some(err) if !err.is_null() => {
                let reason = err.get("reason").and_then(Value::as_str).map(str::to_string).unwrap_or_else(|| err.to_string());
                outcome.failed.push((id, reason));
            }
            _ => outcome.indexed += 1,
        }
    }
    outcome
}
