//! Layered configuration and path helpers.
//!
//! Figment merges compiled-in defaults, `config.toml`, `config.<env>.toml` and
//! `APP_*` environment variables (`__` separates nested keys, e.g.
//! `APP_OPENSEARCH__PORT=9201`). A missing file is not an error.

use chrono::NaiveDate;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::types::DateRange;

pub struct Config {
    figment: Figment,
    env_name: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Load with config files looked up in `dir`.
    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, env_name };
        config.validate_for_env()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment, env_name: "custom".to_string() }
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self) -> anyhow::Result<()> {
        let settings = self.settings()?;
        if matches!(self.env_name.as_str(), "prod" | "production") && settings.embedding.provider == EmbeddingProvider::Fake {
            return Err(Error::InvalidConfig("fake embeddings are not allowed in production".into()).into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub opensearch: OpenSearchSettings,
    pub embedding: EmbeddingSettings,
    pub search: SearchSettings,
    pub ollama: OllamaSettings,
    pub output: OutputSettings,
    pub data: DataSettings,
    pub report: ReportSettings,
}

impl Settings {
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.opensearch.index.trim().is_empty() {
            return Err(Error::InvalidConfig("opensearch.index must not be empty".into()));
        }
        if self.embedding.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be positive".into()));
        }
        if self.search.top_k == 0 || self.search.refinement_steps == 0 {
            return Err(Error::InvalidConfig("search.top_k and search.refinement_steps must be positive".into()));
        }
        if let (Some(from), Some(to)) = (self.search.date_from, self.search.date_to) {
            if from > to {
                return Err(Error::InvalidConfig(format!("search.date_from {from} is after search.date_to {to}")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenSearchSettings {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub index: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_on_timeout: bool,
    pub compress: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for OpenSearchSettings {
    fn default() -> Self {
        Self {
            scheme: "http".into(),
            host: "localhost".into(),
            port: 9200,
            index: "patents".into(),
            timeout_secs: 30,
            max_retries: 3,
            retry_on_timeout: true,
            compress: true,
            username: None,
            password: None,
        }
    }
}

impl OpenSearchSettings {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Local,
    Ollama,
    Fake,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    pub model_dir: Option<String>,
    pub dimension: usize,
    pub max_len: usize,
    pub ollama_model: String,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Local,
            model_dir: None,
            dimension: 1024,
            max_len: 256,
            ollama_model: "bge-m3".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub top_k: usize,
    pub refinement_steps: usize,
    pub max_query_chars: usize,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { top_k: 20, refinement_steps: 3, max_query_chars: 512, date_from: None, date_to: None }
    }
}

impl SearchSettings {
    pub fn date_range(&self) -> Option<DateRange> {
        DateRange::new(self.date_from, self.date_to)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self { base_url: "http://localhost:11434".into(), model: "llama2".into(), temperature: 0.2, timeout_secs: 300 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub dir: String,
    pub reports_dir: String,
    pub logs_dir: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self { dir: "output".into(), reports_dir: "output/patent_analysis".into(), logs_dir: "output/logs".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub patents_dir: String,
    pub batch_size: usize,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { patents_dir: "data/patents".into(), batch_size: 256 }
    }
}

/// Stage overrides for the report chain. Empty means built-in stages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub stages: Vec<StageSettings>,
    pub max_patents: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSettings {
    pub name: String,
    pub instruction: String,
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
