//! Text generation and model listing against a local Ollama host.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use patent_core::config::OllamaSettings;

use crate::TextGenerator;

const TAGS_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::blocking::Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    pub fn new(settings: &OllamaSettings) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("building Ollama HTTP client")?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
        })
    }

    /// Same host, different generation model.
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn model(&self) -> &str { &self.model }

    pub fn base_url(&self) -> &str { &self.base_url }

    /// Names of the models installed on the host.
    pub fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = self
            .http
            .get(&url)
            .timeout(TAGS_TIMEOUT)
            .send()
            .with_context(|| format!("Ollama unreachable at {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("Ollama returned {status} for /api/tags"));
        }
        let text = resp.text().context("reading /api/tags response")?;
        model_names(&text)
    }
}

impl TextGenerator for OllamaClient {
    fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        debug!(model = %self.model, prompt_chars = prompt.len(), "ollama generate");
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature: self.temperature },
        };
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .with_context(|| format!("Ollama unreachable at {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            warn!(%status, model = %self.model, "generation failed");
            return Err(anyhow!("Ollama returned {status}: {body}"));
        }
        let parsed: GenerateResponse = resp.json().context("decoding Ollama generate response")?;
        Ok(parsed.response)
    }
}

fn model_names(body: &str) -> Result<Vec<String>> {
    let parsed: TagsResponse = serde_json::from_str(body).context("decoding /api/tags response")?;
    Ok(parsed.models.into_iter().filter_map(|m| m.name).filter(|n| !n.is_empty()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_keep_named_models_only() {
        let body = r#"{"models":[{"name":"llama2:latest","size":1},{"size":2},{"name":""},{"name":"bge-m3"}]}"#;
        assert_eq!(model_names(body).unwrap(), vec!["llama2:latest", "bge-m3"]);
        assert!(model_names("{}").unwrap().is_empty());
        assert!(model_names("not json").is_err());
    }

    #[test]
    fn generate_request_disables_streaming() {
        let body = GenerateRequest { model: "llama2", prompt: "hi", stream: false, options: GenerateOptions { temperature: 0.2 } };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["stream"], serde_json::json!(false));
        assert_eq!(value["model"], serde_json::json!("llama2"));
        assert!((value["options"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn client_uses_configured_model_and_trims_url() {
        let settings = OllamaSettings { base_url: "http://localhost:11434/".into(), ..OllamaSettings::default() };
        let client = OllamaClient::new(&settings).unwrap().with_model("mistral");
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.model(), "mistral");
    }

    #[test]
    fn unreachable_host_is_an_error() {
        let settings = OllamaSettings { base_url: "http://127.0.0.1:1".into(), timeout_secs: 1, ..OllamaSettings::default() };
        let client = OllamaClient::new(&settings).unwrap();
        assert!(client.list_models().is_err());
        assert!(client.generate("hello").is_err());
    }
}
