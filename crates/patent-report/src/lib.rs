//! patent-report
//!
//! Runs a fixed chain of LLM stages over the patents retrieved for a research
//! area. Each stage sees the area, the patent listing and the previous
//! stage's output; the last stage's output is the report.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;

use patent_core::config::ReportSettings;
use patent_core::traits::DocumentIndex;
use patent_retrieval::{format_hits_for_llm, RetrievalEngine};

pub mod ollama;

pub use ollama::OllamaClient;

/// Anything that turns a prompt into text.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub name: String,
    pub instruction: String,
}

impl Stage {
    pub fn new(name: &str, instruction: &str) -> Self {
        Self { name: name.to_string(), instruction: instruction.to_string() }
    }
}

/// Researcher, analyst, forecaster, writer.
pub fn default_stages() -> Vec<Stage> {
    vec![
        Stage::new("researcher", "Identify the main technology clusters in the patents below."),
        Stage::new("analyst", "Describe how these clusters have developed over time."),
        Stage::new("forecaster", "Predict which directions are likely to grow in the next few years."),
        Stage::new("writer", "Write a concise innovation trend report from the findings."),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput {
    pub stage: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub area: String,
    pub patent_count: usize,
    pub stages: Vec<StageOutput>,
    pub text: String,
}

pub struct ReportPipeline<'a, I: DocumentIndex> {
    engine: &'a RetrievalEngine<I>,
    generator: &'a dyn TextGenerator,
    stages: Vec<Stage>,
    max_patents: usize,
}

impl<'a, I: DocumentIndex> ReportPipeline<'a, I> {
    pub fn new(engine: &'a RetrievalEngine<I>, generator: &'a dyn TextGenerator) -> Self {
        let max_patents = engine.options().top_k;
        Self { engine, generator, stages: default_stages(), max_patents }
    }

    /// Apply configured stage overrides and the patent cap.
    pub fn with_settings(mut self, settings: &ReportSettings) -> Self {
        if !settings.stages.is_empty() {
            self.stages = settings.stages.iter().map(|s| Stage::new(&s.name, &s.instruction)).collect();
        }
        if let Some(n) = settings.max_patents {
            self.max_patents = n;
        }
        self
    }

    pub fn with_stages(mut self, stages: Vec<Stage>) -> Self {
        self.stages = stages;
        self
    }

    pub fn stages(&self) -> &[Stage] { &self.stages }

    pub fn run(&self, area: &str) -> Result<Report> {
        let area = area.trim();
        if area.is_empty() {
            bail!("research area cannot be empty");
        }
        if self.stages.is_empty() {
            bail!("report pipeline has no stages");
        }

        let hits = self.engine.keyword_search(area, self.max_patents);
        info!(area, patents = hits.len(), stages = self.stages.len(), "starting report");
        let listing = if hits.is_empty() { "No patents found.".to_string() } else { format_hits_for_llm(&hits) };

        let mut outputs: Vec<StageOutput> = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let previous = outputs.last().map(|o| o.text.as_str());
            let prompt = stage_prompt(stage, area, &listing, previous);
            let text = self
                .generator
                .generate(&prompt)
                .with_context(|| format!("report stage '{}' failed", stage.name))?;
            info!(stage = %stage.name, chars = text.len(), "stage finished");
            outputs.push(StageOutput { stage: stage.name.clone(), text });
        }

        let text = outputs.last().map(|o| o.text.clone()).unwrap_or_default();
        Ok(Report { area: area.to_string(), patent_count: hits.len(), stages: outputs, text })
    }
}

fn stage_prompt(stage: &Stage, area: &str, listing: &str, previous: Option<&str>) -> String {
    let mut prompt = format!("{}\n\nResearch area: {area}\n\nPatents:\n{listing}\n", stage.instruction);
    if let Some(prev) = previous {
        prompt.push_str("\nPrevious findings:\n");
        prompt.push_str(prev);
        prompt.push('\n');
    }
    prompt
}

/// Write the report text to `dir/patent_analysis_<YYYYmmdd_HHMMSS>.txt`,
/// creating `dir` if needed.
pub fn save_report(dir: &Path, report: &Report) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("patent_analysis_{stamp}.txt"));
    fs::write(&path, &report.text).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "report saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_stage_prompt_has_no_previous_section() {
        let stage = Stage::new("researcher", "Find clusters.");
        let prompt = stage_prompt(&stage, "Lithium Battery", "1. Title: Cell", None);
        assert!(prompt.starts_with("Find clusters."));
        assert!(prompt.contains("Research area: Lithium Battery"));
        assert!(prompt.contains("1. Title: Cell"));
        assert!(!prompt.contains("Previous findings"));
    }

    #[test]
    fn later_prompts_carry_previous_output() {
        let stage = Stage::new("writer", "Write.");
        let prompt = stage_prompt(&stage, "x", "", Some("clusters: A, B"));
        assert!(prompt.ends_with("Previous findings:\nclusters: A, B\n"));
    }

    #[test]
    fn default_chain_order() {
        let names: Vec<String> = default_stages().into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["researcher", "analyst", "forecaster", "writer"]);
    }
}
