use std::env;
use std::io::{self, BufRead, Write};

use anyhow::Result;
use tracing::{error, info, warn};

use patent_cli::args::{parse_command, Command, USAGE};
use patent_cli::display::{render_hits, render_rounds, RULE};
use patent_cli::logging::init_file_logging;
use patent_cli::UnavailableEmbedder;
use patent_core::config::{expand_path, Config, Settings};
use patent_core::traits::Embedder;
use patent_embed::embedder_from_settings;
use patent_index::OpenSearchClient;
use patent_report::{save_report, OllamaClient, ReportPipeline};
use patent_retrieval::{RetrievalEngine, RetrievalOptions, SearchMode};

const DEFAULT_AREA: &str = "Lithium Battery";
const BANNER: &str = "============================================================";

struct App {
    settings: Settings,
    opensearch: OpenSearchClient,
    ollama: OllamaClient,
    engine: RetrievalEngine<OpenSearchClient>,
}

impl App {
    fn new(settings: Settings) -> Result<Self> {
        let opensearch = OpenSearchClient::new(&settings.opensearch)?;
        let ollama = OllamaClient::new(&settings.ollama)?;
        let embedder: Box<dyn Embedder> = match embedder_from_settings(&settings.embedding, &settings.ollama) {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "embedding model unavailable, semantic search disabled");
                Box::new(UnavailableEmbedder::new(format!("{e:#}"), settings.embedding.dimension))
            }
        };
        let engine = RetrievalEngine::new(opensearch.clone(), embedder, RetrievalOptions::from(&settings.search));
        Ok(Self { settings, opensearch, ollama, engine })
    }

    fn search(&self, mode: SearchMode, query: &str, top_k: Option<usize>) {
        let top_k = top_k.unwrap_or(self.settings.search.top_k);
        info!(%mode, query, top_k, "search");
        let hits = self.engine.search(mode, query, top_k);
        print!("{}", render_hits(&hits, true));
    }

    fn iterate(&self, query: &str, steps: Option<usize>, top_k: Option<usize>) {
        let steps = steps.unwrap_or(self.settings.search.refinement_steps);
        let top_k = top_k.unwrap_or(self.settings.search.top_k);
        info!(query, steps, top_k, "iterative exploration");
        let outcome = self.engine.iterative_search_traced(query, steps, top_k);
        print!("\n{}", render_rounds(&outcome.rounds));
        print!("{}", render_hits(&outcome.hits, false));
    }

    fn report(&self, area: &str, model: Option<&str>) -> Result<()> {
        let model = model.unwrap_or(&self.settings.ollama.model);
        println!("\nAnalyzing patents for: {area}");
        println!("Using Ollama model: {model}");
        let generator = self.ollama.clone().with_model(model);
        let report = ReportPipeline::new(&self.engine, &generator).with_settings(&self.settings.report).run(area)?;
        let path = save_report(&expand_path(&self.settings.output.reports_dir), &report)?;

        println!("\n✅ Analysis completed and saved to {}", path.display());
        println!("\n{BANNER}\nANALYSIS SUMMARY\n{RULE}");
        let preview: String = report.text.chars().take(500).collect();
        println!("{preview}...\n");
        Ok(())
    }

    fn status(&self) {
        println!("\nSYSTEM STATUS\n{RULE}");
        if self.opensearch.ping() {
            println!("✅ OpenSearch connection: OK ({})", self.opensearch.base_url());
            match self.opensearch.cat_indices() {
                Ok(indices) => {
                    for index in indices {
                        println!("   - {}: {} documents", index.index, index.docs_count.as_deref().unwrap_or("?"));
                    }
                }
                Err(e) => println!("   could not list indices: {e}"),
            }
        } else {
            error!(url = %self.opensearch.base_url(), "OpenSearch unreachable");
            println!("❌ OpenSearch connection: Failed ({})", self.opensearch.base_url());
        }

        match self.ollama.list_models() {
            Ok(models) => {
                println!("✅ Ollama connection: OK");
                println!("   Models: {}", models.join(", "));
            }
            Err(e) => {
                error!(error = %e, "Ollama status check failed");
                println!("❌ Ollama connection: Failed - {e:#}");
            }
        }

        match self.engine.embedder().embed("test") {
            Ok(v) => println!("✅ Embedding model: OK (dimension: {})", v.len()),
            Err(e) => {
                error!(error = %e, "embedding check failed");
                println!("❌ Embedding model: Failed - {e:#}");
            }
        }
        println!("\nSystem is ready for operation.");
    }

    fn models(&self) {
        println!("\nAVAILABLE OLLAMA MODELS\n{RULE}");
        match self.ollama.list_models() {
            Ok(models) if !models.is_empty() => {
                for (i, model) in models.iter().enumerate() {
                    println!("{}. {model}", i + 1);
                }
            }
            Ok(_) => println!("No models found. Please ensure Ollama is running."),
            Err(e) => {
                error!(error = %e, "failed to fetch Ollama models");
                println!("❌ Error fetching models: {e:#}");
            }
        }
    }

    fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Menu => self.menu()?,
            Command::Search { mode, query, top_k } => self.search(mode, &query, top_k),
            Command::Iterate { query, steps, top_k } => self.iterate(&query, steps, top_k),
            Command::Report { area, model } => self.report(&area, model.as_deref())?,
            Command::Status => self.status(),
            Command::Models => self.models(),
            Command::Help => println!("{USAGE}"),
        }
        Ok(())
    }

    fn menu(&self) -> Result<()> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        loop {
            println!("\n{BANNER}");
            println!("  PATENT INNOVATION PREDICTOR");
            println!("{BANNER}");
            println!("1. Run complete patent trend analysis and forecasting");
            println!("2. Search for specific patents");
            println!("3. Iterative patent exploration");
            println!("4. View system status");
            println!("5. View available Ollama models");
            println!("6. Exit");
            println!("{RULE}");
            let Some(choice) = prompt(&mut input, "Select an option (1-6): ")? else { break };
            match choice.as_str() {
                "1" => {
                    let Some(area) = prompt(&mut input, &format!("Enter research area (default: {DEFAULT_AREA}): "))? else { break };
                    let area = if area.is_empty() { DEFAULT_AREA.to_string() } else { area };
                    let default_model = self.settings.ollama.model.clone();
                    let Some(model) = prompt(&mut input, &format!("Enter the Ollama model to use (default: {default_model}): "))? else { break };
                    let model = if model.is_empty() { default_model } else { model };
                    if let Err(e) = self.report(&area, Some(&model)) {
                        error!(error = %e, "report failed");
                        println!("❌ Error during analysis: {e:#}");
                    }
                }
                "2" => {
                    println!("\nPATENT SEARCH\n{RULE}");
                    let Some(query) = prompt(&mut input, "Enter search query: ")? else { break };
                    if query.is_empty() {
                        println!("Search query cannot be empty.");
                        continue;
                    }
                    let Some(kind) = prompt(&mut input, "Select search type (1: Keyword, 2: Semantic, 3: Hybrid) [3]: ")? else { break };
                    let mode = kind.parse().unwrap_or(SearchMode::Hybrid);
                    self.search(mode, &query, None);
                }
                "3" => {
                    println!("\nITERATIVE PATENT EXPLORATION\n{RULE}");
                    let Some(query) = prompt(&mut input, "Enter initial exploration query: ")? else { break };
                    if query.is_empty() {
                        println!("Query cannot be empty.");
                        continue;
                    }
                    let default_steps = self.settings.search.refinement_steps;
                    let Some(steps) = prompt(&mut input, &format!("Number of exploration steps (default: {default_steps}): "))? else { break };
                    self.iterate(&query, Some(steps.parse().unwrap_or(default_steps)), None);
                }
                "4" => self.status(),
                "5" => self.models(),
                "6" => break,
                _ => println!("Invalid option. Please select 1-6."),
            }
        }
        println!("\nExiting Patent Innovation Predictor. Goodbye!");
        Ok(())
    }
}

/// Print `label`, read one trimmed line. `None` on end of input.
fn prompt(input: &mut impl BufRead, label: &str) -> Result<Option<String>> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn main() -> Result<()> {
    let command = match parse_command(env::args().skip(1)) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {msg}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    if let Err(e) = init_file_logging(&expand_path(&settings.output.logs_dir)) {
        eprintln!("⚠️  File logging disabled: {e:#}");
    }
    info!(env = config.env_name(), "patent-cli starting");

    let app = App::new(settings)?;
    app.run(command)
}
