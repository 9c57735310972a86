use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use patent_cli::logging::init_file_logging;
use patent_core::config::{expand_path, Config};
use patent_core::data_processor::PatentLoader;
use patent_core::traits::Embedder;
use patent_core::types::PatentRecord;
use patent_embed::embedder_from_settings;
use patent_index::OpenSearchClient;

struct Args {
    data_dir: Option<PathBuf>,
    recreate: bool,
    limit: Option<usize>,
    batch_size: Option<usize>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args { data_dir: None, recreate: false, limit: None, batch_size: None };
    let mut it = env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--recreate" | "-r" => args.recreate = true,
            "--limit" => args.limit = Some(number(it.next(), "--limit")?),
            "--batch-size" => args.batch_size = Some(number(it.next(), "--batch-size")?),
            a if a.starts_with('-') => bail!("unknown option '{a}'"),
            _ => args.data_dir = Some(PathBuf::from(&arg)),
        }
    }
    Ok(args)
}

fn number(value: Option<String>, flag: &str) -> Result<usize> {
    let value = value.with_context(|| format!("{flag} requires a number"))?;
    value.parse().with_context(|| format!("{flag} requires a number, got '{value}'"))
}

fn main() -> Result<()> {
    let args = parse_args()?;
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    if let Err(e) = init_file_logging(&expand_path(&settings.output.logs_dir)) {
        eprintln!("⚠️  File logging disabled: {e:#}");
    }

    let data_dir = args.data_dir.unwrap_or_else(|| expand_path(&settings.data.patents_dir));
    let batch_size = args.batch_size.unwrap_or(settings.data.batch_size).max(1);
    println!("Patent Indexer\n==============");
    println!("Data directory: {}", data_dir.display());
    println!("Index: {} at {}", settings.opensearch.index, settings.opensearch.base_url());

    let loader = match args.limit {
        Some(limit) => { println!("🔢 Limiting to {} records", limit); PatentLoader::with_limit(limit) }
        None => PatentLoader::new(),
    };
    let loaded = loader.load_dir(&data_dir)?;
    for skipped in &loaded.skipped {
        warn!(file = %skipped.file.display(), position = skipped.position, reason = %skipped.reason, "skipped record");
    }
    println!("📄 Loaded {} patents from {} files ({} skipped)", loaded.patents.len(), loaded.files, loaded.skipped.len());
    if loaded.patents.is_empty() {
        println!("Nothing to index.");
        return Ok(());
    }

    let embedder = embedder_from_settings(&settings.embedding, &settings.ollama)?;
    let client = OpenSearchClient::connect(&settings.opensearch)?;

    if args.recreate && client.index_exists()? {
        println!("♻️  Recreating index '{}'", client.index_name());
        client.delete_index()?;
    }
    if !client.index_exists()? {
        client.create_index(embedder.dim())?;
    }

    let pb = ProgressBar::new(loaded.patents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} patents ({percent}%) {msg}")?
            .progress_chars("#>-"),
    );

    let mut indexed = 0usize;
    let mut failed: Vec<(String, String)> = Vec::new();
    for batch in loaded.patents.chunks(batch_size) {
        let texts: Vec<String> = batch.iter().map(|p| p.embedding_text()).collect();
        let vectors = embedder.embed_batch(&texts).context("embedding batch")?;
        if vectors.len() != batch.len() {
            bail!("embedder returned {} vectors for {} patents", vectors.len(), batch.len());
        }
        let records: Vec<PatentRecord> = batch.iter().cloned().zip(vectors).map(|(p, v)| p.into_record(v)).collect();
        let outcome = client.bulk_index(&records)?;
        indexed += outcome.indexed;
        failed.extend(outcome.failed);
        pb.inc(batch.len() as u64);
        pb.set_message(format!("{} failed", failed.len()));
    }
    pb.finish_with_message("done");
    client.refresh()?;

    for (id, reason) in &failed {
        warn!(patent_id = %id, %reason, "bulk item rejected");
    }
    info!(indexed, failed = failed.len(), index = client.index_name(), "indexing finished");
    println!("\n✅ Indexed {} patents into '{}'", indexed, client.index_name());
    if !failed.is_empty() {
        println!("⚠️  {} patents were rejected, see the log for details", failed.len());
    }
    println!("\n💡 To search, use: cargo run --bin patent-cli -- search hybrid '<query>'");
    Ok(())
}
