use patent_core::config::Config;
use patent_core::traits::Embedder;
use patent_embed::embedder_from_settings;

fn main() -> anyhow::Result<()> {
    let settings = Config::load()?.settings()?;
    let embedder = embedder_from_settings(&settings.embedding, &settings.ollama)?;
    let texts = vec!["solid state lithium battery".to_string(), "silicon anode binder".to_string()];
    let embs = embedder.embed_batch(&texts)?;
    println!("B={} dim={}", embs.len(), embedder.dim());
    Ok(())
}
