use std::path::Path;
use std::time::Instant;

use anyhow::{bail, Context, Result};

use mediapick::MediapickConfig;

use super::output::{print_json, print_load_test};
use crate::OutputFormat;

fn read_sources(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read batch file '{}'", path.display()))?;

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

pub async fn cmd_batch(config: &MediapickConfig, path: &Path, format: OutputFormat) -> Result<()> {
    let sources = read_sources(path)?;
    if sources.is_empty() {
        bail!("no sources found in batch file: {}", path.display());
    }

    let verifier = config.verifier().context("building verifier")?;
    eprintln!(
        "📦 Verifying {} sources (concurrency: {}, batch: {})",
        sources.len(),
        config.verify.max_concurrent,
        config.verify.batch_size
    );

    let start = Instant::now();
    let results = verifier.verify_many(&sources, &config.verify_options()).await;
    let loaded = results.iter().filter(|(_, r)| r.can_load).count();

    match format {
        OutputFormat::Json => {
            let rows: Vec<_> = results
                .iter()
                .map(|(source, result)| serde_json::json!({ "source": source, "result": result }))
                .collect();
            print_json(&rows)?;
        }
        OutputFormat::Text => {
            for (source, result) in &results {
                println!("\n🧪 {source}");
                print_load_test(result);
            }
        }
    }

    eprintln!(
        "\n📊 {loaded}/{} loaded in {:.2}s",
        results.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
