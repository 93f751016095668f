use std::time::Instant;

use anyhow::{Context, Result};

use mediapick::MediapickConfig;

use super::output::{print_detection, print_json};
use crate::OutputFormat;

pub async fn cmd_select(config: &MediapickConfig, source: &str, format: OutputFormat) -> Result<()> {
    let selector = config.selector().context("building selector")?;
    let start = Instant::now();
    let selection = selector.select(source, &config.select_options()).await?;
    let elapsed = start.elapsed();

    match format {
        OutputFormat::Json => print_json(&selection.detection)?,
        OutputFormat::Text => {
            println!("🎬 Source: {source}");
            print_detection(&selection.detection);
            println!("   Time: {:.2}ms", elapsed.as_secs_f64() * 1000.0);
        }
    }
    Ok(())
}

pub fn cmd_fast(config: &MediapickConfig, source: &str, format: OutputFormat) -> Result<()> {
    let mut offline = config.clone();
    offline.detect.network_probe = false;
    let selector = offline.selector().context("building selector")?;
    let backend = selector.select_fast(source)?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "source": source,
            "backend": backend.identity(),
        }))?,
        OutputFormat::Text => println!("{}", backend.identity()),
    }
    Ok(())
}
