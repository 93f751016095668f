use anyhow::{Context, Result};

use mediapick::MediapickConfig;

use super::output::{print_content_type, print_json};
use crate::OutputFormat;

pub async fn cmd_detect(config: &MediapickConfig, source: &str, format: OutputFormat) -> Result<()> {
    let detector = config.detector().context("building detector")?;
    let info = detector.detect(source).await;

    match (format, info) {
        (OutputFormat::Json, info) => print_json(&info)?,
        (OutputFormat::Text, Some(info)) => {
            println!("🔍 Source: {source}");
            print_content_type(&info);
        }
        (OutputFormat::Text, None) => println!("🔍 Source: {source}\n   Type: unknown"),
    }
    Ok(())
}
