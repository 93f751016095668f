use std::time::Duration;

use anyhow::{Context, Result};

use mediapick::MediapickConfig;

use super::output::{print_json, print_load_test};
use crate::OutputFormat;

pub async fn cmd_verify(
    config: &MediapickConfig,
    source: &str,
    quick: bool,
    format: OutputFormat,
) -> Result<()> {
    let verifier = config.verifier().context("building verifier")?;

    if quick {
        let ok = verifier
            .quick_check(source, Duration::from_millis(config.verify.timeout_ms))
            .await;
        match format {
            OutputFormat::Json => print_json(&serde_json::json!({ "source": source, "can_load": ok }))?,
            OutputFormat::Text => println!("{}", if ok { "✅ loads" } else { "❌ does not load" }),
        }
        return Ok(());
    }

    let result = verifier.verify(source, &config.verify_options()).await;
    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Text => {
            println!("🧪 Source: {source}");
            print_load_test(&result);
        }
    }
    Ok(())
}
