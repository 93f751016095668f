use anyhow::Result;
use serde::Serialize;

use mediapick::{ContentTypeInfo, DetectionResult, LoadTestResult};

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_content_type(info: &ContentTypeInfo) {
    println!("   Type: {}", info.mime_type);
    if let Some(codecs) = &info.codecs {
        println!("   Codecs: {}", codecs.join(", "));
    }
    println!("   Container: {}", info.container);
    println!("   Confidence: {} ({})", info.confidence, info.origin);
}

pub fn print_detection(detection: &DetectionResult) {
    let mark = if detection.can_play { "✅" } else { "⚠️ " };
    println!("{mark} Backend: {}", detection.backend);
    println!("   Confidence: {}", detection.confidence);
    println!("   Reason: {}", detection.reason);
    if let Some(info) = &detection.content_type {
        print_content_type(info);
    }
    if let Some(trial) = &detection.load_test {
        print_load_test(trial);
    }
}

pub fn print_load_test(result: &LoadTestResult) {
    let mark = if result.can_load { "✅" } else { "❌" };
    println!("{mark} Load test: {:?} in {}ms", result.status, result.load_time_ms);
    if result.retry_count > 0 {
        println!("   Retries: {}", result.retry_count);
    }
    if let Some(container) = &result.container {
        println!("   Container: {container}");
    }
    if let Some(secs) = result.media_duration_secs {
        println!("   Duration: {secs:.2}s");
    }
    if let Some(dims) = result.dimensions {
        println!("   Dimensions: {}x{}", dims.width, dims.height);
    }
    if let Some(check) = result.security_check.as_ref().filter(|c| !c.passed) {
        println!("   Security: {}", check.summary());
    }
    if let Some(error) = &result.error {
        println!("   Error: {error}");
    }
}
