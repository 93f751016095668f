//! `mediapick` - playback engine selection for media sources
//!
//! # Features
//!
//! - **Selection**: cache, URL-shape fast path, content-type detection,
//!   capability ranking and native fallback
//! - **Detection**: extension and platform heuristics, `Content-Type` probes
//! - **Verification**: bounded trial loads with retries, security
//!   screening and a global concurrency ceiling
//! - **Caching**: TTL-bounded, capacity-bounded result memo
//!
//! # Example
//!
//! ```rust,no_run
//! use mediapick::{EngineSelector, SelectOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let selector = EngineSelector::http()?;
//!     let selection = selector
//!         .select("https://example.com/live/master.m3u8", &SelectOptions::default())
//!         .await?;
//!     println!("{} ({})", selection.detection.backend, selection.detection.reason);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod detect;
pub mod env;
pub mod error;
pub mod net;
pub mod select;
pub mod types;
pub mod verify;

pub use backend::{BackendRegistry, PlaybackBackend};
pub use cache::{CacheEntry, CacheStats, ResultCache};
pub use config::MediapickConfig;
pub use detect::ContentTypeDetector;
pub use env::{EnvironmentSource, HostEnvironment, NetworkInfo, StaticEnvironment};
pub use error::{ConfigError, ProbeError, SelectError};
pub use net::{HttpProbe, MetadataProbe};
pub use select::{EngineSelector, SelectOptions, Selection};
pub use types::{
    BackendId, Confidence, ContentTypeInfo, DetectionResult, LoadStatus, LoadTestResult,
    SecurityCheck, SecurityIssue,
};
pub use verify::{LoadVerifier, Preload, TrialLoader, VerifierStats, VerifyOptions};

/// Version of mediapick
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
