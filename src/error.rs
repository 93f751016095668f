//! Error types.
//!
//! Only [`SelectError`] crosses the selector's public boundary. Probe
//! failures are absorbed by the detector and verifier.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Selection-level failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    #[error("no suitable backend for source: {0}")]
    NoSuitableBackend(String),
}

/// Network metadata probe failures.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("unsupported or invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Configuration loading failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
