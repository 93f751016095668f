//! Configuration loaded from `~/.config/mediapick/config.toml`.
//!
//! Every key is optional; a missing file means all defaults.
//!
//! ```toml
//! [cache]
//! ttl_secs = 300
//! max_entries = 100
//!
//! [verify]
//! max_retries = 1
//! trusted_domains = ["cdn.example.com"]
//!
//! [select]
//! preferred = ["adaptive-dash"]
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::BackendRegistry;
use crate::cache::{spawn_sweeper_if_runtime, ResultCache, DEFAULT_MAX_ENTRIES};
use crate::detect::ContentTypeDetector;
use crate::env::{HostEnvironment, StaticEnvironment};
use crate::error::{ConfigError, ProbeError};
use crate::net::HttpProbe;
use crate::select::{EngineSelector, SelectOptions};
use crate::types::BackendId;
use crate::verify::{HttpTrialLoader, LoadVerifier, Preload, VerifyOptions, DEFAULT_MAX_CONCURRENT};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_entries: usize,
    /// Background expiry sweep period. `0` disables the sweeper.
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_entries: DEFAULT_MAX_ENTRIES,
            sweep_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
    pub probe_timeout_ms: u64,
    /// `false` keeps detection to URL heuristics.
    pub network_probe: bool,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 3000,
            network_probe: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub max_file_size: u64,
    pub trusted_domains: Vec<String>,
    pub security_check: bool,
    pub preload: Preload,
    pub max_concurrent: usize,
    pub batch_size: usize,
    pub batch_pause_ms: u64,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            max_retries: 2,
            retry_delay_ms: 1000,
            max_file_size: 50 * 1024 * 1024,
            trusted_domains: Vec::new(),
            security_check: true,
            preload: Preload::Metadata,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            batch_size: 3,
            batch_pause_ms: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectConfig {
    pub use_cache: bool,
    pub load_test: bool,
    pub fallback_to_native: bool,
    pub preferred: Vec<String>,
}

impl Default for SelectConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            load_test: false,
            fallback_to_native: true,
            preferred: Vec::new(),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediapickConfig {
    pub cache: CacheConfig,
    pub detect: DetectConfig,
    pub verify: VerifyConfig,
    pub select: SelectConfig,
    /// Host hints for the verifier's environment gate.
    pub environment: HostEnvironment,
}

impl MediapickConfig {
    /// Load from the default location. Missing file means defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    #[must_use]
    pub fn verify_options(&self) -> VerifyOptions {
        let v = &self.verify;
        VerifyOptions::default()
            .with_timeout(Duration::from_millis(v.timeout_ms))
            .with_retries(v.max_retries, Duration::from_millis(v.retry_delay_ms))
            .with_max_file_size(v.max_file_size)
            .with_trusted_domains(v.trusted_domains.iter().cloned())
            .with_security_check(v.security_check)
            .with_preload(v.preload)
    }

    #[must_use]
    pub fn select_options(&self) -> SelectOptions {
        let s = &self.select;
        SelectOptions {
            use_cache: s.use_cache,
            load_test: s.load_test,
            verify: self.verify_options(),
            preferred: s.preferred.iter().cloned().map(BackendId::custom).collect(),
            fallback_to_native: s.fallback_to_native,
        }
    }

    #[must_use]
    pub fn cache(&self) -> ResultCache {
        ResultCache::with_limits(Duration::from_secs(self.cache.ttl_secs), self.cache.max_entries)
    }

    /// Sweeper period, `None` when disabled.
    #[must_use]
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.cache.sweep_interval_secs > 0).then(|| Duration::from_secs(self.cache.sweep_interval_secs))
    }

    pub fn detector(&self) -> Result<ContentTypeDetector, ProbeError> {
        let detector = if self.detect.network_probe {
            ContentTypeDetector::new(Arc::new(HttpProbe::new()?))
        } else {
            ContentTypeDetector::offline()
        };
        Ok(detector.with_timeout(Duration::from_millis(self.detect.probe_timeout_ms)))
    }

    pub fn verifier(&self) -> Result<LoadVerifier, ProbeError> {
        Ok(LoadVerifier::new(Arc::new(HttpTrialLoader::new()?))
            .with_probe(Arc::new(HttpProbe::new()?))
            .with_environment(Arc::new(StaticEnvironment(self.environment.clone())))
            .with_max_concurrent(self.verify.max_concurrent)
            .with_batching(self.verify.batch_size, Duration::from_millis(self.verify.batch_pause_ms)))
    }

    /// Selector over the built-in backends wired from this configuration.
    ///
    /// Inside a tokio runtime the cache sweeper is started as well, unless
    /// `sweep_interval_secs = 0`.
    pub fn selector(&self) -> Result<EngineSelector, ProbeError> {
        let cache = Arc::new(self.cache());
        if let Some(every) = self.sweep_interval() {
            spawn_sweeper_if_runtime(&cache, every);
        }
        Ok(EngineSelector::new(
            BackendRegistry::with_builtins(),
            cache,
            Arc::new(self.detector()?),
            Arc::new(self.verifier()?),
        ))
    }
}

/// Path of the default config file.
#[must_use]
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mediapick")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config: MediapickConfig = toml::from_str("").unwrap();
        assert_eq!(config, MediapickConfig::default());
        assert_eq!(config.verify_options(), VerifyOptions::default());
        assert_eq!(config.select_options(), SelectOptions::default());
        assert_eq!(config.sweep_interval(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: MediapickConfig = toml::from_str(
            r#"
[cache]
ttl_secs = 60
sweep_interval_secs = 0

[verify]
max_retries = 0
trusted_domains = ["cdn.example.com"]
preload = "full"

[select]
load_test = true
preferred = ["adaptive-dash", "native"]

[environment]
visible = false
"#,
        )
        .unwrap();

        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.cache.max_entries, 100);
        assert_eq!(config.sweep_interval(), None);

        let verify = config.verify_options();
        assert_eq!(verify.max_retries, 0);
        assert_eq!(verify.timeout, Duration::from_secs(5));
        assert_eq!(verify.trusted_domains, vec!["cdn.example.com".to_string()]);
        assert_eq!(verify.preload, Preload::Full);

        let select = config.select_options();
        assert!(select.load_test);
        assert_eq!(select.preferred, vec![BackendId::ADAPTIVE_DASH, BackendId::NATIVE]);
        assert!(config.environment.is_constrained());
    }

    #[test]
    fn load_from_reports_path_on_errors() {
        let dir = std::env::temp_dir().join(format!("mediapick-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let missing = dir.join("missing.toml");
        let err = MediapickConfig::load_from(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("missing.toml"));

        let bad = dir.join("bad.toml");
        std::fs::write(&bad, "[cache]\nttl_secs = \"soon\"\n").unwrap();
        let err = MediapickConfig::load_from(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let good = dir.join("good.toml");
        std::fs::write(&good, "[detect]\nnetwork_probe = false\n").unwrap();
        let config = MediapickConfig::load_from(&good).unwrap();
        assert!(!config.detect.network_probe);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn selector_sweeps_expired_entries() {
        let config: MediapickConfig =
            toml::from_str("[cache]\nttl_secs = 1\nsweep_interval_secs = 1\n").unwrap();
        let selector = config.selector().unwrap();
        selector
            .cache()
            .set(
                "clip.mp4",
                crate::cache::CacheEntry::new(BackendId::NATIVE, true, crate::types::Confidence::High, None),
            )
            .await;

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(selector.cache_stats().await.size, 0);
    }

    #[test]
    fn selector_outside_runtime_skips_sweeper() {
        let config = MediapickConfig::default();
        assert!(config.selector().is_ok());
    }

    #[test]
    fn config_path_ends_with_app_dir() {
        assert!(config_path().ends_with("mediapick/config.toml"));
    }
}
