//! Plain data shared by the detector, verifier and selector.
//!
//! Everything here is `Serialize`/`Deserialize` and carries no live
//! handles, so results can be logged, cached or printed as JSON as-is.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::env::NetworkInfo;

/// Stable short name of a playback backend.
///
/// Used as the registry lookup key and as the cached identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendId(Cow<'static, str>);

impl BackendId {
    pub const ADAPTIVE_HLS: Self = Self(Cow::Borrowed("adaptive-hls"));
    pub const ADAPTIVE_DASH: Self = Self(Cow::Borrowed("adaptive-dash"));
    pub const EMBED_YOUTUBE: Self = Self(Cow::Borrowed("embed-youtube"));
    pub const EMBED_VIMEO: Self = Self(Cow::Borrowed("embed-vimeo"));
    pub const REALTIME: Self = Self(Cow::Borrowed("realtime-webrtc"));
    pub const NATIVE: Self = Self(Cow::Borrowed("native"));

    /// Identity for a caller-defined backend.
    pub fn custom(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How much a verdict can be trusted. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Where a [`ContentTypeInfo`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeOrigin {
    /// Trailing file extension of the URL path.
    UrlExtension,
    /// A known platform URL shape (e.g. a video-sharing site).
    PlatformUrl,
    /// A streaming path convention such as `/hls/`.
    StreamingPath,
    /// `Content-Type` header of a metadata probe.
    ResponseHeaders,
}

impl fmt::Display for TypeOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UrlExtension => write!(f, "URL extension"),
            Self::PlatformUrl => write!(f, "platform URL"),
            Self::StreamingPath => write!(f, "streaming path"),
            Self::ResponseHeaders => write!(f, "response headers"),
        }
    }
}

/// Probable content type of a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentTypeInfo {
    /// Lowercased MIME type without parameters.
    pub mime_type: String,
    /// Codec list in declaration order, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codecs: Option<Vec<String>>,
    /// Container short name (`mp4`, `hls`, `youtube`, ...), `unknown` if unmapped.
    pub container: String,
    pub confidence: Confidence,
    pub origin: TypeOrigin,
}

/// Outcome class of a verification call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    /// Trial reached metadata (or play-through) readiness.
    Loaded,
    /// Every attempt errored, aborted or timed out.
    Failed,
    /// Not attempted because the host is constrained. Not evidence of anything.
    Skipped,
    /// Blocked by security screening. Never retried.
    Rejected,
    /// Dropped from the admission queue before it ran.
    Cancelled,
}

/// A single failed security screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecurityIssue {
    UnsupportedProtocol,
    UntrustedDomain,
    FileTooLarge,
    InvalidContentType,
    InvalidUrl,
}

impl fmt::Display for SecurityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedProtocol => write!(f, "Unsupported protocol"),
            Self::UntrustedDomain => write!(f, "Untrusted domain"),
            Self::FileTooLarge => write!(f, "File too large"),
            Self::InvalidContentType => write!(f, "Invalid content type"),
            Self::InvalidUrl => write!(f, "Invalid URL format"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityCheck {
    pub passed: bool,
    pub issues: Vec<SecurityIssue>,
}

impl SecurityCheck {
    pub(crate) fn from_issues(issues: Vec<SecurityIssue>) -> Self {
        Self {
            passed: issues.is_empty(),
            issues,
        }
    }

    /// Comma-joined issue list, e.g. `"Untrusted domain, File too large"`.
    #[must_use]
    pub fn summary(&self) -> String {
        self.issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// How far the trial got before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadyState {
    #[default]
    HaveNothing,
    HaveMetadata,
    HaveEnoughData,
}

/// Transport state of the trial at its terminal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkState {
    Idle,
    Loading,
    NoSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDimensions {
    pub width: u32,
    pub height: u32,
}

/// Result of one `verify` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadTestResult {
    pub status: LoadStatus,
    pub can_load: bool,
    /// Duration of the last attempt.
    pub load_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Number of retries after the first attempt.
    pub retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_state: Option<NetworkState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_state: Option<ReadyState>,
    /// Container recognised by the trial, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_duration_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<MediaDimensions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_check: Option<SecurityCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_info: Option<NetworkInfo>,
}

impl LoadTestResult {
    /// A result that carries only a status and an optional message.
    pub(crate) fn bare(status: LoadStatus, error: Option<String>) -> Self {
        Self {
            status,
            can_load: status == LoadStatus::Loaded,
            load_time_ms: 0,
            error,
            retry_count: 0,
            network_state: None,
            ready_state: None,
            container: None,
            media_duration_secs: None,
            dimensions: None,
            security_check: None,
            network_info: None,
        }
    }

    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.status == LoadStatus::Skipped
    }
}

/// Outcome of a selection attempt for one backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub backend: BackendId,
    pub can_play: bool,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentTypeInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_test: Option<LoadTestResult>,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_totally_ordered() {
        assert!(Confidence::High > Confidence::Medium);
        assert!(Confidence::Medium > Confidence::Low);
        let mut v = vec![Confidence::Low, Confidence::High, Confidence::Medium];
        v.sort_by(|a, b| b.cmp(a));
        assert_eq!(v, vec![Confidence::High, Confidence::Medium, Confidence::Low]);
    }

    #[test]
    fn backend_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&BackendId::ADAPTIVE_HLS).unwrap();
        assert_eq!(json, "\"adaptive-hls\"");
        let back: BackendId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, BackendId::ADAPTIVE_HLS);
        assert_eq!(BackendId::custom("native"), BackendId::NATIVE);
    }

    #[test]
    fn security_summary_joins_issues() {
        let check = SecurityCheck::from_issues(vec![
            SecurityIssue::UntrustedDomain,
            SecurityIssue::FileTooLarge,
        ]);
        assert!(!check.passed);
        assert_eq!(check.summary(), "Untrusted domain, File too large");
        assert!(SecurityCheck::from_issues(vec![]).passed);
    }

    #[test]
    fn bare_result_is_loadable_only_when_loaded() {
        assert!(LoadTestResult::bare(LoadStatus::Loaded, None).can_load);
        let skipped = LoadTestResult::bare(LoadStatus::Skipped, Some("constrained".into()));
        assert!(!skipped.can_load);
        assert!(skipped.is_skipped());
    }
}
