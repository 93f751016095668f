//! Content-type detection for media sources.
//!
//! Two passes:
//!
//! 1. URL heuristics (no I/O): file extension table, known platform URL
//!    shapes, and streaming path markers such as `/hls/`.
//! 2. A metadata probe reading `Content-Type`, only when the heuristics
//!    were not conclusive and the source is reachable over HTTP(S).
//!
//! When both passes produce a type, the header result wins: it is what the
//! server actually says. Probe failures of any kind degrade to the
//! heuristic result.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument};

use crate::net::{is_network_source, MetadataProbe};
use crate::types::{Confidence, ContentTypeInfo, TypeOrigin};

/// Default metadata probe timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

pub const MIME_HLS: &str = "application/vnd.apple.mpegurl";
pub const MIME_DASH: &str = "application/dash+xml";
pub const MIME_YOUTUBE: &str = "video/youtube";
pub const MIME_VIMEO: &str = "video/vimeo";
pub const MIME_WEBRTC: &str = "application/webrtc";

struct ExtensionRule {
    ext: &'static str,
    mime: &'static str,
    codecs: &'static [&'static str],
    container: &'static str,
    confidence: Confidence,
}

const EXTENSIONS: &[ExtensionRule] = &[
    ExtensionRule { ext: "mp4", mime: "video/mp4", codecs: &["avc1.42E01E", "mp4a.40.2"], container: "mp4", confidence: Confidence::High },
    ExtensionRule { ext: "m4v", mime: "video/mp4", codecs: &["avc1.42E01E", "mp4a.40.2"], container: "mp4", confidence: Confidence::High },
    ExtensionRule { ext: "webm", mime: "video/webm", codecs: &["vp8", "vorbis"], container: "webm", confidence: Confidence::High },
    ExtensionRule { ext: "ogv", mime: "video/ogg", codecs: &["theora", "vorbis"], container: "ogg", confidence: Confidence::High },
    ExtensionRule { ext: "ogg", mime: "video/ogg", codecs: &["theora", "vorbis"], container: "ogg", confidence: Confidence::High },
    ExtensionRule { ext: "m3u8", mime: MIME_HLS, codecs: &[], container: "hls", confidence: Confidence::High },
    ExtensionRule { ext: "mpd", mime: MIME_DASH, codecs: &[], container: "dash", confidence: Confidence::High },
    ExtensionRule { ext: "avi", mime: "video/x-msvideo", codecs: &[], container: "avi", confidence: Confidence::Medium },
    ExtensionRule { ext: "mov", mime: "video/quicktime", codecs: &[], container: "mov", confidence: Confidence::Medium },
    ExtensionRule { ext: "wmv", mime: "video/x-ms-wmv", codecs: &[], container: "wmv", confidence: Confidence::Low },
    ExtensionRule { ext: "flv", mime: "video/x-flv", codecs: &[], container: "flv", confidence: Confidence::Low },
];

const CONTAINERS: &[(&str, &str)] = &[
    ("video/mp4", "mp4"),
    ("video/webm", "webm"),
    ("video/ogg", "ogg"),
    (MIME_HLS, "hls"),
    ("application/x-mpegurl", "hls"),
    ("audio/mpegurl", "hls"),
    (MIME_DASH, "dash"),
    ("video/x-msvideo", "avi"),
    ("video/quicktime", "mov"),
    ("video/x-ms-wmv", "wmv"),
    ("video/x-flv", "flv"),
];

/// Container short name for a MIME type, `"unknown"` when unmapped.
#[must_use]
pub fn container_for_mime(mime: &str) -> &'static str {
    CONTAINERS
        .iter()
        .find(|(m, _)| m.eq_ignore_ascii_case(mime))
        .map_or("unknown", |(_, c)| c)
}

/// Strip query string and fragment.
fn strip_query(source: &str) -> &str {
    let end = source.find(['?', '#']).unwrap_or(source.len());
    &source[..end]
}

/// Lowercased extension of the last path segment, if any.
fn extension(source: &str) -> Option<String> {
    let path = strip_query(source);
    let segment = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn synthetic(mime: &str, container: &str, confidence: Confidence, origin: TypeOrigin) -> ContentTypeInfo {
    ContentTypeInfo {
        mime_type: mime.to_string(),
        codecs: None,
        container: container.to_string(),
        confidence,
        origin,
    }
}

fn platform_type(source: &str) -> Option<ContentTypeInfo> {
    let lower = source.to_ascii_lowercase();
    if lower.contains("youtube.com") || lower.contains("youtu.be") || lower.starts_with("youtube:") {
        return Some(synthetic(MIME_YOUTUBE, "youtube", Confidence::High, TypeOrigin::PlatformUrl));
    }
    if lower.contains("vimeo.com") || lower.starts_with("vimeo:") {
        return Some(synthetic(MIME_VIMEO, "vimeo", Confidence::High, TypeOrigin::PlatformUrl));
    }
    if lower.starts_with("webrtc:") || lower.contains("protocol=webrtc") {
        return Some(synthetic(MIME_WEBRTC, "webrtc", Confidence::High, TypeOrigin::PlatformUrl));
    }
    None
}

fn streaming_path_type(source: &str) -> Option<ContentTypeInfo> {
    let path = strip_query(source).to_ascii_lowercase();
    if path.contains("/hls/") {
        return Some(synthetic(MIME_HLS, "hls", Confidence::Low, TypeOrigin::StreamingPath));
    }
    if path.contains("/dash/") {
        return Some(synthetic(MIME_DASH, "dash", Confidence::Low, TypeOrigin::StreamingPath));
    }
    None
}

/// Heuristic pass: never touches the network.
#[must_use]
pub fn detect_from_url(source: &str) -> Option<ContentTypeInfo> {
    if let Some(platform) = platform_type(source) {
        return Some(platform);
    }

    if let Some(ext) = extension(source) {
        if let Some(rule) = EXTENSIONS.iter().find(|r| r.ext == ext) {
            return Some(ContentTypeInfo {
                mime_type: rule.mime.to_string(),
                codecs: (!rule.codecs.is_empty())
                    .then(|| rule.codecs.iter().map(|c| (*c).to_string()).collect()),
                container: rule.container.to_string(),
                confidence: rule.confidence,
                origin: TypeOrigin::UrlExtension,
            });
        }
    }

    streaming_path_type(source)
}

/// Parse a `Content-Type` header value.
///
/// Returns `None` for values without a `type/subtype` token. A
/// `codecs="a, b"` parameter becomes the ordered codec list.
#[must_use]
pub fn parse_content_type(header: &str) -> Option<ContentTypeInfo> {
    let mut parts = header.split(';');
    let mime = parts.next()?.trim().to_ascii_lowercase();

    let (kind, subtype) = mime.split_once('/')?;
    let valid_token = |s: &str| !s.is_empty() && !s.contains(char::is_whitespace) && !s.contains('/');
    if !valid_token(kind) || !valid_token(subtype) {
        return None;
    }

    let codecs = parts
        .filter_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim().eq_ignore_ascii_case("codecs").then_some(value)
        })
        .next()
        .map(|value| {
            value
                .trim()
                .trim_matches('"')
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|codecs| !codecs.is_empty());

    Some(ContentTypeInfo {
        container: container_for_mime(&mime).to_string(),
        mime_type: mime,
        codecs,
        confidence: Confidence::High,
        origin: TypeOrigin::ResponseHeaders,
    })
}

/// Heuristic + network content-type detector.
pub struct ContentTypeDetector {
    probe: Option<Arc<dyn MetadataProbe>>,
    probe_timeout: Duration,
}

impl ContentTypeDetector {
    /// Detector that may probe the network through `probe`.
    pub fn new(probe: Arc<dyn MetadataProbe>) -> Self {
        Self {
            probe: Some(probe),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Heuristics only.
    #[must_use]
    pub fn offline() -> Self {
        Self {
            probe: None,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Best available content type, or `None` if nothing is known.
    #[instrument(skip(self), fields(source = %source))]
    pub async fn detect(&self, source: &str) -> Option<ContentTypeInfo> {
        let from_url = detect_from_url(source);
        if let Some(info) = &from_url {
            if info.confidence == Confidence::High {
                debug!(mime = %info.mime_type, origin = %info.origin, "conclusive URL heuristic");
                return from_url;
            }
        }

        match self.detect_from_headers(source).await {
            Some(from_headers) => Some(from_headers),
            None => from_url,
        }
    }

    /// Network pass alone. `None` on any failure or for non-HTTP sources.
    pub async fn detect_from_headers(&self, source: &str) -> Option<ContentTypeInfo> {
        let probe = self.probe.as_ref()?;
        if !is_network_source(source) {
            return None;
        }

        let head = match probe.head(source, self.probe_timeout).await {
            Ok(head) => head,
            Err(e) => {
                debug!(error = %e, "metadata probe failed, using heuristics");
                return None;
            }
        };

        if !head.is_success() {
            debug!(status = head.status, "metadata probe returned non-success status");
            return None;
        }

        let info = parse_content_type(head.content_type.as_deref()?);
        if info.is_none() {
            debug!(header = ?head.content_type, "malformed content-type header");
        }
        info
    }
}
