//! Real-time (WebRTC) sessions.

use anyhow::{bail, Result};
use async_trait::async_trait;
use url::Url;

use super::Attachment;
use crate::backend::PlaybackBackend;
use crate::detect::MIME_WEBRTC;
use crate::types::BackendId;

/// `webrtc:` sources, `protocol=webrtc` signalling URLs, `application/webrtc`.
#[derive(Debug, Default)]
pub struct RealtimeBackend {
    attached: Attachment,
}

impl RealtimeBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signalling endpoint for a source: the `webrtc:` payload, or the
    /// URL itself for `protocol=webrtc` sources.
    #[must_use]
    pub fn signalling_target(source: &str) -> Option<String> {
        if let Some(rest) = source.strip_prefix("webrtc:") {
            let rest = rest.trim_start_matches('/');
            return (!rest.is_empty()).then(|| rest.to_string());
        }
        let url = Url::parse(source).ok()?;
        url.query_pairs()
            .any(|(k, v)| k == "protocol" && v.eq_ignore_ascii_case("webrtc"))
            .then(|| source.to_string())
    }

    pub async fn session(&self) -> Option<String> {
        self.attached.current().await
    }
}

#[async_trait]
impl PlaybackBackend for RealtimeBackend {
    fn identity(&self) -> BackendId {
        BackendId::REALTIME
    }

    fn supports_trial_load(&self) -> bool {
        false
    }

    fn can_handle(&self, source_or_type: &str) -> bool {
        let lower = source_or_type.to_ascii_lowercase();
        lower.starts_with("webrtc:") || lower.contains("protocol=webrtc") || lower.contains(MIME_WEBRTC)
    }

    fn matches_source(&self, source: &str) -> bool {
        let lower = source.to_ascii_lowercase();
        lower.starts_with("webrtc:") || lower.contains("protocol=webrtc")
    }

    async fn start(&self, source: &str) -> Result<()> {
        let Some(target) = Self::signalling_target(source) else {
            bail!("no signalling endpoint in {source}");
        };
        self.attached.attach(&self.identity(), target).await;
        Ok(())
    }

    async fn stop(&self) {
        self.attached.detach(&self.identity()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_realtime_sources() {
        let rt = RealtimeBackend::new();
        assert!(rt.matches_source("webrtc://sfu.example.com/room/1"));
        assert!(rt.matches_source("https://sfu.example.com/play?protocol=webrtc"));
        assert!(rt.can_handle(MIME_WEBRTC));
        assert!(!rt.matches_source("https://cdn.example.com/a.mp4"));
    }

    #[test]
    fn signalling_targets() {
        assert_eq!(
            RealtimeBackend::signalling_target("webrtc://sfu.example.com/room").as_deref(),
            Some("sfu.example.com/room")
        );
        assert_eq!(
            RealtimeBackend::signalling_target("https://sfu.example.com/play?protocol=webrtc").as_deref(),
            Some("https://sfu.example.com/play?protocol=webrtc")
        );
        assert_eq!(RealtimeBackend::signalling_target("webrtc:"), None);
        assert_eq!(RealtimeBackend::signalling_target("https://sfu.example.com/play"), None);
    }

    #[tokio::test]
    async fn start_rejects_sources_without_endpoint() {
        let rt = RealtimeBackend::new();
        assert!(rt.start("https://cdn.example.com/a.mp4").await.is_err());
        rt.start("webrtc:room-7").await.unwrap();
        assert_eq!(rt.session().await.as_deref(), Some("room-7"));
    }
}
