//! Adaptive streaming backends (HLS and DASH manifests).

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::{path_of, Attachment};
use crate::backend::PlaybackBackend;
use crate::net::is_network_source;
use crate::types::BackendId;

/// HLS playlists (`.m3u8`, `mpegurl` types).
#[derive(Debug, Default)]
pub struct AdaptiveHlsBackend {
    attached: Attachment,
}

impl AdaptiveHlsBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Manifest currently attached, if started.
    pub async fn manifest(&self) -> Option<String> {
        self.attached.current().await
    }
}

#[async_trait]
impl PlaybackBackend for AdaptiveHlsBackend {
    fn identity(&self) -> BackendId {
        BackendId::ADAPTIVE_HLS
    }

    fn can_handle(&self, source_or_type: &str) -> bool {
        let lower = source_or_type.to_ascii_lowercase();
        lower.contains("m3u8") || lower.contains("mpegurl")
    }

    fn matches_source(&self, source: &str) -> bool {
        path_of(source).ends_with(".m3u8")
    }

    async fn start(&self, source: &str) -> Result<()> {
        if !is_network_source(source) && !self.matches_source(source) {
            bail!("not an HLS manifest: {source}");
        }
        self.attached.attach(&self.identity(), source.to_string()).await;
        Ok(())
    }

    async fn stop(&self) {
        self.attached.detach(&self.identity()).await;
    }
}

/// DASH manifests (`.mpd`, `dash+xml`).
#[derive(Debug, Default)]
pub struct AdaptiveDashBackend {
    attached: Attachment,
}

impl AdaptiveDashBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn manifest(&self) -> Option<String> {
        self.attached.current().await
    }
}

#[async_trait]
impl PlaybackBackend for AdaptiveDashBackend {
    fn identity(&self) -> BackendId {
        BackendId::ADAPTIVE_DASH
    }

    fn can_handle(&self, source_or_type: &str) -> bool {
        let lower = source_or_type.to_ascii_lowercase();
        lower.contains(".mpd") || lower.contains("dash+xml")
    }

    fn matches_source(&self, source: &str) -> bool {
        path_of(source).ends_with(".mpd")
    }

    async fn start(&self, source: &str) -> Result<()> {
        if !is_network_source(source) && !self.matches_source(source) {
            bail!("not a DASH manifest: {source}");
        }
        self.attached.attach(&self.identity(), source.to_string()).await;
        Ok(())
    }

    async fn stop(&self) {
        self.attached.detach(&self.identity()).await;
    }
}
