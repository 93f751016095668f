//! Third-party embed players, addressed by video id.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::Attachment;
use crate::backend::PlaybackBackend;
use crate::detect::{MIME_VIMEO, MIME_YOUTUBE};
use crate::types::BackendId;

static YOUTUBE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:youtube\.com/(?:watch\?(?:[^#]*&)?v=|embed/|shorts/)|youtu\.be/|^youtube:)([A-Za-z0-9_-]+)",
    )
    .expect("static YouTube pattern")
});

static VIMEO_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:player\.vimeo\.com/video/|vimeo\.com/(?:channels/[^/?#]+/)?|^vimeo:)(\d+)")
        .expect("static Vimeo pattern")
});

fn capture(pattern: &Regex, source: &str) -> Option<String> {
    pattern
        .captures(source.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// `YouTube` embeds.
#[derive(Debug, Default)]
pub struct YouTubeEmbedBackend {
    attached: Attachment,
}

impl YouTubeEmbedBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Video id from a watch, short-link, embed or `youtube:` source.
    #[must_use]
    pub fn video_id(source: &str) -> Option<String> {
        capture(&YOUTUBE_ID, source)
    }

    /// Id of the video currently attached.
    pub async fn current_video(&self) -> Option<String> {
        self.attached.current().await
    }
}

#[async_trait]
impl PlaybackBackend for YouTubeEmbedBackend {
    fn identity(&self) -> BackendId {
        BackendId::EMBED_YOUTUBE
    }

    fn supports_trial_load(&self) -> bool {
        false
    }

    fn can_handle(&self, source_or_type: &str) -> bool {
        source_or_type.eq_ignore_ascii_case(MIME_YOUTUBE) || self.matches_source(source_or_type)
    }

    fn matches_source(&self, source: &str) -> bool {
        Self::video_id(source).is_some()
    }

    async fn start(&self, source: &str) -> Result<()> {
        let id = Self::video_id(source).ok_or_else(|| anyhow!("invalid YouTube URL or video id: {source}"))?;
        self.attached.attach(&self.identity(), id).await;
        Ok(())
    }

    async fn stop(&self) {
        self.attached.detach(&self.identity()).await;
    }
}

/// Vimeo embeds.
#[derive(Debug, Default)]
pub struct VimeoEmbedBackend {
    attached: Attachment,
}

impl VimeoEmbedBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Numeric video id from a page, player or `vimeo:` source.
    #[must_use]
    pub fn video_id(source: &str) -> Option<String> {
        capture(&VIMEO_ID, source)
    }

    pub async fn current_video(&self) -> Option<String> {
        self.attached.current().await
    }
}

#[async_trait]
impl PlaybackBackend for VimeoEmbedBackend {
    fn identity(&self) -> BackendId {
        BackendId::EMBED_VIMEO
    }

    fn supports_trial_load(&self) -> bool {
        false
    }

    fn can_handle(&self, source_or_type: &str) -> bool {
        source_or_type.eq_ignore_ascii_case(MIME_VIMEO) || self.matches_source(source_or_type)
    }

    fn matches_source(&self, source: &str) -> bool {
        Self::video_id(source).is_some()
    }

    async fn start(&self, source: &str) -> Result<()> {
        let id = Self::video_id(source).ok_or_else(|| anyhow!("invalid Vimeo URL or video id: {source}"))?;
        self.attached.attach(&self.identity(), id).await;
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
    fn youtube_ids() {
        assert_eq!(
            YouTubeEmbedBackend::video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            YouTubeEmbedBackend::video_id("https://www.youtube.com/watch?feature=share&v=abc_DEF-1&t=4").as_deref(),
            Some("abc_DEF-1")
        );
        assert_eq!(
            YouTubeEmbedBackend::video_id("https://youtu.be/dQw4w9WgXcQ?t=42").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(YouTubeEmbedBackend::video_id("youtube:xyz123").as_deref(), Some("xyz123"));
        assert_eq!(YouTubeEmbedBackend::video_id("https://www.youtube.com/"), None);
        assert_eq!(YouTubeEmbedBackend::video_id("https://example.com/clip.mp4"), None);
    }

    #[test]
    fn vimeo_ids() {
        assert_eq!(VimeoEmbedBackend::video_id("https://vimeo.com/76979871").as_deref(), Some("76979871"));
        assert_eq!(
            VimeoEmbedBackend::video_id("https://player.vimeo.com/video/76979871?h=abc").as_deref(),
            Some("76979871")
        );
        assert_eq!(
            VimeoEmbedBackend::video_id("https://vimeo.com/channels/staffpicks/123456").as_deref(),
            Some("123456")
        );
        assert_eq!(VimeoEmbedBackend::video_id("vimeo:42").as_deref(), Some("42"));
        assert_eq!(VimeoEmbedBackend::video_id("https://vimeo.com/about"), None);
    }

    #[test]
    fn capability_accepts_type_and_shape() {
        let yt = YouTubeEmbedBackend::new();
        assert!(yt.can_handle(MIME_YOUTUBE));
        assert!(yt.can_handle("https://youtu.be/abc"));
        assert!(!yt.can_handle("video/mp4"));

        let vimeo = VimeoEmbedBackend::new();
        assert!(vimeo.can_handle(MIME_VIMEO));
        assert!(vimeo.matches_source("https://vimeo.com/1"));
        assert!(!vimeo.matches_source("https://youtu.be/abc"));
    }

    #[tokio::test]
    async fn start_requires_a_video_id() {
        let yt = YouTubeEmbedBackend::new();
        yt.start("https://youtu.be/abc").await.unwrap();
        assert_eq!(yt.current_video().await.as_deref(), Some("abc"));
        yt.stop().await;
        assert!(yt.current_video().await.is_none());

        let err = VimeoEmbedBackend::new().start("https://vimeo.com/about").await.unwrap_err();
        assert!(err.to_string().contains("invalid Vimeo URL"));
    }
}
