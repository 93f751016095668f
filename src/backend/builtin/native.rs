//! Direct progressive playback of single-file media.
//!
//! The fallback backend: it never claims a URL shape and never needs a
//! trial load, it only answers whether a type or file extension is one it
//! decodes natively.

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::{path_of, Attachment};
use crate::backend::PlaybackBackend;
use crate::types::BackendId;

/// MIME types decoded natively.
pub const NATIVE_TYPES: &[&str] = &[
    "video/mp4",
    "video/webm",
    "video/ogg",
    "video/quicktime",
    "audio/mp4",
    "audio/mpeg",
    "audio/ogg",
    "audio/webm",
    "audio/wav",
    "audio/flac",
];

/// File extensions decoded natively.
pub const NATIVE_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "webm", "ogv", "ogg", "mov", "m4a", "mp3", "oga", "wav", "flac",
];

#[derive(Debug)]
pub struct NativeBackend {
    types: Vec<String>,
    extensions: Vec<String>,
    attached: Attachment,
}

impl Default for NativeBackend {
    fn default() -> Self {
        Self::with_formats(NATIVE_TYPES.iter().copied(), NATIVE_EXTENSIONS.iter().copied())
    }
}

impl NativeBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Native backend for a host with a different decoder set.
    pub fn with_formats<T, E>(types: T, extensions: E) -> Self
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Self {
            types: types.into_iter().map(|t| t.as_ref().to_ascii_lowercase()).collect(),
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            attached: Attachment::default(),
        }
    }

    pub async fn current_source(&self) -> Option<String> {
        self.attached.current().await
    }

    fn handles_type(&self, mime: &str) -> bool {
        let essence = mime.split(';').next().unwrap_or(mime).trim().to_ascii_lowercase();
        self.types.iter().any(|t| *t == essence)
    }

    fn handles_extension(&self, source: &str) -> bool {
        let path = path_of(source);
        let segment = path.rsplit('/').next().unwrap_or(&path);
        segment
            .rsplit_once('.')
            .is_some_and(|(stem, ext)| !stem.is_empty() && self.extensions.iter().any(|e| e == ext))
    }
}

#[async_trait]
impl PlaybackBackend for NativeBackend {
    fn identity(&self) -> BackendId {
        BackendId::NATIVE
    }

    fn can_handle(&self, source_or_type: &str) -> bool {
        self.handles_type(source_or_type) || self.handles_extension(source_or_type)
    }

    async fn start(&self, source: &str) -> Result<()> {
        if source.trim().is_empty() {
            bail!("empty source");
        }
        self.attached.attach(&self.identity(), source.to_string()).await;
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
    fn handles_types_with_parameters() {
        let native = NativeBackend::new();
        assert!(native.can_handle("video/mp4"));
        assert!(native.can_handle("Video/MP4; codecs=\"avc1.42E01E\""));
        assert!(!native.can_handle("application/vnd.apple.mpegurl"));
        assert!(!native.can_handle("video/x-flv"));
    }

    #[test]
    fn handles_extensions_of_last_segment() {
        let native = NativeBackend::new();
        assert!(native.can_handle("clip.mp4"));
        assert!(native.can_handle("https://cdn.example.com/a/b/clip.WEBM?sig=1"));
        assert!(!native.can_handle("https://cdn.example.com/mp4/stream"));
        assert!(!native.can_handle("https://cdn.example.com/.mp4"));
        assert!(!native.can_handle("https://host/stream"));
    }

    #[test]
    fn never_claims_a_url_shape() {
        assert!(!NativeBackend::new().matches_source("clip.mp4"));
    }

    #[test]
    fn custom_format_set() {
        let native = NativeBackend::with_formats(["video/x-flv"], [".FLV"]);
        assert!(native.can_handle("video/x-flv"));
        assert!(native.can_handle("movie.flv"));
        assert!(!native.can_handle("clip.mp4"));
    }

    #[tokio::test]
    async fn lifecycle() {
        let native = NativeBackend::new();
        assert!(native.start("  ").await.is_err());
        native.start("clip.mp4").await.unwrap();
        assert_eq!(native.current_source().await.as_deref(), Some("clip.mp4"));
        native.stop().await;
        assert!(native.current_source().await.is_none());
    }

    #[test]
    fn restart_replaces_source() {
        let native = NativeBackend::new();
        tokio_test::block_on(async {
            native.start("a.mp3").await.unwrap();
            native.start("b.ogg").await.unwrap();
        });
        assert_eq!(tokio_test::block_on(native.current_source()).as_deref(), Some("b.ogg"));
    }
}
