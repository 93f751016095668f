//! Playback backend capability contract.
//!
//! A [`PlaybackBackend`] answers two synchronous questions with no I/O:
//! can it handle a given MIME type or source string, and does the raw
//! source have one of its known URL shapes. The lifecycle hooks are only
//! used after a backend has been selected.
//!
//! Backends are registered as factories in a [`BackendRegistry`]; every
//! selection builds its own instances, so no backend state is shared
//! between selections.

pub mod builtin;
mod registry;

use anyhow::Result;
use async_trait::async_trait;

pub use registry::{BackendFactory, BackendRegistry};

use crate::types::BackendId;

/// Capability set of a playback backend.
#[async_trait]
pub trait PlaybackBackend: Send + Sync {
    /// Stable identity, used for lookup, ranking and caching.
    fn identity(&self) -> BackendId;

    /// `true` if this backend can play the given MIME type or source.
    fn can_handle(&self, source_or_type: &str) -> bool;

    /// `true` if the raw source has one of this backend's URL shapes.
    /// A match skips content-type detection.
    fn matches_source(&self, _source: &str) -> bool {
        false
    }

    /// Whether an HTTP trial load says anything about this backend.
    /// Embed and real-time players fetch through their own channels.
    fn supports_trial_load(&self) -> bool {
        true
    }

    /// Attach to `source` and begin playback.
    async fn start(&self, source: &str) -> Result<()>;

    /// Release whatever `start` acquired. Safe to call when idle.
    async fn stop(&self);
}

impl std::fmt::Debug for dyn PlaybackBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackBackend")
            .field("identity", &self.identity())
            .finish()
    }
}
