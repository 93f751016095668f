//! Built-in playback backends.

mod adaptive;
mod embed;
mod native;
mod realtime;

pub use adaptive::{AdaptiveDashBackend, AdaptiveHlsBackend};
pub use embed::{VimeoEmbedBackend, YouTubeEmbedBackend};
pub use native::NativeBackend;
pub use realtime::RealtimeBackend;

use tokio::sync::Mutex;
use tracing::debug;

use crate::types::BackendId;

/// Source a backend is currently attached to.
#[derive(Debug, Default)]
pub(crate) struct Attachment {
    current: Mutex<Option<String>>,
}

impl Attachment {
    pub(crate) async fn attach(&self, id: &BackendId, target: String) {
        let mut current = self.current.lock().await;
        if let Some(previous) = current.replace(target) {
            debug!(backend = %id, %previous, "replacing attached source");
        }
        debug!(backend = %id, source = current.as_deref().unwrap_or_default(), "backend started");
    }

    pub(crate) async fn detach(&self, id: &BackendId) {
        if let Some(previous) = self.current.lock().await.take() {
            debug!(backend = %id, %previous, "backend stopped");
        }
    }

    pub(crate) async fn current(&self) -> Option<String> {
        self.current.lock().await.clone()
    }
}

/// Lowercased source with query and fragment removed.
pub(crate) fn path_of(source: &str) -> String {
    let end = source.find(['?', '#']).unwrap_or(source.len());
    source[..end].to_ascii_lowercase()
}
