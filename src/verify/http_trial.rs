//! HTTP trial loader.
//!
//! Issues a ranged GET and reads just enough of the body to recognise the
//! container: that is "metadata ready". With [`Preload::Full`] it keeps
//! reading up to a play-through byte budget. The response is dropped on
//! every exit path, including when the verifier's timeout drops this
//! future mid-read.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, RANGE};
use reqwest::Client;
use tracing::{debug, warn};

use super::sniff::{container_from_declared, mp4_dimensions, mp4_duration_secs, sniff_container};
use super::{MediaErrorKind, Preload, TrialEvent, TrialLoader, TrialMetadata};
use crate::error::ProbeError;
use crate::net::is_network_source;
use crate::types::ReadyState;

/// Bytes read before giving up on recognising metadata.
pub const DEFAULT_METADATA_BYTES: usize = 64 * 1024;
/// Bytes that count as "enough to play through" for [`Preload::Full`].
pub const DEFAULT_PLAY_THROUGH_BYTES: usize = 1024 * 1024;

/// [`TrialLoader`] that performs real, bounded HTTP reads.
pub struct HttpTrialLoader {
    client: Client,
    metadata_bytes: usize,
    play_through_bytes: usize,
}

impl HttpTrialLoader {
    pub fn new() -> Result<Self, ProbeError> {
        let client = Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_nodelay(true)
            .connect_timeout(Duration::from_secs(5))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self::with_client(client))
    }

    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            metadata_bytes: DEFAULT_METADATA_BYTES,
            play_through_bytes: DEFAULT_PLAY_THROUGH_BYTES,
        }
    }

    #[must_use]
    pub fn with_budgets(mut self, metadata_bytes: usize, play_through_bytes: usize) -> Self {
        self.metadata_bytes = metadata_bytes.max(16);
        self.play_through_bytes = play_through_bytes.max(self.metadata_bytes);
        self
    }

    fn budget(&self, preload: Preload) -> usize {
        match preload {
            Preload::Metadata => self.metadata_bytes,
            Preload::Full => self.play_through_bytes,
        }
    }
}

#[async_trait]
impl TrialLoader for HttpTrialLoader {
    async fn load(&self, source: &str, preload: Preload) -> TrialEvent {
        if !is_network_source(source) {
            return TrialEvent::Error(
                MediaErrorKind::SrcNotSupported,
                Some(format!("unsupported scheme: {source}")),
            );
        }

        let budget = self.budget(preload);
        let response = match self
            .client
            .get(source)
            .header(RANGE, format!("bytes=0-{}", budget - 1))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return TrialEvent::Error(MediaErrorKind::Network, Some(e.to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            return TrialEvent::Error(
                MediaErrorKind::Network,
                Some(ProbeError::Status(status.as_u16()).to_string()),
            );
        }

        let declared = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        debug!(%status, content_type = ?declared, budget, "trial response started");

        let mut buf: Vec<u8> = Vec::with_capacity(budget.min(DEFAULT_METADATA_BYTES));
        let mut container = None;
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = %e, "trial body read failed");
                    return TrialEvent::Error(MediaErrorKind::Network, Some(e.to_string()));
                }
            };
            let take = (budget - buf.len()).min(chunk.len());
            buf.extend_from_slice(&chunk[..take]);

            if container.is_none() {
                container = sniff_container(&buf);
                if container.is_some() && preload == Preload::Metadata {
                    break;
                }
            }
            if buf.len() >= budget {
                break;
            }
        }

        let container = container.or_else(|| declared.as_deref().and_then(container_from_declared));
        let Some(container) = container else {
            if buf.is_empty() {
                return TrialEvent::Aborted;
            }
            return TrialEvent::Error(
                MediaErrorKind::SrcNotSupported,
                Some("unrecognised media container".to_string()),
            );
        };

        let (media_duration_secs, dimensions) = if matches!(container, "mp4" | "mov") {
            (mp4_duration_secs(&buf), mp4_dimensions(&buf))
        } else {
            (None, None)
        };

        TrialEvent::Ready(TrialMetadata {
            ready_state: match preload {
                Preload::Metadata => ReadyState::HaveMetadata,
                Preload::Full => ReadyState::HaveEnoughData,
            },
            container: Some(container.to_string()),
            media_duration_secs,
            dimensions,
            bytes_read: buf.len() as u64,
        })
    }
}
