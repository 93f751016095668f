//! Metadata-only network probes.
//!
//! The detector and the verifier's security screen only need status and
//! a couple of headers, so the transport is a single HEAD-style call
//! behind [`MetadataProbe`]. [`HttpProbe`] is the reqwest implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Client;
use tracing::{debug, instrument};

use crate::error::ProbeError;

/// Status and headers of a metadata probe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

impl HeadResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HEAD-style request with a caller-supplied timeout.
#[async_trait]
pub trait MetadataProbe: Send + Sync {
    async fn head(&self, url: &str, timeout: Duration) -> Result<HeadResponse, ProbeError>;
}

/// Returns `true` for sources a network probe can reach.
#[must_use]
pub fn is_network_source(source: &str) -> bool {
    let lower = source.get(..8).unwrap_or(source).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// reqwest-backed [`MetadataProbe`].
#[derive(Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new() -> Result<Self, ProbeError> {
        let client = Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(60))
            .tcp_nodelay(true)
            .connect_timeout(Duration::from_secs(5))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client (shares its connection pool).
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl MetadataProbe for HttpProbe {
    #[instrument(skip(self), fields(url = %url))]
    async fn head(&self, url: &str, timeout: Duration) -> Result<HeadResponse, ProbeError> {
        if !is_network_source(url) {
            return Err(ProbeError::InvalidUrl(url.to_string()));
        }

        let request = self.client.head(url).timeout(timeout).send();
        let response = tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| ProbeError::Timeout(timeout))?
            .map_err(|e| {
                if e.is_timeout() {
                    ProbeError::Timeout(timeout)
                } else {
                    ProbeError::Transport(e)
                }
            })?;

        let headers = response.headers();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());

        let head = HeadResponse {
            status: response.status().as_u16(),
            content_type,
            content_length,
        };
        debug!(status = head.status, content_type = ?head.content_type, "probe response");
        Ok(head)
    }
}
