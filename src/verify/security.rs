//! Pre-trial security screening.

use std::time::Duration;

use tracing::warn;
use url::Url;

use super::VerifyOptions;
use crate::detect::{MIME_DASH, MIME_HLS};
use crate::net::MetadataProbe;
use crate::types::{SecurityCheck, SecurityIssue};

/// Timeout of the screening HEAD request.
pub const SCREEN_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// `host` equals `domain` or is a subdomain of it.
fn domain_matches(host: &str, domain: &str) -> bool {
    let domain = domain.trim_start_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return false;
    }
    let host = host.to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Declared type is something a media element could consume.
fn is_media_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase();
    mime.starts_with("video/")
        || mime.starts_with("audio/")
        || mime.contains("stream")
        || mime.contains("mpegurl")
        || mime == MIME_HLS
        || mime == MIME_DASH
}

/// Run every applicable screen and collect the violations.
///
/// The HEAD probe is only issued to hosts that passed the scheme and
/// allowlist checks. A failed probe is not a violation.
pub(crate) async fn screen(
    source: &str,
    options: &VerifyOptions,
    probe: Option<&dyn MetadataProbe>,
) -> SecurityCheck {
    let Ok(url) = Url::parse(source) else {
        return SecurityCheck::from_issues(vec![SecurityIssue::InvalidUrl]);
    };

    let mut issues = Vec::new();
    if !ALLOWED_SCHEMES.contains(&url.scheme()) {
        issues.push(SecurityIssue::UnsupportedProtocol);
    }

    if !options.trusted_domains.is_empty() {
        let host = url.host_str().unwrap_or_default();
        if !options
            .trusted_domains
            .iter()
            .any(|domain| domain_matches(host, domain))
        {
            issues.push(SecurityIssue::UntrustedDomain);
        }
    }

    if let (true, Some(probe)) = (issues.is_empty(), probe) {
        match probe.head(source, SCREEN_PROBE_TIMEOUT).await {
            Ok(head) => {
                if head.content_length.is_some_and(|len| len > options.max_file_size) {
                    issues.push(SecurityIssue::FileTooLarge);
                }
                if head.content_type.as_deref().is_some_and(|ct| !is_media_type(ct)) {
                    issues.push(SecurityIssue::InvalidContentType);
                }
            }
            Err(e) => warn!(error = %e, "screening HEAD request failed"),
        }
    }

    SecurityCheck::from_issues(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use crate::net::HeadResponse;
    use async_trait::async_trait;

    struct StubProbe(HeadResponse);

    #[async_trait]
    impl MetadataProbe for StubProbe {
        async fn head(&self, _url: &str, _timeout: Duration) -> Result<HeadResponse, ProbeError> {
            Ok(self.0.clone())
        }
    }

    fn stub(content_type: &str, length: u64) -> StubProbe {
        StubProbe(HeadResponse {
            status: 200,
            content_type: Some(content_type.to_string()),
            content_length: Some(length),
        })
    }

    #[test]
    fn domain_matching_requires_label_boundary() {
        assert!(domain_matches("example.com", "example.com"));
        assert!(domain_matches("cdn.example.com", "example.com"));
        assert!(domain_matches("CDN.Example.com", ".example.com"));
        assert!(!domain_matches("evilexample.com", "example.com"));
        assert!(!domain_matches("example.com.evil.net", "example.com"));
        assert!(!domain_matches("example.com", ""));
    }

    #[test]
    fn media_type_acceptance() {
        assert!(is_media_type("video/mp4"));
        assert!(is_media_type("audio/mpeg"));
        assert!(is_media_type("application/octet-stream"));
        assert!(is_media_type("application/vnd.apple.mpegurl"));
        assert!(is_media_type("application/dash+xml; charset=utf-8"));
        assert!(!is_media_type("text/html"));
        assert!(!is_media_type("application/json"));
    }

    #[tokio::test]
    async fn clean_source_passes() {
        let probe = stub("video/mp4", 1024);
        let check = screen("https://cdn.example.com/a.mp4", &VerifyOptions::default(), Some(&probe)).await;
        assert!(check.passed, "{:?}", check.issues);
    }

    #[tokio::test]
    async fn scheme_and_url_violations() {
        let opts = VerifyOptions::default();
        let check = screen("ftp://example.com/a.mp4", &opts, None).await;
        assert_eq!(check.issues, vec![SecurityIssue::UnsupportedProtocol]);

        let check = screen("not a url", &opts, None).await;
        assert_eq!(check.issues, vec![SecurityIssue::InvalidUrl]);
    }

    #[tokio::test]
    async fn allowlist_violation_skips_probe() {
        struct PanicProbe;
        #[async_trait]
        impl MetadataProbe for PanicProbe {
            async fn head(&self, _: &str, _: Duration) -> Result<HeadResponse, ProbeError> {
                panic!("untrusted host must not be contacted");
            }
        }

        let opts = VerifyOptions::default().with_trusted_domains(["example.com"]);
        let check = screen("https://evil.net/a.mp4", &opts, Some(&PanicProbe)).await;
        assert_eq!(check.issues, vec![SecurityIssue::UntrustedDomain]);
    }

    #[tokio::test]
    async fn size_and_type_violations() {
        let opts = VerifyOptions::default().with_max_file_size(1_000);
        let probe = stub("text/html", 5_000);
        let check = screen("https://example.com/a", &opts, Some(&probe)).await;
        assert_eq!(
            check.issues,
            vec![SecurityIssue::FileTooLarge, SecurityIssue::InvalidContentType]
        );
    }
}
