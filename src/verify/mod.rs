//! Empirical playability checks.
//!
//! [`LoadVerifier::verify`] runs a pipeline per call:
//!
//! 1. Environment gate: constrained hosts skip the trial (reported as
//!    [`LoadStatus::Skipped`], not as a failure).
//! 2. Security screen: scheme, domain allowlist, declared size and type.
//!    Violations are terminal and never retried.
//! 3. Admission: a global ceiling on simultaneous trials, FIFO queue.
//! 4. Trial attempts through a [`TrialLoader`], each bounded by a timeout
//!    that grows with the attempt number, retried with growing delays.
//!
//! The admission slot is an RAII guard, so it is released on every exit
//! path. Dropping a `verify` future cancels its trial and releases its slot.

mod admission;
pub mod http_trial;
mod security;
mod sniff;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

pub use admission::{VerifierStats, DEFAULT_MAX_CONCURRENT};
pub use http_trial::HttpTrialLoader;

use crate::env::{EnvironmentSource, StaticEnvironment};
use crate::error::ProbeError;
use crate::net::{HttpProbe, MetadataProbe};
use crate::types::{LoadStatus, LoadTestResult, MediaDimensions, NetworkState, ReadyState};
use admission::Admission;

/// How much of the media a trial should load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preload {
    /// Stop once the container and its metadata are recognised.
    #[default]
    Metadata,
    /// Keep loading until enough data to play through is buffered.
    Full,
}

/// Classification of a trial error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaErrorKind {
    Aborted,
    Network,
    Decode,
    SrcNotSupported,
}

impl fmt::Display for MediaErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aborted => write!(f, "Media loading aborted"),
            Self::Network => write!(f, "Network error"),
            Self::Decode => write!(f, "Media decode error"),
            Self::SrcNotSupported => write!(f, "Media format not supported"),
        }
    }
}

/// What a trial learned before reporting ready.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrialMetadata {
    pub ready_state: ReadyState,
    pub container: Option<String>,
    pub media_duration_secs: Option<f64>,
    pub dimensions: Option<MediaDimensions>,
    pub bytes_read: u64,
}

/// Terminal event of one trial load.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialEvent {
    Ready(TrialMetadata),
    Error(MediaErrorKind, Option<String>),
    Aborted,
}

/// Performs one trial load. Implementations own their resources and must
/// release them when the returned future completes or is dropped.
#[async_trait]
pub trait TrialLoader: Send + Sync {
    async fn load(&self, source: &str, preload: Preload) -> TrialEvent;
}

/// States of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    Started,
    MetadataReady,
    Error,
    Aborted,
    TimedOut,
}

/// Tracks one attempt; logs teardown whichever way the attempt ends.
struct Trial<'a> {
    source: &'a str,
    attempt: u32,
    state: TrialState,
    started: Instant,
}

impl<'a> Trial<'a> {
    fn start(source: &'a str, attempt: u32) -> Self {
        debug!(source, attempt = attempt + 1, "trial load started");
        Self {
            source,
            attempt,
            state: TrialState::Started,
            started: Instant::now(),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

impl Drop for Trial<'_> {
    fn drop(&mut self) {
        debug!(
            source = self.source,
            attempt = self.attempt + 1,
            state = ?self.state,
            "trial torn down"
        );
    }
}

/// Per-call verification options.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyOptions {
    /// Timeout of the first attempt; attempt `n` (1-based) gets `n` times this.
    pub timeout: Duration,
    /// Additional attempts after the first.
    pub max_retries: u32,
    /// Base delay; the wait after attempt `n` is `n` times this.
    pub retry_delay: Duration,
    /// Largest accepted declared `Content-Length`.
    pub max_file_size: u64,
    /// When non-empty, the host must equal or be a subdomain of one entry.
    pub trusted_domains: Vec<String>,
    pub security_check: bool,
    pub preload: Preload,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_retries: 2,
            retry_delay: Duration::from_secs(1),
            max_file_size: 50 * 1024 * 1024,
            trusted_domains: Vec::new(),
            security_check: true,
            preload: Preload::Metadata,
        }
    }
}

impl VerifyOptions {
    /// No retries, no security screen.
    #[must_use]
    pub fn basic() -> Self {
        Self {
            max_retries: 0,
            security_check: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    #[must_use]
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    #[must_use]
    pub fn with_trusted_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trusted_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_security_check(mut self, enabled: bool) -> Self {
        self.security_check = enabled;
        self
    }

    #[must_use]
    pub fn with_preload(mut self, preload: Preload) -> Self {
        self.preload = preload;
        self
    }
}

/// Default chunk size of [`LoadVerifier::verify_many`].
pub const DEFAULT_BATCH_SIZE: usize = 3;
/// Default pause between chunks of [`LoadVerifier::verify_many`].
pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_millis(100);

/// Trial-load verifier with a shared concurrency ceiling.
pub struct LoadVerifier {
    loader: Arc<dyn TrialLoader>,
    probe: Option<Arc<dyn MetadataProbe>>,
    environment: Arc<dyn EnvironmentSource>,
    admission: Admission,
    batch_size: usize,
    batch_pause: Duration,
}

impl LoadVerifier {
    /// Verifier over `loader` with no screening probe and an
    /// unconstrained environment.
    pub fn new(loader: Arc<dyn TrialLoader>) -> Self {
        Self {
            loader,
            probe: None,
            environment: Arc::new(StaticEnvironment::default()),
            admission: Admission::new(DEFAULT_MAX_CONCURRENT),
            batch_size: DEFAULT_BATCH_SIZE,
            batch_pause: DEFAULT_BATCH_PAUSE,
        }
    }

    /// HTTP trial loader plus HTTP screening probe.
    pub fn http() -> Result<Self, ProbeError> {
        Ok(Self::new(Arc::new(HttpTrialLoader::new()?)).with_probe(Arc::new(HttpProbe::new()?)))
    }

    /// Probe used by the security screen's HEAD request.
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn MetadataProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: Arc<dyn EnvironmentSource>) -> Self {
        self.environment = environment;
        self
    }

    #[must_use]
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.admission = Admission::new(max);
        self
    }

    #[must_use]
    pub fn with_batching(mut self, size: usize, pause: Duration) -> Self {
        self.batch_size = size.max(1);
        self.batch_pause = pause;
        self
    }

    /// Verify that `source` actually loads. Always returns a result.
    #[instrument(skip(self, options))]
    pub async fn verify(&self, source: &str, options: &VerifyOptions) -> LoadTestResult {
        let environment = self.environment.current();
        if let Some(reason) = environment.constraint() {
            info!(reason, "trial skipped on constrained host");
            let mut skipped = LoadTestResult::bare(
                LoadStatus::Skipped,
                Some(format!(
                    "Actual load test skipped due to network/device conditions ({reason})"
                )),
            );
            skipped.network_info = Some(environment.network);
            return skipped;
        }

        let security_check = if options.security_check {
            let check = security::screen(source, options, self.probe.as_deref()).await;
            if !check.passed {
                warn!(issues = %check.summary(), "security screening rejected source");
                let mut rejected = LoadTestResult::bare(
                    LoadStatus::Rejected,
                    Some(format!("Security check failed: {}", check.summary())),
                );
                rejected.security_check = Some(check);
                rejected.network_info = Some(environment.network);
                return rejected;
            }
            Some(check)
        } else {
            None
        };

        let Some(_slot) = self.admission.admit().await else {
            debug!("removed from trial queue before admission");
            return LoadTestResult::bare(LoadStatus::Cancelled, Some("Test queue cleared".into()));
        };

        let mut result = self.run_attempts(source, options).await;
        result.security_check = security_check;
        result.network_info = Some(environment.network);
        info!(
            status = ?result.status,
            retries = result.retry_count,
            load_time_ms = result.load_time_ms,
            "verification finished"
        );
        result
    }

    /// Single attempt, no screening.
    pub async fn verify_basic(&self, source: &str, timeout: Duration) -> LoadTestResult {
        self.verify(source, &VerifyOptions::basic().with_timeout(timeout)).await
    }

    /// `true` if one metadata-depth attempt succeeds within `timeout`.
    pub async fn quick_check(&self, source: &str, timeout: Duration) -> bool {
        self.verify_basic(source, timeout).await.can_load
    }

    /// Verify many sources in fixed-size chunks with a pause between chunks.
    /// Results are in input order.
    pub async fn verify_many(
        &self,
        sources: &[String],
        options: &VerifyOptions,
    ) -> Vec<(String, LoadTestResult)> {
        let mut results = Vec::with_capacity(sources.len());
        let chunks: Vec<_> = sources.chunks(self.batch_size).collect();
        let last = chunks.len().saturating_sub(1);

        for (i, chunk) in chunks.into_iter().enumerate() {
            let batch = chunk.iter().map(|source| async move {
                (source.clone(), self.verify(source, options).await)
            });
            results.extend(futures::future::join_all(batch).await);

            if i < last {
                tokio::time::sleep(self.batch_pause).await;
            }
        }
        results
    }

    #[must_use]
    pub fn stats(&self) -> VerifierStats {
        self.admission.stats()
    }

    /// Reject every queued (not yet running) verification.
    pub fn clear_queue(&self) -> usize {
        let cleared = self.admission.clear_queue();
        if cleared > 0 {
            info!(cleared, "trial queue cleared");
        }
        cleared
    }

    async fn run_attempts(&self, source: &str, options: &VerifyOptions) -> LoadTestResult {
        let mut attempt = 0u32;
        loop {
            let mut result = self.attempt(source, options, attempt).await;
            result.retry_count = attempt;
            if result.can_load {
                return result;
            }

            if attempt >= options.max_retries {
                let total = attempt + 1;
                let noun = if total == 1 { "attempt" } else { "attempts" };
                let last_error = result.error.take().unwrap_or_else(|| "Unknown error".into());
                result.error = Some(format!("Failed after {total} {noun}: {last_error}"));
                return result;
            }

            warn!(
                source,
                attempt = attempt + 1,
                error = result.error.as_deref().unwrap_or_default(),
                "trial attempt failed, retrying"
            );
            tokio::time::sleep(options.retry_delay * (attempt + 1)).await;
            attempt += 1;
        }
    }

    async fn attempt(&self, source: &str, options: &VerifyOptions, attempt: u32) -> LoadTestResult {
        let timeout = options.timeout * (attempt + 1);
        let mut trial = Trial::start(source, attempt);
        let outcome = tokio::time::timeout(timeout, self.loader.load(source, options.preload)).await;
        let load_time_ms = trial.elapsed_ms();

        let mut result = match outcome {
            Ok(TrialEvent::Ready(meta)) => {
                trial.state = TrialState::MetadataReady;
                let mut loaded = LoadTestResult::bare(LoadStatus::Loaded, None);
                loaded.network_state = Some(NetworkState::Idle);
                loaded.ready_state = Some(meta.ready_state);
                loaded.container = meta.container;
                loaded.media_duration_secs = meta.media_duration_secs;
                loaded.dimensions = meta.dimensions;
                loaded
            }
            Ok(TrialEvent::Error(kind, detail)) => {
                trial.state = TrialState::Error;
                let message = detail.map_or_else(|| kind.to_string(), |d| format!("{kind}: {d}"));
                let mut failed = LoadTestResult::bare(LoadStatus::Failed, Some(message));
                failed.network_state = Some(NetworkState::NoSource);
                failed.ready_state = Some(ReadyState::HaveNothing);
                failed
            }
            Ok(TrialEvent::Aborted) => {
                trial.state = TrialState::Aborted;
                let mut aborted = LoadTestResult::bare(LoadStatus::Failed, Some("Load aborted".into()));
                aborted.network_state = Some(NetworkState::Idle);
                aborted.ready_state = Some(ReadyState::HaveNothing);
                aborted
            }
            Err(_) => {
                trial.state = TrialState::TimedOut;
                let mut timed_out = LoadTestResult::bare(
                    LoadStatus::Failed,
                    Some(format!("Load test timeout after {}ms", timeout.as_millis())),
                );
                timed_out.network_state = Some(NetworkState::Loading);
                timed_out.ready_state = Some(ReadyState::HaveNothing);
                timed_out
            }
        };
        result.load_time_ms = load_time_ms;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{HostEnvironment, NetworkInfo};
    use crate::net::HeadResponse;
    use crate::types::SecurityIssue;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Loader that sleeps, then replies; tracks attempts and concurrency.
    struct FakeLoader {
        delay: Duration,
        fail_first: usize,
        attempts: AtomicUsize,
        in_flight: Arc<AtomicUsize>,
        peak: AtomicUsize,
        torn_down: Arc<AtomicUsize>,
    }

    impl FakeLoader {
        fn new(delay: Duration, fail_first: usize) -> Arc<Self> {
            Arc::new(Self {
                delay,
                fail_first,
                attempts: AtomicUsize::new(0),
                in_flight: Arc::new(AtomicUsize::new(0)),
                peak: AtomicUsize::new(0),
                torn_down: Arc::new(AtomicUsize::new(0)),
            })
        }
    }

    /// Decrements in-flight and counts teardown on drop, like a trial
    /// element being removed.
    struct Element {
        in_flight: Arc<AtomicUsize>,
        torn_down: Arc<AtomicUsize>,
    }

    impl Drop for Element {
        fn drop(&mut self) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.torn_down.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl TrialLoader for FakeLoader {
        async fn load(&self, _source: &str, preload: Preload) -> TrialEvent {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let _element = Element {
                in_flight: Arc::clone(&self.in_flight),
                torn_down: Arc::clone(&self.torn_down),
            };

            tokio::time::sleep(self.delay).await;
            if n < self.fail_first {
                TrialEvent::Error(MediaErrorKind::Network, None)
            } else {
                TrialEvent::Ready(TrialMetadata {
                    ready_state: match preload {
                        Preload::Metadata => ReadyState::HaveMetadata,
                        Preload::Full => ReadyState::HaveEnoughData,
                    },
                    container: Some("mp4".into()),
                    ..TrialMetadata::default()
                })
            }
        }
    }

    struct StubProbe(HeadResponse);

    #[async_trait]
    impl MetadataProbe for StubProbe {
        async fn head(&self, _: &str, _: Duration) -> Result<HeadResponse, ProbeError> {
            Ok(self.0.clone())
        }
    }

    fn fast() -> Duration {
        Duration::from_millis(10)
    }

    #[tokio::test(start_paused = true)]
    async fn successful_trial_reports_metadata() {
        let loader = FakeLoader::new(fast(), 0);
        let verifier = LoadVerifier::new(loader.clone());
        let result = verifier
            .verify("https://cdn.example.com/a.mp4", &VerifyOptions::default())
            .await;

        assert_eq!(result.status, LoadStatus::Loaded);
        assert!(result.can_load);
        assert_eq!(result.retry_count, 0);
        assert_eq!(result.ready_state, Some(ReadyState::HaveMetadata));
        assert_eq!(result.container.as_deref(), Some("mp4"));
        assert!(result.security_check.as_ref().unwrap().passed);
        assert_eq!(loader.torn_down.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_exhaustion_makes_three_attempts() {
        let loader = FakeLoader::new(fast(), usize::MAX);
        let verifier = LoadVerifier::new(loader.clone());
        let options = VerifyOptions::basic().with_retries(2, Duration::from_millis(100));

        let result = verifier.verify("https://cdn.example.com/broken.mp4", &options).await;
        assert_eq!(result.status, LoadStatus::Failed);
        assert_eq!(loader.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(result.retry_count, 2);
        let error = result.error.unwrap();
        assert!(error.starts_with("Failed after 3 attempts"), "{error}");
        assert!(error.contains("Network error"), "{error}");
    }

    #[tokio::test(start_paused = true)]
    async fn retry_succeeds_on_later_attempt_with_growing_delay() {
        let loader = FakeLoader::new(fast(), 2);
        let verifier = LoadVerifier::new(loader.clone());
        let options = VerifyOptions::basic().with_retries(3, Duration::from_millis(100));

        let start = Instant::now();
        let result = verifier.verify("https://cdn.example.com/flaky.mp4", &options).await;
        assert!(result.can_load);
        assert_eq!(result.retry_count, 2);
        // 3 attempts x 10ms plus delays of 100ms and 200ms.
        assert_eq!(start.elapsed(), Duration::from_millis(330));
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_grow_per_attempt_and_tear_down() {
        let loader = FakeLoader::new(Duration::from_secs(3600), 0);
        let verifier = LoadVerifier::new(loader.clone());
        let options = VerifyOptions::basic()
            .with_timeout(Duration::from_secs(1))
            .with_retries(1, Duration::from_millis(500));

        let start = Instant::now();
        let result = verifier.verify("https://cdn.example.com/hang.mp4", &options).await;
        assert_eq!(result.status, LoadStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("Failed after 2 attempts: Load test timeout after 2000ms"));
        assert_eq!(result.network_state, Some(NetworkState::Loading));
        // 1s + 0.5s delay + 2s.
        assert_eq!(start.elapsed(), Duration::from_millis(3500));
        assert_eq!(loader.torn_down.load(Ordering::SeqCst), 2);
        assert_eq!(loader.in_flight.load(Ordering::SeqCst), 0);
        assert_eq!(verifier.stats().active, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_verify_cancels_trial_and_frees_slot() {
        let loader = FakeLoader::new(Duration::from_secs(3600), 0);
        let verifier = LoadVerifier::new(loader.clone()).with_max_concurrent(1);
        let options = VerifyOptions::basic().with_timeout(Duration::from_secs(60));

        let abandoned = tokio::time::timeout(
            Duration::from_secs(1),
            verifier.verify("https://cdn.example.com/hang.mp4", &options),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(loader.torn_down.load(Ordering::SeqCst), 1);
        assert_eq!(loader.in_flight.load(Ordering::SeqCst), 0);
        assert_eq!(verifier.stats().active, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn security_rejection_is_not_retried() {
        let loader = FakeLoader::new(fast(), 0);
        let verifier = LoadVerifier::new(loader.clone());
        let options = VerifyOptions::default()
            .with_trusted_domains(["trusted.example"])
            .with_retries(2, Duration::from_millis(100));

        let result = verifier.verify("https://elsewhere.net/a.mp4", &options).await;
        assert_eq!(result.status, LoadStatus::Rejected);
        assert!(!result.can_load);
        assert_eq!(result.retry_count, 0);
        assert_eq!(
            result.security_check.unwrap().issues,
            vec![SecurityIssue::UntrustedDomain]
        );
        assert_eq!(result.error.as_deref(), Some("Security check failed: Untrusted domain"));
        assert_eq!(loader.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_declared_length_is_rejected() {
        let probe = Arc::new(StubProbe(HeadResponse {
            status: 200,
            content_type: Some("video/mp4".into()),
            content_length: Some(10 * 1024 * 1024 * 1024),
        }));
        let verifier = LoadVerifier::new(FakeLoader::new(fast(), 0)).with_probe(probe);
        let result = verifier
            .verify("https://cdn.example.com/huge.mp4", &VerifyOptions::default())
            .await;
        assert_eq!(result.status, LoadStatus::Rejected);
        assert_eq!(result.error.as_deref(), Some("Security check failed: File too large"));
    }

    #[tokio::test(start_paused = true)]
    async fn constrained_host_skips_trial() {
        let env = HostEnvironment {
            network: NetworkInfo {
                save_data: Some(true),
                ..NetworkInfo::default()
            },
            ..HostEnvironment::default()
        };
        let loader = FakeLoader::new(fast(), 0);
        let verifier = LoadVerifier::new(loader.clone())
            .with_environment(Arc::new(StaticEnvironment(env)));

        let result = verifier
            .verify("https://cdn.example.com/a.mp4", &VerifyOptions::default())
            .await;
        assert!(result.is_skipped());
        assert!(!result.can_load);
        assert_eq!(result.network_info.unwrap().save_data, Some(true));
        assert_eq!(loader.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_ceiling_is_respected() {
        let loader = FakeLoader::new(Duration::from_millis(100), 0);
        let verifier = Arc::new(LoadVerifier::new(loader.clone()).with_max_concurrent(3));
        let options = VerifyOptions::basic();

        let mut handles = Vec::new();
        for i in 0..10 {
            let verifier = Arc::clone(&verifier);
            let options = options.clone();
            handles.push(tokio::spawn(async move {
                verifier
                    .verify(&format!("https://cdn.example.com/{i}.mp4"), &options)
                    .await
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap().can_load);
        }
        assert_eq!(loader.attempts.load(Ordering::SeqCst), 10);
        assert_eq!(loader.peak.load(Ordering::SeqCst), 3);
        let stats = verifier.stats();
        assert_eq!((stats.active, stats.queued, stats.max_concurrent), (0, 0, 3));
    }

    #[tokio::test(start_paused = true)]
    async fn verify_many_preserves_order_and_pauses_between_chunks() {
        let loader = FakeLoader::new(Duration::from_millis(10), 0);
        let verifier = LoadVerifier::new(loader.clone())
            .with_batching(2, Duration::from_millis(100));
        let sources: Vec<String> = (0..5).map(|i| format!("https://h/{i}.mp4")).collect();

        let start = Instant::now();
        let results = verifier.verify_many(&sources, &VerifyOptions::basic()).await;
        let names: Vec<_> = results.iter().map(|(s, _)| s.clone()).collect();
        assert_eq!(names, sources);
        assert!(results.iter().all(|(_, r)| r.can_load));
        assert!(loader.peak.load(Ordering::SeqCst) <= 2);
        // 3 chunks x 10ms + 2 pauses x 100ms.
        assert_eq!(start.elapsed(), Duration::from_millis(230));
    }

    #[tokio::test(start_paused = true)]
    async fn cleared_queue_returns_cancelled() {
        let loader = FakeLoader::new(Duration::from_secs(10), 0);
        let verifier = Arc::new(LoadVerifier::new(loader).with_max_concurrent(1));

        let running = {
            let verifier = Arc::clone(&verifier);
            tokio::spawn(async move { verifier.verify_basic("https://h/a.mp4", Duration::from_secs(30)).await })
        };
        let queued = {
            let verifier = Arc::clone(&verifier);
            tokio::spawn(async move { verifier.verify_basic("https://h/b.mp4", Duration::from_secs(30)).await })
        };
        while verifier.stats().queued == 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(verifier.clear_queue(), 1);
        let cancelled = queued.await.unwrap();
        assert_eq!(cancelled.status, LoadStatus::Cancelled);
        assert_eq!(cancelled.error.as_deref(), Some("Test queue cleared"));
        assert!(running.await.unwrap().can_load);
    }

    #[tokio::test(start_paused = true)]
    async fn quick_check_uses_single_attempt() {
        let loader = FakeLoader::new(fast(), usize::MAX);
        let verifier = LoadVerifier::new(loader.clone());
        assert!(!verifier.quick_check("https://h/a.mp4", Duration::from_secs(2)).await);
        assert_eq!(loader.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn full_preload_reaches_enough_data() {
        let verifier = LoadVerifier::new(FakeLoader::new(fast(), 0));
        let options = VerifyOptions::basic().with_preload(Preload::Full);
        let result = verifier.verify("https://h/a.mp4", &options).await;
        assert_eq!(result.ready_state, Some(ReadyState::HaveEnoughData));
    }
}
