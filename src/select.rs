//! Backend selection.
//!
//! [`EngineSelector::select`] walks a fixed pipeline:
//!
//! ```text
//! cache-check ─hit──────────────────────────────────────────────▶ done
//!      │miss
//!      ├─ URL-shape match ─▶ capability-confirm ─┐
//!      └─ type detection ──▶ capability-confirm ─┴▶ (load-verify) ▶ rank ▶ cache-write ▶ done
//! ```
//!
//! A candidate that can play with high confidence ends the walk early.
//! Otherwise playable candidates are ranked by confidence, ties going to
//! the lower registration index. When nothing qualifies the native
//! backend is the fallback, if allowed.

use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::backend::{BackendRegistry, PlaybackBackend};
use crate::cache::{spawn_sweeper_if_runtime, CacheEntry, CacheStats, ResultCache, DEFAULT_TTL};
use crate::detect::{detect_from_url, ContentTypeDetector};
use crate::error::{ProbeError, SelectError};
use crate::net::HttpProbe;
use crate::types::{BackendId, Confidence, ContentTypeInfo, DetectionResult, LoadStatus, LoadTestResult};
use crate::verify::{LoadVerifier, VerifierStats, VerifyOptions};

/// Reason reported for cache hits.
pub const REASON_FROM_CACHE: &str = "from cache";

/// Per-call selection options.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectOptions {
    pub use_cache: bool,
    /// Confirm capability verdicts with a trial load.
    pub load_test: bool,
    pub verify: VerifyOptions,
    /// Evaluated first, in this order.
    pub preferred: Vec<BackendId>,
    pub fallback_to_native: bool,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            load_test: false,
            verify: VerifyOptions::default(),
            preferred: Vec::new(),
            fallback_to_native: true,
        }
    }
}

/// The chosen backend instance and why it was chosen.
pub struct Selection {
    pub backend: Box<dyn PlaybackBackend>,
    pub detection: DetectionResult,
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("backend", &self.backend.identity())
            .field("detection", &self.detection)
            .finish()
    }
}

/// One evaluated candidate.
struct Candidate {
    index: usize,
    backend: Box<dyn PlaybackBackend>,
    detection: DetectionResult,
}

/// Chooses a playback backend for a source.
pub struct EngineSelector {
    registry: BackendRegistry,
    cache: Arc<ResultCache>,
    detector: Arc<ContentTypeDetector>,
    verifier: Arc<LoadVerifier>,
}

impl EngineSelector {
    pub fn new(
        registry: BackendRegistry,
        cache: Arc<ResultCache>,
        detector: Arc<ContentTypeDetector>,
        verifier: Arc<LoadVerifier>,
    ) -> Self {
        Self {
            registry,
            cache,
            detector,
            verifier,
        }
    }

    /// Built-in backends, default cache, HTTP detector and verifier.
    ///
    /// Inside a tokio runtime the cache is swept every TTL period.
    pub fn http() -> Result<Self, ProbeError> {
        let cache = Arc::new(ResultCache::new());
        spawn_sweeper_if_runtime(&cache, DEFAULT_TTL);
        Ok(Self::new(
            BackendRegistry::with_builtins(),
            cache,
            Arc::new(ContentTypeDetector::new(Arc::new(HttpProbe::new()?))),
            Arc::new(LoadVerifier::http()?),
        ))
    }

    #[must_use]
    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Register or re-prioritise backends.
    pub fn registry_mut(&mut self) -> &mut BackendRegistry {
        &mut self.registry
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    #[must_use]
    pub fn detector(&self) -> &Arc<ContentTypeDetector> {
        &self.detector
    }

    #[must_use]
    pub fn verifier(&self) -> &Arc<LoadVerifier> {
        &self.verifier
    }

    /// Full selection. Fails only when nothing can play and fallback is
    /// disabled.
    #[instrument(skip(self, options), fields(source = %source))]
    pub async fn select(&self, source: &str, options: &SelectOptions) -> Result<Selection, SelectError> {
        if options.use_cache {
            if let Some(hit) = self.from_cache(source).await {
                return Ok(hit);
            }
        }

        let fast_match = self.fast_match(source);
        let content_type = if let Some(id) = &fast_match {
            debug!(backend = %id, "URL shape matched, skipping type detection");
            detect_from_url(source)
        } else {
            self.detector.detect(source).await
        };

        let mut order = self.registry.ordered(&options.preferred);
        if let Some(id) = &fast_match {
            if let Some(pos) = order.iter().position(|(_, candidate)| candidate == id) {
                let matched = order.remove(pos);
                order.insert(0, matched);
            }
        }

        let mut trial: Option<LoadTestResult> = None;
        let mut playable = Vec::new();
        for (index, id) in order {
            let Some(backend) = self.registry.create(&id) else {
                continue;
            };
            let fast = fast_match.as_ref() == Some(&id);
            let Some(mut detection) = capability(backend.as_ref(), source, content_type.as_ref(), fast) else {
                continue;
            };

            if options.load_test && backend.supports_trial_load() {
                if trial.is_none() {
                    trial = Some(self.verifier.verify(source, &options.verify).await);
                }
                if let Some(result) = &trial {
                    apply_trial(&mut detection, result.clone());
                }
            }

            debug!(
                backend = %id,
                can_play = detection.can_play,
                confidence = %detection.confidence,
                "candidate evaluated"
            );
            if !detection.can_play {
                continue;
            }
            if detection.confidence == Confidence::High {
                return Ok(self.finish(source, options, backend, detection).await);
            }
            playable.push(Candidate {
                index,
                backend,
                detection,
            });
        }

        if let Some(best) = rank(playable) {
            return Ok(self.finish(source, options, best.backend, best.detection).await);
        }

        if options.fallback_to_native {
            if let Some(native) = self.registry.create(&BackendId::NATIVE) {
                let can_play = content_type
                    .as_ref()
                    .is_some_and(|ct| native.can_handle(&ct.mime_type))
                    || native.can_handle(source);
                let detection = DetectionResult {
                    backend: BackendId::NATIVE,
                    can_play,
                    confidence: Confidence::Low,
                    content_type,
                    load_test: None,
                    reason: "no backend qualified, falling back to native playback".to_string(),
                };
                return Ok(self.finish(source, options, native, detection).await);
            }
        }

        info!("no suitable backend");
        Err(SelectError::NoSuitableBackend(source.to_string()))
    }

    /// Heuristic-only selection: no cache, no network.
    pub fn select_fast(&self, source: &str) -> Result<Box<dyn PlaybackBackend>, SelectError> {
        if let Some(backend) = self.fast_match(source).and_then(|id| self.registry.create(&id)) {
            return Ok(backend);
        }

        let content_type = detect_from_url(source);
        self.registry
            .ids()
            .filter_map(|id| self.registry.create(id))
            .find(|backend| {
                content_type
                    .as_ref()
                    .is_some_and(|ct| backend.can_handle(&ct.mime_type))
                    || backend.can_handle(source)
            })
            .or_else(|| self.registry.create(&BackendId::NATIVE))
            .ok_or_else(|| SelectError::NoSuitableBackend(source.to_string()))
    }

    /// Cache, then heuristics. Never probes, never trial-loads, never
    /// writes the cache.
    pub async fn quick_select(&self, source: &str) -> Result<Box<dyn PlaybackBackend>, SelectError> {
        if let Some(hit) = self.from_cache(source).await {
            return Ok(hit.backend);
        }
        self.select_fast(source)
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    #[must_use]
    pub fn verifier_stats(&self) -> VerifierStats {
        self.verifier.stats()
    }

    /// Cancel queued (not running) trial loads.
    pub fn clear_verify_queue(&self) -> usize {
        self.verifier.clear_queue()
    }

    /// First backend whose URL pattern matches and whose capability check
    /// confirms the source (raw or by its heuristic type).
    fn fast_match(&self, source: &str) -> Option<BackendId> {
        let heuristic = detect_from_url(source);
        self.registry
            .ids()
            .find(|id| {
                self.registry.create(id).is_some_and(|backend| {
                    backend.matches_source(source)
                        && handles(backend.as_ref(), source, heuristic.as_ref())
                })
            })
            .cloned()
    }

    async fn from_cache(&self, source: &str) -> Option<Selection> {
        let entry = self.cache.get(source).await?;
        let Some(backend) = self.registry.create(&entry.backend) else {
            debug!(backend = %entry.backend, "cached backend no longer registered");
            return None;
        };
        debug!(backend = %entry.backend, "cache hit");
        Some(Selection {
            backend,
            detection: DetectionResult {
                backend: entry.backend,
                can_play: entry.can_play,
                confidence: entry.confidence,
                content_type: entry.content_type,
                load_test: None,
                reason: REASON_FROM_CACHE.to_string(),
            },
        })
    }

    async fn finish(
        &self,
        source: &str,
        options: &SelectOptions,
        backend: Box<dyn PlaybackBackend>,
        detection: DetectionResult,
    ) -> Selection {
        if options.use_cache {
            self.cache
                .set(
                    source,
                    CacheEntry::new(
                        detection.backend.clone(),
                        detection.can_play,
                        detection.confidence,
                        detection.content_type.clone(),
                    ),
                )
                .await;
        }
        info!(
            backend = %detection.backend,
            confidence = %detection.confidence,
            reason = %detection.reason,
            "backend selected"
        );
        Selection { backend, detection }
    }
}

impl fmt::Debug for EngineSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSelector")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Capability verdict for one backend, `None` if it does not handle the
/// source at all.
fn capability(
    backend: &dyn PlaybackBackend,
    source: &str,
    content_type: Option<&ContentTypeInfo>,
    fast: bool,
) -> Option<DetectionResult> {
    let id = backend.identity();
    let (confidence, reason) = if fast && handles(backend, source, content_type) {
        (Confidence::High, format!("source matches {id} URL pattern"))
    } else if let Some(ct) = content_type.filter(|ct| backend.can_handle(&ct.mime_type)) {
        (ct.confidence, format!("{id} handles {} (from {})", ct.mime_type, ct.origin))
    } else if backend.can_handle(source) {
        (Confidence::Low, format!("{id} accepts the source string"))
    } else {
        return None;
    };

    Some(DetectionResult {
        backend: id,
        can_play: true,
        confidence,
        content_type: content_type.cloned(),
        load_test: None,
        reason,
    })
}

fn handles(backend: &dyn PlaybackBackend, source: &str, content_type: Option<&ContentTypeInfo>) -> bool {
    backend.can_handle(source) || content_type.is_some_and(|ct| backend.can_handle(&ct.mime_type))
}

/// Fold a trial outcome into a capability verdict.
fn apply_trial(detection: &mut DetectionResult, result: LoadTestResult) {
    match result.status {
        LoadStatus::Loaded => {
            detection.confidence = Confidence::High;
            detection.reason.push_str(&format!("; trial load succeeded in {}ms", result.load_time_ms));
        }
        LoadStatus::Failed | LoadStatus::Rejected => {
            detection.can_play = false;
            let error = result.error.as_deref().unwrap_or("unknown error");
            detection.reason.push_str(&format!("; trial load failed: {error}"));
        }
        LoadStatus::Skipped | LoadStatus::Cancelled => {
            detection.reason.push_str("; trial load not run");
        }
    }
    detection.load_test = Some(result);
}

/// Highest confidence wins; ties go to the lower registration index.
fn rank(candidates: Vec<Candidate>) -> Option<Candidate> {
    candidates
        .into_iter()
        .filter(|c| c.detection.can_play)
        .max_by_key(|c| (c.detection.confidence, Reverse(c.index)))
}
