use std::sync::Arc;

use tracing::debug;

use super::builtin::{
    AdaptiveDashBackend, AdaptiveHlsBackend, NativeBackend, RealtimeBackend, VimeoEmbedBackend,
    YouTubeEmbedBackend,
};
use super::PlaybackBackend;
use crate::types::BackendId;

/// Builds a fresh backend instance.
pub type BackendFactory = Arc<dyn Fn() -> Box<dyn PlaybackBackend> + Send + Sync>;

struct Registration {
    id: BackendId,
    factory: BackendFactory,
}

/// Ordered table of backend factories. Position is priority: index 0
/// wins ties.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    entries: Vec<Arc<Registration>>,
}

impl BackendRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-ins in default priority: HLS, DASH, `YouTube`, Vimeo, WebRTC, native.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(BackendId::ADAPTIVE_HLS, || Box::new(AdaptiveHlsBackend::new()));
        registry.register(BackendId::ADAPTIVE_DASH, || Box::new(AdaptiveDashBackend::new()));
        registry.register(BackendId::EMBED_YOUTUBE, || Box::new(YouTubeEmbedBackend::new()));
        registry.register(BackendId::EMBED_VIMEO, || Box::new(VimeoEmbedBackend::new()));
        registry.register(BackendId::REALTIME, || Box::new(RealtimeBackend::new()));
        registry.register(BackendId::NATIVE, || Box::new(NativeBackend::new()));
        registry
    }

    /// Append a backend at the lowest priority. An existing registration
    /// with the same identity is replaced in place.
    pub fn register<F>(&mut self, id: BackendId, factory: F)
    where
        F: Fn() -> Box<dyn PlaybackBackend> + Send + Sync + 'static,
    {
        let registration = Arc::new(Registration {
            id: id.clone(),
            factory: Arc::new(factory),
        });
        if let Some(slot) = self.entries.iter_mut().find(|r| r.id == id) {
            *slot = registration;
        } else {
            self.entries.push(registration);
        }
        debug!(backend = %id, "backend registered");
    }

    /// Register at `index` (clamped), shifting lower priorities down.
    pub fn insert<F>(&mut self, index: usize, id: BackendId, factory: F)
    where
        F: Fn() -> Box<dyn PlaybackBackend> + Send + Sync + 'static,
    {
        self.entries.retain(|r| r.id != id);
        let index = index.min(self.entries.len());
        self.entries.insert(
            index,
            Arc::new(Registration {
                id: id.clone(),
                factory: Arc::new(factory),
            }),
        );
        debug!(backend = %id, index, "backend inserted");
    }

    /// Remove a registration. Returns `false` if it was not present.
    pub fn unregister(&mut self, id: &BackendId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|r| &r.id != id);
        before != self.entries.len()
    }

    #[must_use]
    pub fn contains(&self, id: &BackendId) -> bool {
        self.position(id).is_some()
    }

    /// Registration index of `id`.
    #[must_use]
    pub fn position(&self, id: &BackendId) -> Option<usize> {
        self.entries.iter().position(|r| &r.id == id)
    }

    /// Fresh instance of `id`.
    #[must_use]
    pub fn create(&self, id: &BackendId) -> Option<Box<dyn PlaybackBackend>> {
        self.entries
            .iter()
            .find(|r| &r.id == id)
            .map(|r| (r.factory)())
    }

    /// Identities in priority order.
    pub fn ids(&self) -> impl Iterator<Item = &BackendId> {
        self.entries.iter().map(|r| &r.id)
    }

    /// Identities in priority order with `preferred` moved to the front.
    /// Preferred ids keep the caller's order; unknown ones are ignored.
    #[must_use]
    pub fn ordered(&self, preferred: &[BackendId]) -> Vec<(usize, BackendId)> {
        let mut order: Vec<(usize, BackendId)> = Vec::with_capacity(self.entries.len());
        let preferred = preferred.iter().filter_map(|id| self.position(id).map(|i| (i, id)));
        for (i, id) in preferred.chain(self.ids().enumerate()) {
            if !order.iter().any(|(_, seen)| seen == id) {
                order.push((i, id.clone()));
            }
        }
        order
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(registry: &BackendRegistry) -> Vec<String> {
        registry.ids().map(ToString::to_string).collect()
    }

    #[test]
    fn builtins_in_priority_order() {
        let registry = BackendRegistry::with_builtins();
        assert_eq!(
            names(&registry),
            vec![
                "adaptive-hls",
                "adaptive-dash",
                "embed-youtube",
                "embed-vimeo",
                "realtime-webrtc",
                "native"
            ]
        );
    }

    #[test]
    fn create_builds_instances_by_identity() {
        let registry = BackendRegistry::with_builtins();
        let a = registry.create(&BackendId::NATIVE).unwrap();
        let b = registry.create(&BackendId::NATIVE).unwrap();
        assert_eq!(a.identity(), BackendId::NATIVE);
        assert_eq!(b.identity(), BackendId::NATIVE);
        assert!(registry.create(&BackendId::custom("nope")).is_none());
    }

    #[test]
    fn insert_places_custom_backend_at_priority() {
        let mut registry = BackendRegistry::with_builtins();
        registry.insert(0, BackendId::custom("mine"), || Box::new(NativeBackend::new()));
        assert_eq!(registry.position(&BackendId::custom("mine")), Some(0));
        assert_eq!(registry.position(&BackendId::ADAPTIVE_HLS), Some(1));
        assert_eq!(registry.len(), 7);

        assert!(registry.unregister(&BackendId::custom("mine")));
        assert!(!registry.unregister(&BackendId::custom("mine")));
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn register_replaces_existing_identity_in_place() {
        let mut registry = BackendRegistry::with_builtins();
        registry.register(BackendId::ADAPTIVE_DASH, || Box::new(NativeBackend::new()));
        assert_eq!(registry.len(), 6);
        assert_eq!(registry.position(&BackendId::ADAPTIVE_DASH), Some(1));
    }

    #[test]
    fn preferred_backends_move_to_front() {
        let registry = BackendRegistry::with_builtins();
        let order = registry.ordered(&[
            BackendId::NATIVE,
            BackendId::custom("unknown"),
            BackendId::ADAPTIVE_DASH,
        ]);
        let ids: Vec<_> = order.iter().map(|(_, id)| id.to_string()).collect();
        assert_eq!(
            ids,
            vec![
                "native",
                "adaptive-dash",
                "adaptive-hls",
                "embed-youtube",
                "embed-vimeo",
                "realtime-webrtc"
            ]
        );
        // Registration index is kept for tie-breaking.
        assert_eq!(order[0], (5, BackendId::NATIVE));
    }
}
