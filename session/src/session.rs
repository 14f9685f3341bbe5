use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use teachable_knn::{Classifier, EmbeddingVector, ExampleStore, Prediction, SharedStore};
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::extractor::{FeatureExtractor, Frame};

/// A live teaching session: frames go through the feature extractor, then
/// either become examples ([`Session::teach`]) or queries
/// ([`Session::classify`]).
///
/// Thread-safe: teaching and classification may be called from different
/// tasks. The store is the only mutable state; `k` is an atomic so the UI can
/// adjust it while the ticker is running.
pub struct Session {
    store: Arc<SharedStore>,
    extractor: Arc<dyn FeatureExtractor>,
    classifier: Classifier,
    k: AtomicUsize,
    cfg: SessionConfig,
}

impl Session {
    /// Creates a session with an empty store. When the extractor reports a
    /// dimension, the store only accepts vectors of that length.
    pub fn new(
        cfg: SessionConfig,
        extractor: Arc<dyn FeatureExtractor>,
    ) -> Result<Self, SessionError> {
        let store = match extractor.dimension() {
            0 => ExampleStore::new(),
            dim => ExampleStore::with_dimension(dim)?,
        };
        Self::with_store(cfg, extractor, Arc::new(SharedStore::from_store(store)))
    }

    /// Creates a session over an existing store.
    pub fn with_store(
        cfg: SessionConfig,
        extractor: Arc<dyn FeatureExtractor>,
        store: Arc<SharedStore>,
    ) -> Result<Self, SessionError> {
        cfg.validate()?;
        Ok(Self {
            store,
            extractor,
            classifier: Classifier::with_tie_break(cfg.tie_break),
            k: AtomicUsize::new(cfg.clamp_k(cfg.k)),
            cfg,
        })
    }

    pub fn store(&self) -> &Arc<SharedStore> {
        &self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.cfg
    }

    /// Current neighbour count.
    pub fn k(&self) -> usize {
        self.k.load(Ordering::Relaxed)
    }

    /// Sets `k`, clamped to the configured range. Returns the stored value.
    pub fn set_k(&self, k: usize) -> usize {
        let k = self.cfg.clamp_k(k);
        self.k.store(k, Ordering::Relaxed);
        k
    }

    /// Extracts and normalizes the embedding of `frame`.
    ///
    /// Returns `Ok(None)` when the extractor produced nothing; the failure is
    /// logged and not propagated.
    pub async fn embed(&self, frame: &Frame) -> Result<Option<EmbeddingVector>, SessionError> {
        let raw = match self.extractor.extract(frame).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("session: no embedding for frame: {}", e);
                return Ok(None);
            }
        };
        Ok(Some(EmbeddingVector::normalize(&raw)?))
    }

    /// Adds the embedding of `frame` as an example of `label`.
    ///
    /// Returns `Ok(false)` when no embedding was produced.
    pub async fn teach(&self, label: &str, frame: &Frame) -> Result<bool, SessionError> {
        let Some(emb) = self.embed(frame).await? else {
            return Ok(false);
        };
        if let Err(e) = self.store.add(label, emb) {
            warn!("session: rejected example for {}: {}", label, e);
            return Err(e.into());
        }
        debug!(
            "session: taught {} ({} examples)",
            label,
            self.store.total_examples()
        );
        Ok(true)
    }

    /// Classifies `frame` with the current `k`.
    ///
    /// Returns `Ok(None)` when no embedding was produced. An empty store
    /// yields `Ok(Some(Prediction::none()))`.
    pub async fn classify(&self, frame: &Frame) -> Result<Option<Prediction>, SessionError> {
        Ok(self.classify_tagged(frame).await?.map(|(_, p)| p))
    }

    /// Like [`classify`](Self::classify), also returning the store generation
    /// the prediction was computed against.
    pub async fn classify_tagged(
        &self,
        frame: &Frame,
    ) -> Result<Option<(u64, Prediction)>, SessionError> {
        let Some(query) = self.embed(frame).await? else {
            return Ok(None);
        };
        let k = self.k();
        let (generation, prediction) = self.store.read(|store| {
            self.classifier
                .predict(store, &query, k)
                .map(|p| (store.generation(), p))
        })?;
        Ok(Some((generation, prediction)))
    }
}
