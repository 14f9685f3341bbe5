use parking_lot::RwLock;

use crate::classifier::Classifier;
use crate::embedding::EmbeddingVector;
use crate::error::KnnError;
use crate::prediction::Prediction;
use crate::store::ExampleStore;

/// An [`ExampleStore`] shared between a teaching writer and any number of
/// predicting readers.
///
/// `add` holds the write lock for the whole append, so readers see the store
/// either before or after an example, never in between. `predict` holds the
/// read lock for the whole computation; concurrent predictions do not block
/// each other.
pub struct SharedStore {
    inner: RwLock<ExampleStore>,
}

impl SharedStore {
    pub fn new() -> Self {
        Self::from_store(ExampleStore::new())
    }

    pub fn from_store(store: ExampleStore) -> Self {
        Self {
            inner: RwLock::new(store),
        }
    }

    /// Appends one example. See [`ExampleStore::add`].
    pub fn add(&self, label: &str, vector: EmbeddingVector) -> Result<(), KnnError> {
        self.inner.write().add(label, vector)
    }

    /// Classifies `query` against a consistent view of the store.
    pub fn predict(
        &self,
        classifier: &Classifier,
        query: &EmbeddingVector,
        k: usize,
    ) -> Result<Prediction, KnnError> {
        let store = self.inner.read();
        classifier.predict(&store, query, k)
    }

    /// Runs `f` against a consistent view of the store.
    pub fn read<R>(&self, f: impl FnOnce(&ExampleStore) -> R) -> R {
        f(&*self.inner.read())
    }

    pub fn total_examples(&self) -> usize {
        self.inner.read().total_examples()
    }

    pub fn generation(&self) -> u64 {
        self.inner.read().generation()
    }

    pub fn into_inner(self) -> ExampleStore {
        self.inner.into_inner()
    }
}

impl Default for SharedStore {
    fn default() -> Self {
        Self::new()
    }
}
