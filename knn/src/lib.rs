//! Online embedding-based k-nearest-neighbour classifier.
//!
//! A user teaches classes by example ("add a HAPPY sample") from a live feed.
//! Each example is an embedding produced by an external feature extractor;
//! classifying a new embedding is a brute-force similarity search followed by
//! a majority vote among the `k` most similar examples.
//!
//! # Usage
//!
//! ```
//! use teachable_knn::{Classifier, EmbeddingVector, ExampleStore};
//!
//! let mut store = ExampleStore::new();
//! store.add("HAPPY", EmbeddingVector::normalize(&[1.0, 0.0, 0.2])?)?;
//! store.add("SAD", EmbeddingVector::normalize(&[0.0, 1.0, 0.1])?)?;
//!
//! let query = EmbeddingVector::normalize(&[0.9, 0.1, 0.2])?;
//! let prediction = Classifier::new().predict(&store, &query, 1)?;
//! assert_eq!(prediction.label(), Some("HAPPY"));
//! # Ok::<(), teachable_knn::KnnError>(())
//! ```
//!
//! # Design
//!
//! All operations here are synchronous and pure computation. Frame capture
//! and feature extraction live with the caller. [`SharedStore`] adds the
//! locking needed when teaching and prediction run on different tasks.
//!
//! The example set is expected to stay small (tens to hundreds of rows), so
//! there is no index structure: every prediction scans all rows.

mod classifier;
mod embedding;
mod error;
mod prediction;
mod shared;
mod store;

pub use classifier::{Classifier, TieBreak};
pub use embedding::EmbeddingVector;
pub use error::KnnError;
pub use prediction::{Confidence, Neighbor, Prediction, Vote};
pub use shared::SharedStore;
pub use store::{ExampleMatrix, ExampleStore};
