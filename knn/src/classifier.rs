use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embedding::EmbeddingVector;
use crate::error::KnnError;
use crate::prediction::{Confidence, Neighbor, Prediction, Vote};
use crate::store::{ExampleMatrix, ExampleStore};

/// How to pick a winner when several labels share the highest vote count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The label met first while scanning neighbours from most to least
    /// similar wins.
    #[default]
    FirstEncountered,

    /// The label whose selected neighbours have the highest mean similarity
    /// wins. Exact ties fall back to [`TieBreak::FirstEncountered`].
    HighestMeanSimilarity,
}

/// Brute-force k-nearest-neighbour classifier.
///
/// Holds no state besides its tie-break policy; every call to
/// [`Classifier::predict`] reads the store and returns a fresh result, so a
/// single classifier can serve concurrent readers.
///
/// # Algorithm
///
/// 1. Similarity of the query against every stored row (one matrix-vector
///    product, rows are unit length so this is cosine similarity).
/// 2. Keep the `min(k, total)` rows with the highest similarity. Equal
///    similarities keep the lower row first.
/// 3. Count one vote per selected row for its label.
/// 4. The label with the most votes wins; ties follow [`TieBreak`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    tie_break: TieBreak,
}

struct Tally<'a> {
    label: &'a str,
    count: usize,
    similarity_sum: f64,
}

impl Tally<'_> {
    fn mean(&self) -> f64 {
        self.similarity_sum / self.count as f64
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tie_break(tie_break: TieBreak) -> Self {
        Self { tie_break }
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Classifies `query` against the examples in `store` using `k`
    /// neighbours.
    ///
    /// An empty store yields [`Prediction::none`]. Otherwise `k` must be
    /// positive and `query` must match the store's dimension.
    pub fn predict(
        &self,
        store: &ExampleStore,
        query: &EmbeddingVector,
        k: usize,
    ) -> Result<Prediction, KnnError> {
        let Some(matrix) = store.example_matrix() else {
            return Ok(Prediction::none());
        };
        if k == 0 {
            return Err(KnnError::InvalidArgument(
                "k must be a positive integer".into(),
            ));
        }
        if query.dimension() != matrix.dimension() {
            return Err(KnnError::DimensionMismatch {
                expected: matrix.dimension(),
                got: query.dimension(),
            });
        }

        let k_eff = k.min(matrix.len());
        let scores = similarities(&matrix, query);
        let top = top_k(&scores, k_eff);

        let mut tallies: Vec<Tally<'_>> = Vec::new();
        let mut neighbors = Vec::with_capacity(k_eff);
        for &row in &top {
            let label = store.label_at(row)?;
            let similarity = scores[row];
            match tallies.iter_mut().find(|t| t.label == label) {
                Some(t) => {
                    t.count += 1;
                    t.similarity_sum += similarity as f64;
                }
                None => tallies.push(Tally {
                    label,
                    count: 1,
                    similarity_sum: similarity as f64,
                }),
            }
            neighbors.push(Neighbor {
                row,
                label: label.to_string(),
                similarity,
            });
        }

        let winner = self.winner(&tallies).map(|i| tallies[i].label.to_string());

        let confidences = store
            .labels()
            .map(|label| {
                let count = tallies
                    .iter()
                    .find(|t| t.label == label)
                    .map_or(0, |t| t.count);
                Confidence {
                    label: label.to_string(),
                    value: count as f32 / k as f32,
                }
            })
            .collect();

        let votes = tallies
            .iter()
            .map(|t| Vote {
                label: t.label.to_string(),
                count: t.count,
                mean_similarity: t.mean() as f32,
            })
            .collect();

        debug!(
            "knn: predicted {:?} k={} examples={}",
            winner,
            k_eff,
            matrix.len()
        );

        Ok(Prediction {
            label: winner,
            k: k_eff,
            votes,
            confidences,
            neighbors,
        })
    }

    /// Index of the winning tally. Scans left to right and only replaces the
    /// current best on a strictly better candidate.
    fn winner(&self, tallies: &[Tally<'_>]) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, t) in tallies.iter().enumerate() {
            let better = match best {
                None => true,
                Some(b) => {
                    let cur = &tallies[b];
                    match self.tie_break {
                        TieBreak::FirstEncountered => t.count > cur.count,
                        TieBreak::HighestMeanSimilarity => {
                            t.count > cur.count
                                || (t.count == cur.count && t.mean() > cur.mean())
                        }
                    }
                }
            };
            if better {
                best = Some(i);
            }
        }
        best
    }
}

/// Similarity of `query` against every row of `matrix`.
fn similarities(matrix: &ExampleMatrix<'_>, query: &EmbeddingVector) -> Vec<f32> {
    matrix.rows().map(|row| query.similarity(row)).collect()
}

/// Rows of the `k` highest scores, best first. Equal scores rank the lower
/// row first. `k` must be in `1..=scores.len()`.
fn top_k(scores: &[f32], k: usize) -> Vec<usize> {
    let rank = |a: &usize, b: &usize| {
        scores[*b]
            .partial_cmp(&scores[*a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(b))
    };

    let mut rows: Vec<usize> = (0..scores.len()).collect();
    if k < rows.len() {
        rows.select_nth_unstable_by(k - 1, rank);
        rows.truncate(k);
    }
    rows.sort_unstable_by(rank);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(raw: &[f32]) -> EmbeddingVector {
        EmbeddingVector::normalize(raw).unwrap()
    }

    /// 2-d unit vector whose similarity to `[1, 0]` is `cos`.
    fn at_cos(cos: f32) -> EmbeddingVector {
        emb(&[cos, (1.0 - cos * cos).sqrt()])
    }

    #[test]
    fn test_empty_store_no_prediction() {
        let store = ExampleStore::new();
        let p = Classifier::new().predict(&store, &emb(&[1.0, 0.0]), 3).unwrap();
        assert_eq!(p, Prediction::none());
        assert!(p.votes.is_empty());
    }

    #[test]
    fn test_empty_store_ignores_k() {
        let store = ExampleStore::new();
        let p = Classifier::new().predict(&store, &emb(&[1.0]), 0).unwrap();
        assert!(p.is_empty());
    }

    #[test]
    fn test_zero_k_rejected() {
        let mut store = ExampleStore::new();
        store.add("A", emb(&[1.0, 0.0])).unwrap();
        let err = Classifier::new()
            .predict(&store, &emb(&[1.0, 0.0]), 0)
            .unwrap_err();
        assert!(matches!(err, KnnError::InvalidArgument(_)));
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let mut store = ExampleStore::new();
        store.add("A", emb(&[1.0, 0.0])).unwrap();
        let err = Classifier::new()
            .predict(&store, &emb(&[1.0, 0.0, 0.0]), 1)
            .unwrap_err();
        assert_eq!(err, KnnError::DimensionMismatch { expected: 2, got: 3 });
    }

    #[test]
    fn test_both_neighbours_from_same_class() {
        let mut store = ExampleStore::new();
        store.add("A", emb(&[1.0, 0.0, 0.0, 0.0])).unwrap();
        store.add("A", emb(&[0.0, 1.0, 0.0, 0.0])).unwrap();
        store.add("B", emb(&[0.0, 0.0, 1.0, 0.0])).unwrap();

        let query = emb(&[0.9, 0.1, 0.0, 0.0]);
        let p = Classifier::new().predict(&store, &query, 2).unwrap();

        assert_eq!(p.label(), Some("A"));
        assert_eq!(p.k, 2);
        assert_eq!(p.votes_for("A"), Some(2));
        assert_eq!(p.votes_for("B"), None);
        assert_eq!(p.votes.len(), 1);

        let rows: Vec<usize> = p.neighbors.iter().map(|n| n.row).collect();
        assert_eq!(rows, vec![0, 1]);
        assert!((p.neighbors[0].similarity - 0.9939).abs() < 1e-3);
        assert!((p.neighbors[1].similarity - 0.1104).abs() < 1e-3);

        assert_eq!(p.confidence_for("A"), 1.0);
        assert_eq!(p.confidence_for("B"), 0.0);
        assert_eq!(p.confidences.len(), 2);
    }

    #[test]
    fn test_vote_tie_first_added_wins() {
        let mut store = ExampleStore::new();
        store.add("A", emb(&[0.9, 0.19f32.sqrt(), 0.0])).unwrap();
        store.add("B", emb(&[0.9, 0.0, 0.19f32.sqrt()])).unwrap();

        let query = emb(&[1.0, 0.0, 0.0]);
        let p = Classifier::new().predict(&store, &query, 2).unwrap();
        assert_eq!(p.neighbors[0].similarity, p.neighbors[1].similarity);
        assert!((p.neighbors[0].similarity - 0.9).abs() < 1e-6);

        assert_eq!(p.votes_for("A"), Some(1));
        assert_eq!(p.votes_for("B"), Some(1));
        assert_eq!(p.label(), Some("A"));
        assert_eq!(p.votes[0].label, "A");
    }

    #[test]
    fn test_vote_tie_follows_class_order_not_label_name() {
        let mut store = ExampleStore::new();
        store.add("ZED", emb(&[1.0, 1.0])).unwrap();
        store.add("ALPHA", emb(&[1.0, 1.0])).unwrap();

        let p = Classifier::new().predict(&store, &emb(&[1.0, 0.0]), 2).unwrap();
        assert_eq!(p.label(), Some("ZED"));
    }

    #[test]
    fn test_equal_similarity_prefers_lower_row() {
        let mut store = ExampleStore::new();
        store.add("B", emb(&[0.0, 1.0])).unwrap();
        store.add("A", emb(&[0.0, 1.0])).unwrap();
        store.add("A", emb(&[0.0, 1.0])).unwrap();

        let p = Classifier::new().predict(&store, &emb(&[0.0, 1.0]), 1).unwrap();
        assert_eq!(p.neighbors[0].row, 0);
        assert_eq!(p.label(), Some("B"));

        let p = Classifier::new().predict(&store, &emb(&[0.0, 1.0]), 2).unwrap();
        let rows: Vec<usize> = p.neighbors.iter().map(|n| n.row).collect();
        assert_eq!(rows, vec![0, 1]);
        assert_eq!(p.label(), Some("B"));
    }

    #[test]
    fn test_k_clamps_to_total_examples() {
        let mut store = ExampleStore::new();
        store.add("A", emb(&[1.0, 0.0])).unwrap();
        store.add("A", emb(&[1.0, 0.2])).unwrap();
        store.add("B", emb(&[0.0, 1.0])).unwrap();

        let p = Classifier::new().predict(&store, &emb(&[1.0, 0.1]), 10).unwrap();
        assert_eq!(p.k, 3);
        assert_eq!(p.neighbors.len(), 3);
        assert_eq!(p.votes_for("A"), Some(2));
        assert_eq!(p.votes_for("B"), Some(1));
        assert_eq!(p.label(), Some("A"));
        // Confidence is relative to the requested k.
        assert!((p.confidence_for("A") - 0.2).abs() < 1e-6);
        assert!((p.confidence_for("B") - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_majority_beats_single_closest() {
        let mut store = ExampleStore::new();
        store.add("NEAR", at_cos(0.99)).unwrap();
        store.add("CROWD", at_cos(0.9)).unwrap();
        store.add("CROWD", at_cos(0.85)).unwrap();
        store.add("FAR", at_cos(-0.5)).unwrap();

        let query = emb(&[1.0, 0.0]);
        let p = Classifier::new().predict(&store, &query, 1).unwrap();
        assert_eq!(p.label(), Some("NEAR"));

        let p = Classifier::new().predict(&store, &query, 3).unwrap();
        assert_eq!(p.label(), Some("CROWD"));
        assert_eq!(p.votes_for("CROWD"), Some(2));
        assert_eq!(p.votes_for("FAR"), None);
    }

    #[test]
    fn test_neighbours_sorted_by_similarity() {
        let mut store = ExampleStore::new();
        let cosines = [0.1, 0.7, -0.3, 0.95, 0.5, 0.2, 0.8];
        for (i, &c) in cosines.iter().enumerate() {
            let label = if i % 2 == 0 { "EVEN" } else { "ODD" };
            store.add(label, at_cos(c)).unwrap();
        }

        let p = Classifier::new().predict(&store, &emb(&[1.0, 0.0]), 4).unwrap();
        let sims: Vec<f32> = p.neighbors.iter().map(|n| n.similarity).collect();
        assert_eq!(sims.len(), 4);
        for w in sims.windows(2) {
            assert!(w[0] >= w[1], "not descending: {sims:?}");
        }
        assert!((sims[0] - 0.95).abs() < 1e-5);
        assert!((sims[3] - 0.5).abs() < 1e-5);
        for n in &p.neighbors {
            assert_eq!(store.label_at(n.row).unwrap(), n.label);
        }
    }

    #[test]
    fn test_first_encountered_vs_mean_similarity() {
        let mut store = ExampleStore::new();
        store.add("A", at_cos(0.95)).unwrap();
        store.add("A", at_cos(0.1)).unwrap();
        store.add("B", at_cos(0.8)).unwrap();
        store.add("B", at_cos(0.7)).unwrap();
        let query = emb(&[1.0, 0.0]);

        let p = Classifier::new().predict(&store, &query, 4).unwrap();
        assert_eq!(p.votes_for("A"), Some(2));
        assert_eq!(p.votes_for("B"), Some(2));
        assert_eq!(p.label(), Some("A"));

        let p = Classifier::with_tie_break(TieBreak::HighestMeanSimilarity)
            .predict(&store, &query, 4)
            .unwrap();
        assert_eq!(p.label(), Some("B"));
        assert!((p.votes[1].mean_similarity - 0.75).abs() < 1e-5);
    }

    #[test]
    fn test_mean_similarity_exact_tie_keeps_first() {
        let mut store = ExampleStore::new();
        store.add("A", emb(&[1.0, 1.0])).unwrap();
        store.add("B", emb(&[1.0, 1.0])).unwrap();
        let p = Classifier::with_tie_break(TieBreak::HighestMeanSimilarity)
            .predict(&store, &emb(&[1.0, 0.0]), 2)
            .unwrap();
        assert_eq!(p.label(), Some("A"));
    }

    #[test]
    fn test_repeated_predictions_identical() {
        let mut store = ExampleStore::new();
        for i in 0..20 {
            let label = ["A", "B", "C"][i % 3];
            store
                .add(label, emb(&[(i as f32).sin(), (i as f32).cos(), 0.3]))
                .unwrap();
        }
        let query = emb(&[0.2, 0.9, 0.1]);
        let c = Classifier::new();
        let first = c.predict(&store, &query, 5).unwrap();
        for _ in 0..10 {
            assert_eq!(c.predict(&store, &query, 5).unwrap(), first);
        }
    }

    #[test]
    fn test_top_k_selection() {
        let scores = [0.5, 0.9, 0.5, -1.0, 0.9, 0.1];
        assert_eq!(top_k(&scores, 1), vec![1]);
        assert_eq!(top_k(&scores, 3), vec![1, 4, 0]);
        assert_eq!(top_k(&scores, 4), vec![1, 4, 0, 2]);
        assert_eq!(top_k(&scores, 6), vec![1, 4, 0, 2, 5, 3]);
    }

    #[test]
    fn test_tie_break_serde_names() {
        let tb: TieBreak = serde_json::from_str("\"highest_mean_similarity\"").unwrap();
        assert_eq!(tb, TieBreak::HighestMeanSimilarity);
        assert_eq!(
            serde_json::to_string(&TieBreak::FirstEncountered).unwrap(),
            "\"first_encountered\""
        );
    }
}
