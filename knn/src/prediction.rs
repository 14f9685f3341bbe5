use serde::Serialize;

/// Votes one label received among the selected neighbours.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vote {
    pub label: String,
    pub count: usize,
    /// Mean similarity of this label's selected neighbours.
    pub mean_similarity: f32,
}

/// Share of the requested k that voted for a label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Confidence {
    pub label: String,
    pub value: f32,
}

/// One selected example.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbor {
    /// Row in the store's example matrix.
    pub row: usize,
    pub label: String,
    /// Cosine similarity to the query, in `[-1, 1]`.
    pub similarity: f32,
}

/// Outcome of one classification.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Prediction {
    /// Winning label. `None` means no prediction (empty store).
    pub label: Option<String>,

    /// Effective k: how many neighbours took part in the vote.
    pub k: usize,

    /// Votes in the order each label was first met while scanning the
    /// neighbours. Labels with no selected neighbour are absent.
    pub votes: Vec<Vote>,

    /// One entry per class known to the store, in class order,
    /// computed as `votes / requested k`.
    pub confidences: Vec<Confidence>,

    /// Selected neighbours, most similar first.
    pub neighbors: Vec<Neighbor>,
}

impl Prediction {
    /// The "no prediction" outcome.
    pub fn none() -> Self {
        Self::default()
    }

    /// True when no label was predicted.
    pub fn is_empty(&self) -> bool {
        self.label.is_none()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Vote count for `label`, `None` if it received no vote.
    pub fn votes_for(&self, label: &str) -> Option<usize> {
        self.votes
            .iter()
            .find(|v| v.label == label)
            .map(|v| v.count)
    }

    /// Confidence for `label`, 0 for labels without votes.
    pub fn confidence_for(&self, label: &str) -> f32 {
        self.confidences
            .iter()
            .find(|c| c.label == label)
            .map_or(0.0, |c| c.value)
    }
}
