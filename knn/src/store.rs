use std::collections::HashMap;
use std::fmt;
use std::slice::ChunksExact;

use tracing::debug;

use crate::embedding::EmbeddingVector;
use crate::error::KnnError;

/// Read-only row-major view over stored embeddings.
///
/// Rows are laid out contiguously so a prediction is a single pass over one
/// buffer.
#[derive(Clone, Copy)]
pub struct ExampleMatrix<'a> {
    data: &'a [f32],
    dim: usize,
}

impl<'a> ExampleMatrix<'a> {
    /// Length of every row.
    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row `i`, or `None` past the end.
    pub fn row(&self, i: usize) -> Option<&'a [f32]> {
        let start = i.checked_mul(self.dim)?;
        self.data.get(start..start + self.dim)
    }

    /// Rows in matrix order.
    pub fn rows(&self) -> ChunksExact<'a, f32> {
        self.data.chunks_exact(self.dim)
    }

    /// The whole matrix, row after row.
    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }
}

impl fmt::Debug for ExampleMatrix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExampleMatrix")
            .field("rows", &self.len())
            .field("dimension", &self.dim)
            .finish()
    }
}

/// One taught class. Its rows occupy `start..start + count` of the matrix.
struct ClassEntry {
    label: String,
    start: usize,
    count: usize,
}

/// Labeled examples accumulated over a teaching session.
///
/// Classes keep their first-appearance order and each class keeps its rows in
/// add order, so the combined matrix is:
///
/// ```text
/// rows of class #0 (add order) | rows of class #1 | ...
/// ```
///
/// `label_index` holds, for every matrix row, the slot of the class that
/// produced it. Both are updated together on every [`ExampleStore::add`], so
/// nothing has to be re-derived at prediction time.
///
/// The first vector fixes the dimension; later vectors must match it.
/// Examples are never removed.
pub struct ExampleStore {
    dim: Option<usize>,
    matrix: Vec<f32>,
    label_index: Vec<usize>,
    classes: Vec<ClassEntry>,
    slots: HashMap<String, usize>,
    generation: u64,
}

impl ExampleStore {
    /// Creates an empty store. The first [`add`](Self::add) fixes the dimension.
    pub fn new() -> Self {
        Self {
            dim: None,
            matrix: Vec::new(),
            label_index: Vec::new(),
            classes: Vec::new(),
            slots: HashMap::new(),
            generation: 0,
        }
    }

    /// Creates an empty store that only accepts vectors of length `dim`.
    pub fn with_dimension(dim: usize) -> Result<Self, KnnError> {
        if dim == 0 {
            return Err(KnnError::InvalidArgument(
                "dimension must be positive".into(),
            ));
        }
        let mut store = Self::new();
        store.dim = Some(dim);
        Ok(store)
    }

    /// Appends `vector` as a new example of `label`.
    ///
    /// Unknown labels are registered on the fly. On error the store is left
    /// exactly as it was.
    pub fn add(&mut self, label: &str, vector: EmbeddingVector) -> Result<(), KnnError> {
        if label.is_empty() {
            return Err(KnnError::InvalidArgument("label must not be empty".into()));
        }
        let dim = vector.dimension();
        if let Some(want) = self.dim {
            if dim != want {
                return Err(KnnError::DimensionMismatch {
                    expected: want,
                    got: dim,
                });
            }
        }

        let slot = match self.slots.get(label) {
            Some(&slot) => slot,
            None => {
                let slot = self.classes.len();
                self.classes.push(ClassEntry {
                    label: label.to_string(),
                    start: self.label_index.len(),
                    count: 0,
                });
                self.slots.insert(label.to_string(), slot);
                slot
            }
        };

        // New row goes right after the last row of its class.
        let row = self.classes[slot].start + self.classes[slot].count;
        let offset = row * dim;
        self.matrix
            .splice(offset..offset, vector.as_slice().iter().copied());
        self.label_index.insert(row, slot);
        self.classes[slot].count += 1;
        for later in &mut self.classes[slot + 1..] {
            later.start += 1;
        }

        self.dim = Some(dim);
        self.generation += 1;
        debug!(
            "knn: added example label={} row={} total={}",
            label,
            row,
            self.label_index.len()
        );
        Ok(())
    }

    /// The combined example matrix, or `None` while no example exists.
    pub fn example_matrix(&self) -> Option<ExampleMatrix<'_>> {
        if self.label_index.is_empty() {
            return None;
        }
        let dim = self.dim?;
        Some(ExampleMatrix {
            data: &self.matrix,
            dim,
        })
    }

    /// Label of row `row` of [`example_matrix`](Self::example_matrix).
    pub fn label_at(&self, row: usize) -> Result<&str, KnnError> {
        let slot = self
            .label_index
            .get(row)
            .ok_or(KnnError::IndexOutOfRange {
                index: row,
                len: self.label_index.len(),
            })?;
        Ok(&self.classes[*slot].label)
    }

    /// Row `row` of the example matrix.
    pub fn row(&self, row: usize) -> Result<&[f32], KnnError> {
        self.example_matrix()
            .and_then(|m| m.row(row))
            .ok_or(KnnError::IndexOutOfRange {
                index: row,
                len: self.label_index.len(),
            })
    }

    /// Number of stored examples across all classes.
    pub fn total_examples(&self) -> usize {
        self.label_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.label_index.is_empty()
    }

    /// Established dimension, `None` until the first example (unless the
    /// store was built with [`with_dimension`](Self::with_dimension)).
    pub fn dimension(&self) -> Option<usize> {
        self.dim
    }

    /// Class labels in first-appearance order.
    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.classes.iter().map(|c| c.label.as_str())
    }

    /// Number of classes taught so far.
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Number of examples stored for `label` (0 for unknown labels).
    pub fn count_for(&self, label: &str) -> usize {
        self.slots
            .get(label)
            .map_or(0, |&slot| self.classes[slot].count)
    }

    /// Rows belonging to `label`, in add order.
    pub fn class_rows(&self, label: &str) -> Option<ExampleMatrix<'_>> {
        let class = &self.classes[*self.slots.get(label)?];
        let dim = self.dim?;
        let start = class.start * dim;
        let end = start + class.count * dim;
        Some(ExampleMatrix {
            data: &self.matrix[start..end],
            dim,
        })
    }

    /// Bumped by every successful [`add`](Self::add). Callers caching anything
    /// derived from the store compare generations to detect staleness.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Default for ExampleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExampleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: Vec<(&str, usize)> = self
            .classes
            .iter()
            .map(|c| (c.label.as_str(), c.count))
            .collect();
        f.debug_struct("ExampleStore")
            .field("dimension", &self.dim)
            .field("classes", &counts)
            .field("generation", &self.generation)
            .finish()
    }
}
