use thiserror::Error;

/// Errors returned by knn operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KnnError {
    #[error("knn: degenerate vector: norm is zero or not finite")]
    DegenerateVector,

    #[error("knn: dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("knn: row index {index} out of range for {len} examples")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("knn: invalid argument: {0}")]
    InvalidArgument(String),
}

impl KnnError {
    /// Reports whether the caller may simply reject the current call and
    /// carry on. `IndexOutOfRange` means the store's row bookkeeping is
    /// broken and the session should not be trusted any further.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::IndexOutOfRange { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            KnnError::DimensionMismatch { expected: 4, got: 3 }.to_string(),
            "knn: dimension mismatch: expected 4, got 3"
        );
        assert_eq!(
            KnnError::InvalidArgument("k must be positive".into()).to_string(),
            "knn: invalid argument: k must be positive"
        );
    }

    #[test]
    fn test_only_index_out_of_range_is_fatal() {
        assert!(KnnError::DegenerateVector.is_recoverable());
        assert!(KnnError::DimensionMismatch { expected: 1, got: 2 }.is_recoverable());
        assert!(KnnError::InvalidArgument(String::new()).is_recoverable());
        assert!(!KnnError::IndexOutOfRange { index: 3, len: 3 }.is_recoverable());
    }
}
