use teachable_knn::KnnError;
use thiserror::Error;

/// Errors returned by session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session: {0}")]
    Knn(#[from] KnnError),

    #[error("session: invalid config: {0}")]
    Config(String),

    #[error("session: io: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// False when the underlying store can no longer be trusted.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Knn(e) => e.is_recoverable(),
            _ => true,
        }
    }
}

/// Failure of an upstream collaborator (camera, feature extractor).
///
/// Sessions treat these as "no vector this time" rather than as errors of
/// their own.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("extract: no frame available")]
    NoFrame,

    #[error("extract: {0}")]
    Failed(String),
}
