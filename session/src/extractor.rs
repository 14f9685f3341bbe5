use std::collections::VecDeque;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::sync::Mutex;

use crate::error::ExtractError;

/// One captured video frame. The pixel layout is whatever the paired
/// [`FeatureExtractor`] expects.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Bytes,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: impl Into<Bytes>) -> Self {
        Self {
            width,
            height,
            data: data.into(),
        }
    }

    /// Packs an already-extracted embedding as a 1-row frame of
    /// little-endian f32 values, for use with [`PrecomputedExtractor`].
    pub fn from_embedding(values: &[f32]) -> Self {
        let mut buf = BytesMut::with_capacity(values.len() * 4);
        for &v in values {
            buf.put_f32_le(v);
        }
        Self {
            width: values.len() as u32,
            height: 1,
            data: buf.freeze(),
        }
    }
}

/// Turns a frame into a fixed-length raw embedding (e.g. the 1000 logits of
/// an image model).
///
/// Implementations must be safe for concurrent use (Send + Sync).
#[async_trait::async_trait]
pub trait FeatureExtractor: Send + Sync {
    /// Return the raw, not yet normalized, embedding for `frame`.
    async fn extract(&self, frame: &Frame) -> Result<Vec<f32>, ExtractError>;

    /// Return the length of every embedding, or 0 if unknown up front.
    fn dimension(&self) -> usize;
}

/// Produces frames for periodic prediction (a camera, a file, a test queue).
#[async_trait::async_trait]
pub trait FrameSource: Send + Sync {
    /// `Ok(Some(frame))` for a frame, `Ok(None)` once the source is closed,
    /// `Err` when no frame is available right now.
    async fn next_frame(&self) -> Result<Option<Frame>, ExtractError>;
}

/// Extractor for frames that already carry an embedding, built with
/// [`Frame::from_embedding`].
///
/// Payload length is not checked against `dim`; the store rejects vectors of
/// the wrong dimension.
pub struct PrecomputedExtractor {
    dim: usize,
}

impl PrecomputedExtractor {
    /// `dim` of 0 accepts any length.
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

#[async_trait::async_trait]
impl FeatureExtractor for PrecomputedExtractor {
    async fn extract(&self, frame: &Frame) -> Result<Vec<f32>, ExtractError> {
        if frame.data.is_empty() {
            return Err(ExtractError::NoFrame);
        }
        if frame.data.len() % 4 != 0 {
            return Err(ExtractError::Failed(format!(
                "payload of {} bytes is not a list of f32",
                frame.data.len()
            )));
        }
        let values: Vec<f32> = frame
            .data
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Ok(values)
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

/// In-memory [`FrameSource`] that hands out queued frames in order and
/// reports closed once drained.
pub struct QueueSource {
    frames: Mutex<VecDeque<Frame>>,
}

impl QueueSource {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: Mutex::new(frames.into_iter().collect()),
        }
    }

    pub async fn push(&self, frame: Frame) {
        self.frames.lock().await.push_back(frame);
    }

    pub async fn len(&self) -> usize {
        self.frames.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.frames.lock().await.is_empty()
    }
}

#[async_trait::async_trait]
impl FrameSource for QueueSource {
    async fn next_frame(&self) -> Result<Option<Frame>, ExtractError> {
        Ok(self.frames.lock().await.pop_front())
    }
}
