//! Teach-by-example sessions on top of [`teachable_knn`].
//!
//! This crate is the boundary between the synchronous classifier core and the
//! asynchronous world around it:
//!
//! - [`FeatureExtractor`]: frame -> raw embedding (camera model, black box)
//! - [`FrameSource`]: where periodic frames come from
//! - [`Session`]: teach / classify through an extractor, adjustable `k`
//! - [`Ticker`]: periodic prediction on one dedicated worker task
//! - [`SessionConfig`]: `k`, its UI range, ticker period, tie-break policy
//!
//! Extractor failures never surface as errors: a frame that yields no
//! embedding is simply skipped.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use teachable_session::{Frame, PrecomputedExtractor, Session, SessionConfig};
//!
//! # async fn demo() -> Result<(), teachable_session::SessionError> {
//! let session = Session::new(SessionConfig::default(), Arc::new(PrecomputedExtractor::new(3)))?;
//! session.teach("HAPPY", &Frame::from_embedding(&[1.0, 0.1, 0.0])).await?;
//! session.teach("SAD", &Frame::from_embedding(&[0.0, 0.2, 1.0])).await?;
//!
//! let prediction = session.classify(&Frame::from_embedding(&[0.9, 0.0, 0.1])).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod extractor;
mod session;
mod ticker;

pub use config::SessionConfig;
pub use error::{ExtractError, SessionError};
pub use extractor::{FeatureExtractor, Frame, FrameSource, PrecomputedExtractor, QueueSource};
pub use session::Session;
pub use ticker::{TickResult, Ticker};

pub use teachable_knn::{Prediction, TieBreak};
