use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use teachable_knn::Prediction;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace, warn};

use crate::extractor::FrameSource;
use crate::session::Session;

/// A prediction published by the [`Ticker`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickResult {
    /// 1-based index of the tick that produced this result.
    pub tick: u64,
    /// Store generation the prediction was computed against.
    pub generation: u64,
    pub prediction: Prediction,
}

/// Classifies a frame from a [`FrameSource`] on a fixed period.
///
/// A single worker task does all the work: it waits for the next tick,
/// classifies one frame, and only then waits again. Predictions therefore
/// never overlap, and ticks that elapse while a prediction is still running
/// are dropped rather than replayed.
///
/// The latest result is published on a watch channel. The worker stops when
/// the token is cancelled, when the source closes, or on an unrecoverable
/// store error.
pub struct Ticker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    rx: watch::Receiver<Option<TickResult>>,
}

impl Ticker {
    /// Spawns the worker on the current tokio runtime.
    pub fn spawn(
        session: Arc<Session>,
        source: Arc<dyn FrameSource>,
        period: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let (tx, rx) = watch::channel(None);
        let handle = tokio::spawn(run(session, source, period, cancel.clone(), tx));
        Self { cancel, handle, rx }
    }

    /// Receiver that observes every published result (intermediate values
    /// may be coalesced if the receiver falls behind).
    pub fn subscribe(&self) -> watch::Receiver<Option<TickResult>> {
        self.rx.clone()
    }

    /// Most recent result, if any tick produced one yet.
    pub fn latest(&self) -> Option<TickResult> {
        self.rx.borrow().clone()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the worker to stop on its own.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            error!("ticker: worker panicked: {}", e);
        }
    }

    /// Cancels the worker and waits for it to stop. A prediction in
    /// progress is allowed to finish.
    pub async fn stop(self) {
        self.cancel.cancel();
        self.join().await;
    }
}

async fn run(
    session: Arc<Session>,
    source: Arc<dyn FrameSource>,
    period: Duration,
    cancel: CancellationToken,
    tx: watch::Sender<Option<TickResult>>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("ticker: started, period={:?}", period);

    let mut tick: u64 = 0;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }
        tick += 1;

        let frame = match source.next_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("ticker: source closed after {} ticks", tick - 1);
                break;
            }
            Err(e) => {
                trace!("ticker: tick {} skipped: {}", tick, e);
                continue;
            }
        };

        match session.classify_tagged(&frame).await {
            Ok(Some((generation, prediction))) => {
                trace!("ticker: tick {} -> {:?}", tick, prediction.label);
                tx.send_replace(Some(TickResult {
                    tick,
                    generation,
                    prediction,
                }));
            }
            Ok(None) => trace!("ticker: tick {} produced no embedding", tick),
            Err(e) if e.is_recoverable() => warn!("ticker: tick {} failed: {}", tick, e),
            Err(e) => {
                error!("ticker: stopping: {}", e);
                break;
            }
        }
    }
    info!("ticker: stopped");
}
