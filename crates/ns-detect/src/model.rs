//! Contract for the external probabilistic PHI detector.
//!
//! The detector runs in its own thread of control and communicates only
//! through an append-only stream of span batches plus one terminal
//! done/error event. Cancellation is a first-class operation: it stops
//! further emission without throwing, and the merge engine stays valid
//! (pattern-only) afterwards.
//!
//! The adapter is policy-free: confidence-threshold filtering happens in
//! the merge engine, so spans below the caller's threshold may still be
//! emitted here.

use ns_common::{DetectionSpan, MergePolicy};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;

/// Event emitted by a running model detection task.
#[derive(Debug, Clone)]
pub enum ModelEvent {
    /// Incremental batch of spans, tagged `source = model`.
    Batch(Vec<DetectionSpan>),
    /// Terminal success, carrying the full span list.
    Done(Vec<DetectionSpan>),
    /// Terminal failure. The pipeline proceeds pattern-only.
    Error(String),
}

/// Terminal status of the model detector within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    /// No model detector was attached to this session.
    Skipped,
    /// Detection is still streaming.
    Pending,
    /// Terminal done event received.
    Complete,
    /// Detector failed; results are pattern-only.
    Failed(String),
    /// Caller cancelled the detector; results are pattern-only.
    Cancelled,
}

impl ModelStatus {
    /// True once no further model events can arrive.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ModelStatus::Pending)
    }
}

/// Handle to one running model detection task.
///
/// Dropping the session without cancelling is safe; the producer side
/// observes the closed channel and stops.
pub struct ModelSession {
    events: Receiver<ModelEvent>,
    cancelled: Arc<AtomicBool>,
}

impl ModelSession {
    /// Wrap a receiver and shared cancel flag produced by a detector
    /// implementation.
    pub fn new(events: Receiver<ModelEvent>, cancelled: Arc<AtomicBool>) -> Self {
        ModelSession { events, cancelled }
    }

    /// Request cancellation. Safe to call at any point, any number of
    /// times; never blocks and never fails.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// True if `cancel` has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Block for the next event. `None` means the producer went away
    /// without a terminal event (treated as failure by callers).
    pub fn next_event(&self) -> Option<ModelEvent> {
        self.events.recv().ok()
    }

    /// Non-blocking poll for a pending event.
    ///
    /// `Ok(None)` means nothing pending right now; `Err(())` means the
    /// channel is closed.
    pub fn try_next_event(&self) -> Result<Option<ModelEvent>, ()> {
        match self.events.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(()),
        }
    }
}

/// Capability interface for the external probabilistic detector.
///
/// Implementations spawn their own worker (thread, process, remote call)
/// and must emit zero or more `Batch` events followed by exactly one
/// `Done` or `Error`, honoring the session's cancel flag between
/// emissions.
pub trait ModelDetector {
    /// Start detection over `text` under the caller's policy.
    fn start(&self, text: &str, policy: &MergePolicy) -> ModelSession;
}
