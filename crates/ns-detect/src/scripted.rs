//! Scripted model detector for tests and integration harnesses.
//!
//! Plays back canned span batches on a worker thread, checking the
//! cancel flag between emissions, then ends with a done or error event.
//! This is the in-process stand-in for the real external detector.

use crate::model::{ModelDetector, ModelEvent, ModelSession};
use ns_common::{DetectionSpan, MergePolicy, PhiLabel, SpanSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Compact span description for scripting: (label, start, end, confidence).
pub type SpanSpec = (PhiLabel, usize, usize, f64);

/// Playback detector: emits the configured batches, then terminates.
#[derive(Debug, Clone, Default)]
pub struct ScriptedModelDetector {
    batches: Vec<Vec<SpanSpec>>,
    fail_with: Option<String>,
    batch_delay: Option<Duration>,
}

impl ScriptedModelDetector {
    /// Detector that emits `batches` then a `Done` with their union.
    pub fn with_batches(batches: Vec<Vec<SpanSpec>>) -> Self {
        ScriptedModelDetector {
            batches,
            fail_with: None,
            batch_delay: None,
        }
    }

    /// Detector that emits `batches` then fails with `reason`.
    pub fn failing_after(batches: Vec<Vec<SpanSpec>>, reason: impl Into<String>) -> Self {
        ScriptedModelDetector {
            batches,
            fail_with: Some(reason.into()),
            batch_delay: None,
        }
    }

    /// Detector that fails immediately.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self::failing_after(Vec::new(), reason)
    }

    /// Sleep between batches, to exercise cancellation windows.
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = Some(delay);
        self
    }
}

impl ModelDetector for ScriptedModelDetector {
    fn start(&self, _text: &str, _policy: &MergePolicy) -> ModelSession {
        let (tx, rx) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let batches = self.batches.clone();
        let fail_with = self.fail_with.clone();
        let batch_delay = self.batch_delay;

        thread::spawn(move || {
            let mut emitted: Vec<DetectionSpan> = Vec::new();
            for batch in batches {
                if flag.load(Ordering::Relaxed) {
                    return;
                }
                if let Some(delay) = batch_delay {
                    thread::sleep(delay);
                }
                if flag.load(Ordering::Relaxed) {
                    return;
                }
                let spans: Vec<DetectionSpan> = batch
                    .into_iter()
                    .filter_map(|(label, start, end, confidence)| {
                        DetectionSpan::try_new(label, start, end, confidence, SpanSource::Model)
                    })
                    .collect();
                emitted.extend(spans.iter().cloned());
                if tx.send(ModelEvent::Batch(spans)).is_err() {
                    return;
                }
            }
            if flag.load(Ordering::Relaxed) {
                return;
            }
            let terminal = match fail_with {
                Some(reason) => ModelEvent::Error(reason),
                None => ModelEvent::Done(emitted),
            };
            let _ = tx.send(terminal);
        });

        ModelSession::new(rx, cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> MergePolicy {
        MergePolicy::default()
    }

    #[test]
    fn test_batches_then_done() {
        let detector = ScriptedModelDetector::with_batches(vec![
            vec![(PhiLabel::Name, 0, 4, 0.7)],
            vec![(PhiLabel::Date, 10, 20, 0.6)],
        ]);
        let session = detector.start("irrelevant", &policy());

        let mut batches = 0;
        loop {
            match session.next_event() {
                Some(ModelEvent::Batch(spans)) => {
                    assert!(!spans.is_empty());
                    assert!(spans.iter().all(|s| s.source == SpanSource::Model));
                    batches += 1;
                }
                Some(ModelEvent::Done(all)) => {
                    assert_eq!(all.len(), 2);
                    break;
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert_eq!(batches, 2);
    }

    #[test]
    fn test_error_terminal() {
        let detector = ScriptedModelDetector::failing("model unavailable");
        let session = detector.start("text", &policy());
        match session.next_event() {
            Some(ModelEvent::Error(reason)) => assert_eq!(reason, "model unavailable"),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_specs_filtered() {
        let detector = ScriptedModelDetector::with_batches(vec![vec![
            (PhiLabel::Name, 5, 5, 0.9),
            (PhiLabel::Name, 8, 2, 0.9),
            (PhiLabel::Name, 0, 3, 0.9),
        ]]);
        let session = detector.start("text", &policy());
        match session.next_event() {
            Some(ModelEvent::Batch(spans)) => assert_eq!(spans.len(), 1),
            other => panic!("expected batch, got {:?}", other),
        }
    }

    #[test]
    fn test_cancel_stops_emission() {
        let detector = ScriptedModelDetector::with_batches(vec![
            vec![(PhiLabel::Name, 0, 4, 0.7)],
            vec![(PhiLabel::Name, 5, 9, 0.7)],
        ])
        .with_batch_delay(Duration::from_millis(50));
        let session = detector.start("text", &policy());
        session.cancel();

        // after cancellation the producer stops; the channel closes
        // without a terminal event
        let mut saw_terminal = false;
        while let Some(event) = session.next_event() {
            if matches!(event, ModelEvent::Done(_) | ModelEvent::Error(_)) {
                saw_terminal = true;
            }
        }
        assert!(!saw_terminal);
        assert!(session.is_cancelled());
    }
}
