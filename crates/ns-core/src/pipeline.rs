//! Session orchestration and bundle assembly.

use crate::error::{PipelineError, Result};
use ns_bundle::{Bundle, BundleAssembler};
use ns_common::{DetectionSpan, MergePolicy, PhiLabel, SpanId};
use ns_detect::{detect, ModelDetector, ModelEvent, ModelSession, ModelStatus};
use ns_merge::{MergeEngine, SessionState};
use ns_redact::{apply, RedactionOptions, RedactionOutcome};
use ns_temporal::{parse_date, TemporalAnchor};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One detection session over one note.
///
/// Owns the note text, the merge engine, and (optionally) a handle to a
/// running model detection task.
pub struct Session {
    text: String,
    engine: MergeEngine,
    model: Option<ModelSession>,
}

/// Run pattern-only detection over `text`.
pub fn run_detection(text: &str, policy: MergePolicy) -> Session {
    let mut engine = MergeEngine::new(policy);
    engine.ingest_pattern(detect(text));
    engine.complete_detection();
    Session {
        text: text.to_string(),
        engine,
        model: None,
    }
}

/// Run detection with the external probabilistic detector attached.
///
/// The model streams in the background; merge progressively with
/// [`Session::poll_model`], block until done with
/// [`Session::drain_model`], or stop it with [`Session::cancel_model`].
/// Model failure is never fatal: the session degrades to pattern-only
/// results and records the failure in its model status.
pub fn run_detection_with_model(
    text: &str,
    policy: MergePolicy,
    detector: &dyn ModelDetector,
) -> Session {
    let mut engine = MergeEngine::new(policy);
    engine.ingest_pattern(detect(text));
    engine.expect_model();
    let model = detector.start(text, engine.policy());
    Session {
        text: text.to_string(),
        engine,
        model: Some(model),
    }
}

impl Session {
    /// The note text this session runs over.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Lifecycle state of the span set.
    pub fn state(&self) -> SessionState {
        self.engine.state()
    }

    /// Status of the probabilistic detector.
    pub fn model_status(&self) -> &ModelStatus {
        self.engine.model_status()
    }

    /// The merged span set, policy applied, exclusions still visible.
    pub fn spans(&self) -> &[DetectionSpan] {
        self.engine.spans()
    }

    /// The redaction plan: merged set minus exclusions.
    pub fn plan(&self) -> Vec<DetectionSpan> {
        self.engine.plan()
    }

    /// Pump any pending model events without blocking.
    ///
    /// Returns true once the model is terminal (or none is attached).
    pub fn poll_model(&mut self) -> bool {
        loop {
            let event = match self.model.as_ref() {
                None => return true,
                Some(model) => model.try_next_event(),
            };
            match event {
                Ok(Some(ModelEvent::Batch(spans))) => {
                    debug!(count = spans.len(), "merging model batch");
                    self.engine.ingest_model_batch(spans);
                }
                Ok(Some(ModelEvent::Done(spans))) => {
                    self.engine.model_complete(spans);
                    self.model = None;
                    return true;
                }
                Ok(Some(ModelEvent::Error(reason))) => {
                    warn!(%reason, "model detector failed; proceeding pattern-only");
                    self.engine.model_failed(reason);
                    self.model = None;
                    return true;
                }
                Ok(None) => return false,
                Err(()) => {
                    self.conclude_closed_stream();
                    return true;
                }
            }
        }
    }

    /// Block until the model's terminal event (no-op without a model).
    pub fn drain_model(&mut self) {
        loop {
            let event = match self.model.as_ref() {
                None => break,
                Some(model) => model.next_event(),
            };
            match event {
                Some(ModelEvent::Batch(spans)) => {
                    debug!(count = spans.len(), "merging model batch");
                    self.engine.ingest_model_batch(spans);
                }
                Some(ModelEvent::Done(spans)) => {
                    self.engine.model_complete(spans);
                    self.model = None;
                    break;
                }
                Some(ModelEvent::Error(reason)) => {
                    warn!(%reason, "model detector failed; proceeding pattern-only");
                    self.engine.model_failed(reason);
                    self.model = None;
                    break;
                }
                None => {
                    self.conclude_closed_stream();
                    break;
                }
            }
        }
        self.engine.complete_detection();
    }

    /// Cancel the model detector. Safe at any point; the session stays
    /// valid with whatever spans had already been merged.
    pub fn cancel_model(&mut self) {
        if let Some(model) = self.model.take() {
            model.cancel();
            self.engine.model_cancelled();
        }
        self.engine.complete_detection();
    }

    fn conclude_closed_stream(&mut self) {
        let cancelled = self
            .model
            .as_ref()
            .map(|m| m.is_cancelled())
            .unwrap_or(false);
        if cancelled {
            self.engine.model_cancelled();
        } else {
            warn!("model detector stream closed without a terminal event");
            self.engine
                .model_failed("stream closed without a terminal event");
        }
        self.model = None;
    }

    /// Add an operator span over `[start, end)`.
    pub fn add_manual(
        &mut self,
        label: PhiLabel,
        start: usize,
        end: usize,
    ) -> ns_merge::Result<SpanId> {
        self.engine.add_manual(label, start, end)
    }

    /// Veto a span.
    pub fn exclude(&mut self, id: &SpanId) -> ns_merge::Result<()> {
        self.engine.exclude(id)
    }

    /// Undo a veto.
    pub fn include(&mut self, id: &SpanId) -> ns_merge::Result<()> {
        self.engine.include(id)
    }

    /// Change a span's label.
    pub fn relabel(&mut self, id: &SpanId, label: PhiLabel) -> ns_merge::Result<()> {
        self.engine.relabel(id, label)
    }

    /// Freeze the span set and produce redacted text.
    ///
    /// A still-streaming model is drained first, so the plan reflects
    /// everything both detectors found; cancel beforehand for
    /// pattern-only output.
    pub fn finalize_and_redact(&mut self, options: &RedactionOptions) -> RedactionOutcome {
        self.drain_model();
        let plan = self.engine.finalize();
        apply(&self.text, &plan, options)
    }
}

/// Caller-supplied description of one bundle document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSpec {
    /// Document role, e.g. "operative note".
    pub role: String,

    /// Position within the bundle; unique, starts at 1.
    pub sequence: u32,

    /// Raw (unredacted) document text.
    pub text: String,

    /// The document's own date, used to place it on the timeline.
    pub document_date: String,
}

/// Redact every document against the shared anchor and assemble a
/// bundle.
///
/// Each document is run through pattern detection and anchored
/// redaction before its offset is resolved; submission re-scans every
/// text and fails closed on any residual date-like match.
pub fn assemble_bundle(
    specs: Vec<DocumentSpec>,
    anchor_date: &str,
    policy: &MergePolicy,
) -> Result<Bundle> {
    let parsed = parse_date(anchor_date);
    let index_date = parsed.date.ok_or_else(|| {
        PipelineError::InvalidAnchor(
            parsed
                .warning
                .unwrap_or_else(|| "unrecognized date format".to_string()),
        )
    })?;
    let anchor = TemporalAnchor::new(index_date);

    let mut assembler = BundleAssembler::new(anchor);
    let options = RedactionOptions::anchored(anchor);
    for spec in specs {
        let mut session = run_detection(&spec.text, policy.clone());
        let outcome = session.finalize_and_redact(&options);
        assembler.add_resolved(spec.role, spec.sequence, outcome.text, &spec.document_date)?;
    }
    Ok(assembler.submit()?)
}
