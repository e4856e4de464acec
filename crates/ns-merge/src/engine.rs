//! The merge engine and its session lifecycle.

use crate::error::{MergeError, Result};
use ns_common::{sort_spans, DetectionSpan, MergeMode, MergePolicy, PhiLabel, SpanId, SpanSource};
use ns_detect::ModelStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Lifecycle of a detection session.
///
/// `Empty → Detecting → Merged (editable) → Finalized`; re-detecting
/// resets to `Empty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Empty,
    Detecting,
    Merged,
    Finalized,
}

/// Owns the canonical span set for one detection session.
///
/// Raw detector outputs are retained as-is; the merged view is
/// recomputed from them on every mutation, so re-merging the same
/// inputs is idempotent by construction.
pub struct MergeEngine {
    policy: MergePolicy,
    state: SessionState,
    pattern_spans: Vec<DetectionSpan>,
    model_spans: Vec<DetectionSpan>,
    manual_spans: Vec<DetectionSpan>,
    excluded: HashSet<SpanId>,
    model_status: ModelStatus,
    merged: Vec<DetectionSpan>,
}

impl MergeEngine {
    /// New engine with the given policy; starts `Empty`.
    pub fn new(policy: MergePolicy) -> Self {
        MergeEngine {
            policy,
            state: SessionState::Empty,
            pattern_spans: Vec::new(),
            model_spans: Vec::new(),
            manual_spans: Vec::new(),
            excluded: HashSet::new(),
            model_status: ModelStatus::Skipped,
            merged: Vec::new(),
        }
    }

    /// The policy this session runs under.
    pub fn policy(&self) -> &MergePolicy {
        &self.policy
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Status of the probabilistic detector for this session.
    pub fn model_status(&self) -> &ModelStatus {
        &self.model_status
    }

    /// Ingest the pattern battery's output, starting a new detection.
    ///
    /// Calling this on a merged or finalized session reopens it: all
    /// prior spans, edits, and model state are discarded first.
    pub fn ingest_pattern(&mut self, spans: Vec<DetectionSpan>) {
        if self.state != SessionState::Empty {
            self.reset();
        }
        self.pattern_spans = spans;
        self.state = SessionState::Detecting;
        self.remerge();
    }

    /// Mark that a model detector is attached and streaming.
    pub fn expect_model(&mut self) {
        self.model_status = ModelStatus::Pending;
    }

    /// Ingest an incremental model batch.
    ///
    /// Batches arriving after a terminal model status are dropped; a
    /// cancelled or failed detector never mutates the session again.
    pub fn ingest_model_batch(&mut self, spans: Vec<DetectionSpan>) {
        if self.model_concluded() {
            debug!(
                count = spans.len(),
                "dropping model batch after terminal status"
            );
            return;
        }
        if self.model_status == ModelStatus::Skipped {
            self.model_status = ModelStatus::Pending;
        }
        self.model_spans.extend(spans);
        self.remerge();
    }

    /// Terminal success: replace streamed batches with the full list.
    pub fn model_complete(&mut self, spans: Vec<DetectionSpan>) {
        if self.model_concluded() {
            return;
        }
        self.model_spans = spans;
        self.model_status = ModelStatus::Complete;
        self.remerge();
    }

    /// Terminal failure: fall back to pattern-only results.
    ///
    /// Spans already streamed before the failure are kept.
    pub fn model_failed(&mut self, reason: impl Into<String>) {
        if self.model_concluded() {
            return;
        }
        self.model_status = ModelStatus::Failed(reason.into());
    }

    /// The caller cancelled the detector; keep whatever arrived intact.
    pub fn model_cancelled(&mut self) {
        if self.model_concluded() {
            return;
        }
        self.model_status = ModelStatus::Cancelled;
    }

    fn model_concluded(&self) -> bool {
        matches!(
            self.model_status,
            ModelStatus::Complete | ModelStatus::Failed(_) | ModelStatus::Cancelled
        )
    }

    /// Detection is over (either no model, or its terminal event was
    /// consumed); the session becomes editable.
    pub fn complete_detection(&mut self) {
        if matches!(self.state, SessionState::Empty | SessionState::Detecting) {
            self.state = SessionState::Merged;
        }
    }

    /// Add an operator span. Always `source = manual`, confidence 1.0,
    /// never deduplicated against machine detections.
    pub fn add_manual(&mut self, label: PhiLabel, start: usize, end: usize) -> Result<SpanId> {
        self.ensure_editable()?;
        let span = DetectionSpan::try_new(label, start, end, 1.0, SpanSource::Manual)
            .ok_or(MergeError::InvalidSpan { start, end })?;
        let id = span.id.clone();
        self.manual_spans.push(span);
        self.remerge();
        Ok(id)
    }

    /// Veto a span: it stays visible in the merged view but leaves the
    /// redaction plan.
    pub fn exclude(&mut self, id: &SpanId) -> Result<()> {
        self.ensure_editable()?;
        self.ensure_known(id)?;
        self.excluded.insert(id.clone());
        Ok(())
    }

    /// Undo an exclusion.
    pub fn include(&mut self, id: &SpanId) -> Result<()> {
        self.ensure_editable()?;
        self.ensure_known(id)?;
        self.excluded.remove(id);
        Ok(())
    }

    /// Change a span's label.
    pub fn relabel(&mut self, id: &SpanId, label: PhiLabel) -> Result<()> {
        self.ensure_editable()?;
        let span = self
            .pattern_spans
            .iter_mut()
            .chain(self.model_spans.iter_mut())
            .chain(self.manual_spans.iter_mut())
            .find(|s| &s.id == id)
            .ok_or_else(|| MergeError::UnknownSpan(id.clone()))?;
        span.label = label;
        self.remerge();
        Ok(())
    }

    /// The merged view, policy applied, exclusions still visible.
    /// Always start-ascending, end-descending.
    pub fn spans(&self) -> &[DetectionSpan] {
        &self.merged
    }

    /// Ids the operator has vetoed.
    pub fn excluded(&self) -> &HashSet<SpanId> {
        &self.excluded
    }

    /// The redaction plan: merged view minus exclusions.
    pub fn plan(&self) -> Vec<DetectionSpan> {
        self.merged
            .iter()
            .filter(|s| !self.excluded.contains(&s.id))
            .cloned()
            .collect()
    }

    /// Freeze the span set for a redaction run and return the plan.
    pub fn finalize(&mut self) -> Vec<DetectionSpan> {
        self.state = SessionState::Finalized;
        self.plan()
    }

    /// Drop everything and return to `Empty`.
    pub fn reset(&mut self) {
        self.pattern_spans.clear();
        self.model_spans.clear();
        self.manual_spans.clear();
        self.excluded.clear();
        self.merged.clear();
        self.model_status = ModelStatus::Skipped;
        self.state = SessionState::Empty;
    }

    fn ensure_editable(&self) -> Result<()> {
        if self.state == SessionState::Finalized {
            return Err(MergeError::SessionFinalized);
        }
        Ok(())
    }

    fn ensure_known(&self, id: &SpanId) -> Result<()> {
        let known = self
            .pattern_spans
            .iter()
            .chain(self.model_spans.iter())
            .chain(self.manual_spans.iter())
            .any(|s| &s.id == id);
        if known {
            Ok(())
        } else {
            Err(MergeError::UnknownSpan(id.clone()))
        }
    }

    /// Recompute the merged view from the retained raw inputs.
    fn remerge(&mut self) {
        let machine: Vec<DetectionSpan> = self
            .pattern_spans
            .iter()
            .chain(self.model_spans.iter())
            .filter(|s| s.confidence >= self.policy.confidence_threshold)
            .cloned()
            .collect();

        let mut spans = match self.policy.mode {
            MergeMode::Union => machine,
            MergeMode::BestOf => collapse_overlaps(machine),
        };

        // manual spans are operator ground truth: exempt from the
        // threshold and from best-of collapse
        spans.extend(self.manual_spans.iter().cloned());

        if self.policy.protect_providers {
            spans.retain(|s| s.label != PhiLabel::Provider);
        }

        sort_spans(&mut spans);
        self.merged = spans;
    }
}

/// Collapse each cluster of transitively-overlapping spans to its single
/// best span: highest confidence, equal confidence broken by
/// `SpanSource::tie_break_rank` (pattern over model over manual).
fn collapse_overlaps(mut spans: Vec<DetectionSpan>) -> Vec<DetectionSpan> {
    sort_spans(&mut spans);
    let mut kept = Vec::new();
    let mut iter = spans.into_iter();
    let Some(first) = iter.next() else {
        return kept;
    };
    let mut cluster_end = first.end;
    let mut best = first;
    for span in iter {
        if span.start < cluster_end {
            cluster_end = cluster_end.max(span.end);
            if beats(&span, &best) {
                best = span;
            }
        } else {
            kept.push(best);
            cluster_end = span.end;
            best = span;
        }
    }
    kept.push(best);
    kept
}

fn beats(a: &DetectionSpan, b: &DetectionSpan) -> bool {
    if a.confidence != b.confidence {
        return a.confidence > b.confidence;
    }
    a.source.tie_break_rank() < b.source.tie_break_rank()
}
