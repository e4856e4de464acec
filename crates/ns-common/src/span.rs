//! Detection spans and their labels.
//!
//! A span is a half-open byte range `[start, end)` into the exact input
//! text, tagged with a PHI category, a confidence, and the detector that
//! produced it. Offsets always fall on UTF-8 character boundaries: the
//! pattern battery reports regex match offsets directly, and manually
//! added spans are boundary-checked before use.

use crate::SpanId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Category of protected health information carried by a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhiLabel {
    /// Email address.
    Email,
    /// Phone number.
    Phone,
    /// Social security number.
    Ssn,
    /// Medical record number.
    Mrn,
    /// Account or billing number.
    Account,
    /// URL.
    Url,
    /// IPv4 address.
    Ip,
    /// Calendar date (eligible for relative-offset tokenization).
    Date,
    /// Provider/clinician name (subject to the provider-protection flag).
    Provider,
    /// Patient or third-party name.
    Name,
    /// Anything else flagged as identifying.
    Other,
}

impl fmt::Display for PhiLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PhiLabel::Email => "email",
            PhiLabel::Phone => "phone",
            PhiLabel::Ssn => "ssn",
            PhiLabel::Mrn => "mrn",
            PhiLabel::Account => "account",
            PhiLabel::Url => "url",
            PhiLabel::Ip => "ip",
            PhiLabel::Date => "date",
            PhiLabel::Provider => "provider",
            PhiLabel::Name => "name",
            PhiLabel::Other => "other",
        };
        write!(f, "{}", s)
    }
}

/// Which detector produced a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanSource {
    /// Deterministic regex battery.
    Pattern,
    /// External probabilistic detector.
    Model,
    /// Operator-added span.
    Manual,
}

impl SpanSource {
    /// Deterministic tie-break rank for equal-confidence overlap
    /// resolution: lower rank wins (`Pattern > Model > Manual`).
    pub fn tie_break_rank(&self) -> u8 {
        match self {
            SpanSource::Pattern => 0,
            SpanSource::Model => 1,
            SpanSource::Manual => 2,
        }
    }
}

impl fmt::Display for SpanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SpanSource::Pattern => "pattern",
            SpanSource::Model => "model",
            SpanSource::Manual => "manual",
        };
        write!(f, "{}", s)
    }
}

/// A detected PHI span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSpan {
    /// Unique id within the detection session.
    pub id: SpanId,

    /// PHI category.
    pub label: PhiLabel,

    /// Start byte offset (inclusive).
    pub start: usize,

    /// End byte offset (exclusive). Always greater than `start`.
    pub end: usize,

    /// Detector confidence in [0, 1].
    pub confidence: f64,

    /// Which detector produced this span.
    pub source: SpanSource,
}

impl DetectionSpan {
    /// Construct a span, rejecting zero-length or inverted ranges.
    ///
    /// Confidence is clamped into [0, 1].
    pub fn try_new(
        label: PhiLabel,
        start: usize,
        end: usize,
        confidence: f64,
        source: SpanSource,
    ) -> Option<Self> {
        if end <= start {
            return None;
        }
        Some(DetectionSpan {
            id: SpanId::new(),
            label,
            start,
            end,
            confidence: confidence.clamp(0.0, 1.0),
            source,
        })
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Spans constructed via `try_new` are never empty.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// True if the two half-open ranges share at least one byte.
    pub fn overlaps(&self, other: &DetectionSpan) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True if `other` lies entirely within this span.
    pub fn contains(&self, other: &DetectionSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// The matched text, if the range is in bounds and on char boundaries.
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        if self.end > text.len() {
            return None;
        }
        if !text.is_char_boundary(self.start) || !text.is_char_boundary(self.end) {
            return None;
        }
        Some(&text[self.start..self.end])
    }
}

/// Sort spans into the canonical presentation order: ascending `start`,
/// ties broken by descending `end`, so a longer match at the same start is
/// visited first by any consumer that scans left to right and skips
/// enclosed spans.
pub fn sort_spans(spans: &mut [DetectionSpan]) {
    spans.sort_by(span_order);
}

fn span_order(a: &DetectionSpan, b: &DetectionSpan) -> Ordering {
    a.start.cmp(&b.start).then(b.end.cmp(&a.end))
}
