//! Redaction applier.

use ns_common::{sort_spans, DetectionSpan, PhiLabel, SpanId};
use ns_temporal::{format_offset, parse_date, TemporalAnchor};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Options for one redaction run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedactionOptions {
    /// Replace date spans with anchored relative-offset tokens instead
    /// of a generic marker.
    pub translate_dates: bool,

    /// The episode anchor; required for date translation.
    pub anchor: Option<TemporalAnchor>,
}

impl RedactionOptions {
    /// Generic markers only.
    pub fn generic() -> Self {
        RedactionOptions::default()
    }

    /// Translate dates against `anchor`.
    pub fn anchored(anchor: TemporalAnchor) -> Self {
        RedactionOptions {
            translate_dates: true,
            anchor: Some(anchor),
        }
    }
}

/// A per-span note attached to the outcome (e.g. an unparseable date).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanWarning {
    /// Span the warning belongs to.
    pub id: SpanId,
    /// Its label.
    pub label: PhiLabel,
    /// What happened. Never contains the span's text.
    pub message: String,
}

/// Result of one redaction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionOutcome {
    /// The redacted text.
    pub text: String,
    /// Per-span processing notes.
    pub warnings: Vec<SpanWarning>,
    /// Replacement operations applied.
    pub applied: usize,
    /// Spans dropped as invalid (out of bounds or off-boundary).
    pub skipped: usize,
}

struct Replacement {
    start: usize,
    end: usize,
    marker: String,
}

/// Apply the finalized span set to `text`.
///
/// Overlapping spans are clustered and each cluster is replaced over
/// its full union range (a partial overlap never leaves an unredacted
/// tail). Replacements are then spliced in descending-start order, so
/// an earlier replacement can never invalidate the offsets of spans
/// still to be processed. Invalid spans are skipped, never a panic.
pub fn apply(text: &str, spans: &[DetectionSpan], options: &RedactionOptions) -> RedactionOutcome {
    let mut warnings = Vec::new();
    let mut skipped = 0usize;

    let mut valid: Vec<DetectionSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        if span.slice(text).is_none() {
            debug!(
                start = span.start,
                end = span.end,
                label = %span.label,
                "skipping out-of-bounds span"
            );
            skipped += 1;
            continue;
        }
        valid.push(span.clone());
    }
    sort_spans(&mut valid);

    // cluster transitively-overlapping spans; the marker comes from the
    // highest-confidence member, the range covers the whole cluster
    let mut replacements: Vec<Replacement> = Vec::new();
    let mut iter = valid.into_iter();
    if let Some(first) = iter.next() {
        let mut start = first.start;
        let mut end = first.end;
        let mut lead = first;
        for span in iter {
            if span.start < end {
                end = end.max(span.end);
                if span.confidence > lead.confidence {
                    lead = span;
                }
            } else {
                replacements.push(replacement(text, start, end, &lead, options, &mut warnings));
                start = span.start;
                end = span.end;
                lead = span;
            }
        }
        replacements.push(replacement(text, start, end, &lead, options, &mut warnings));
    }

    let applied = replacements.len();
    let mut out = text.to_string();
    for rep in replacements.iter().rev() {
        out.replace_range(rep.start..rep.end, &rep.marker);
    }

    RedactionOutcome {
        text: out,
        warnings,
        applied,
        skipped,
    }
}

fn replacement(
    text: &str,
    start: usize,
    end: usize,
    lead: &DetectionSpan,
    options: &RedactionOptions,
    warnings: &mut Vec<SpanWarning>,
) -> Replacement {
    let marker = marker_for(&text[start..end], lead, options, warnings);
    Replacement { start, end, marker }
}

fn marker_for(
    raw: &str,
    span: &DetectionSpan,
    options: &RedactionOptions,
    warnings: &mut Vec<SpanWarning>,
) -> String {
    match span.label {
        PhiLabel::Date => {
            if !options.translate_dates {
                return "[DATE REDACTED]".to_string();
            }
            let Some(anchor) = options.anchor else {
                warnings.push(SpanWarning {
                    id: span.id.clone(),
                    label: span.label,
                    message: "date translation requested without an anchor".to_string(),
                });
                return "[DATE REDACTED]".to_string();
            };
            let parsed = parse_date(raw);
            match parsed.date {
                Some(date) => {
                    let token = format!("[DATE: {} DAYS]", format_offset(anchor.offset_to(date)));
                    if let Some(note) = parsed.warning {
                        warnings.push(SpanWarning {
                            id: span.id.clone(),
                            label: span.label,
                            message: note,
                        });
                    }
                    token
                }
                None => {
                    // cannot anchor: emit the non-reversible marker,
                    // never the raw text
                    warnings.push(SpanWarning {
                        id: span.id.clone(),
                        label: span.label,
                        message: parsed
                            .warning
                            .unwrap_or_else(|| "unparseable date".to_string()),
                    });
                    "[DATE REDACTED]".to_string()
                }
            }
        }
        PhiLabel::Email => "[EMAIL REDACTED]".to_string(),
        PhiLabel::Phone => "[PHONE REDACTED]".to_string(),
        PhiLabel::Ssn => "[SSN REDACTED]".to_string(),
        PhiLabel::Mrn => "[MRN REDACTED]".to_string(),
        PhiLabel::Account => "[ACCOUNT REDACTED]".to_string(),
        PhiLabel::Url => "[URL REDACTED]".to_string(),
        PhiLabel::Ip => "[IP REDACTED]".to_string(),
        PhiLabel::Provider => "[PROVIDER REDACTED]".to_string(),
        PhiLabel::Name => "[NAME REDACTED]".to_string(),
        PhiLabel::Other => "[PHI REDACTED]".to_string(),
    }
}
