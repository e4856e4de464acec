//! Deterministic PHI pattern battery.
//!
//! A fixed set of format-specific matchers over the raw note text. Each
//! matcher carries a confidence constant calibrated by format
//! specificity: keyword-anchored matchers (DOB, MRN, SSN, account) score
//! higher than bare pattern matches, and anchored matchers report the
//! span of the value capture group only, so the clinical keyword itself
//! survives redaction.

use ns_common::{sort_spans, DetectionSpan, PhiLabel, SpanSource};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use tracing::debug;

/// One matcher in the battery.
struct PatternDef {
    label: PhiLabel,
    confidence: f64,
    pattern: Regex,
    /// 1-based capture group holding the PHI value; 0 uses the whole match.
    group: usize,
    description: &'static str,
}

static PATTERNS: Lazy<Vec<PatternDef>> = Lazy::new(|| {
    vec![
    PatternDef {
        label: PhiLabel::Email,
        confidence: 0.95,
        pattern: Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap(),
        group: 0,
        description: "email address",
    },
    PatternDef {
        label: PhiLabel::Phone,
        confidence: 0.88,
        pattern: Regex::new(r"(?:\+?1[-.\s]?)?(?:\(\d{3}\)\s?|\d{3}[-.\s])\d{3}[-.\s]\d{4}\b").unwrap(),
        group: 0,
        description: "phone number",
    },
    PatternDef {
        label: PhiLabel::Ssn,
        confidence: 0.95,
        pattern: Regex::new(r"(?i)\bSSN\s*[:#]{0,2}\s*(\d{3}-?\d{2}-?\d{4})\b").unwrap(),
        group: 1,
        description: "SSN (anchored)",
    },
    PatternDef {
        label: PhiLabel::Ssn,
        confidence: 0.92,
        pattern: Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap(),
        group: 0,
        description: "SSN (dashed)",
    },
    PatternDef {
        label: PhiLabel::Mrn,
        confidence: 0.93,
        pattern: Regex::new(r"(?i)\b(?:MRN|medical record number)\s*[:#]{0,2}\s*(\d{5,10})\b").unwrap(),
        group: 1,
        description: "medical record number (anchored)",
    },
    PatternDef {
        label: PhiLabel::Account,
        confidence: 0.90,
        pattern: Regex::new(r"(?i)\b(?:account|acct)\.?\s*(?:number|no\.?)?\s*[:#]{0,2}\s*(\d{5,12})\b")
                .unwrap(),
        group: 1,
        description: "account number (anchored)",
    },
    PatternDef {
        label: PhiLabel::Url,
        confidence: 0.90,
        pattern: Regex::new(r#"https?://[^\s<>"')\]]+"#).unwrap(),
        group: 0,
        description: "URL",
    },
    PatternDef {
        label: PhiLabel::Ip,
        confidence: 0.85,
        pattern: Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap(),
        group: 0,
        description: "IPv4 address",
    },
    PatternDef {
        label: PhiLabel::Date,
        confidence: 0.90,
        pattern: Regex::new(
                r"(?i)\b(?:DOB|date of birth|birth\s?date)\s*[:#]{0,2}\s*(\d{4}[-/]\d{1,2}[-/]\d{1,2}|\d{1,2}[-/]\d{1,2}[-/]\d{2,4})",
            )
            .unwrap(),
        group: 1,
        description: "date of birth (anchored)",
    },
    PatternDef {
        label: PhiLabel::Date,
        confidence: 0.90,
        pattern: Regex::new(r"\b\d{4}[-/]\d{1,2}[-/]\d{1,2}\b").unwrap(),
        group: 0,
        description: "ISO date",
    },
    PatternDef {
        label: PhiLabel::Date,
        confidence: 0.83,
        pattern: Regex::new(r"\b\d{1,2}[-/]\d{1,2}[-/]\d{2,4}\b").unwrap(),
        group: 0,
        description: "numeric date",
    },
    PatternDef {
        label: PhiLabel::Date,
        confidence: 0.87,
        pattern: Regex::new(
                r"(?i)\b\d{1,2}[-\s](?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?[-\s,]\s*\d{2,4}\b",
            )
            .unwrap(),
        group: 0,
        description: "day month-name date",
    },
    PatternDef {
        label: PhiLabel::Date,
        confidence: 0.85,
        pattern: Regex::new(
                r"(?i)\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2}(?:\s*,\s*\d{4})?\b",
            )
            .unwrap(),
        group: 0,
        description: "month-name day date",
    },
    ]
});

/// Run the full battery over `text`.
///
/// Pure, synchronous, and deterministic: the same text always yields the
/// same spans (modulo freshly generated ids). Never fails; text with no
/// matches yields an empty vec. Output is sorted ascending by `start`,
/// ties broken by descending `end`.
pub fn detect(text: &str) -> Vec<DetectionSpan> {
    let mut spans = Vec::new();

    for def in PATTERNS.iter() {
        for caps in def.pattern.captures_iter(text) {
            let m = match caps.get(def.group) {
                Some(m) => m,
                None => continue,
            };
            match DetectionSpan::try_new(
                def.label,
                m.start(),
                m.end(),
                def.confidence,
                SpanSource::Pattern,
            ) {
                Some(span) => spans.push(span),
                None => {
                    debug!(
                        start = m.start(),
                        end = m.end(),
                        matcher = def.description,
                        "dropping degenerate match"
                    );
                }
            }
        }
    }

    dedup_identical(&mut spans);
    sort_spans(&mut spans);
    spans
}

/// Collapse matches with identical (range, label), e.g. a date hit by
/// both an anchored and a bare matcher, keeping the higher confidence.
/// Overlapping-but-distinct matches are kept; resolving those is the
/// merge engine's job.
fn dedup_identical(spans: &mut Vec<DetectionSpan>) {
    spans.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then(a.end.cmp(&b.end))
            .then((a.label as u8).cmp(&(b.label as u8)))
            .then(
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(Ordering::Equal),
            )
    });
    spans.dedup_by(|b, a| a.start == b.start && a.end == b.end && a.label == b.label);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The span for `needle` must cover exactly its character range.
    fn assert_exact_span(text: &str, needle: &str, label: PhiLabel) {
        let start = text.find(needle).expect("needle present");
        let spans = detect(text);
        let hit = spans
            .iter()
            .find(|s| s.label == label && s.start == start && s.end == start + needle.len());
        assert!(
            hit.is_some(),
            "no {:?} span over {:?} in {:?}; got {:?}",
            label,
            needle,
            text,
            spans
                .iter()
                .map(|s| (s.label, s.start, s.end))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_email_exact_range() {
        assert_exact_span(
            "Contact jane.doe@example.org for records.",
            "jane.doe@example.org",
            PhiLabel::Email,
        );
    }

    #[test]
    fn test_phone_formats() {
        assert_exact_span("Call 555-123-4567 today", "555-123-4567", PhiLabel::Phone);
        assert_exact_span("Call (555) 123-4567 today", "(555) 123-4567", PhiLabel::Phone);
        assert_exact_span(
            "Call +1 555-123-4567 today",
            "+1 555-123-4567",
            PhiLabel::Phone,
        );
    }

    #[test]
    fn test_ssn_dashed() {
        assert_exact_span("ssn on file 123-45-6789.", "123-45-6789", PhiLabel::Ssn);
    }

    #[test]
    fn test_ssn_anchored_value_only() {
        let text = "SSN: 123456789 verified";
        assert_exact_span(text, "123456789", PhiLabel::Ssn);
        let spans = detect(text);
        let ssn = spans.iter().find(|s| s.label == PhiLabel::Ssn).unwrap();
        assert!(ssn.confidence >= 0.95);
        // the keyword itself is not part of the span
        assert_eq!(ssn.start, text.find("123456789").unwrap());
    }

    #[test]
    fn test_ssn_not_confused_with_phone() {
        let spans = detect("123-45-6789");
        assert!(spans.iter().all(|s| s.label != PhiLabel::Phone));
    }

    #[test]
    fn test_mrn_anchored() {
        assert_exact_span("MRN: 00452817", "00452817", PhiLabel::Mrn);
        assert_exact_span("medical record number 123456", "123456", PhiLabel::Mrn);
    }

    #[test]
    fn test_account_anchored() {
        assert_exact_span("Account #: 9981234", "9981234", PhiLabel::Account);
        assert_exact_span("acct no. 55512345", "55512345", PhiLabel::Account);
    }

    #[test]
    fn test_url_and_ip() {
        assert_exact_span(
            "portal at https://portal.example.org/visit?id=1",
            "https://portal.example.org/visit?id=1",
            PhiLabel::Url,
        );
        assert_exact_span("from host 10.0.12.9 at night", "10.0.12.9", PhiLabel::Ip);
    }

    #[test]
    fn test_iso_date() {
        assert_exact_span("Admitted 2024-06-01 overnight", "2024-06-01", PhiLabel::Date);
        assert_exact_span("Admitted 2024/6/1 overnight", "2024/6/1", PhiLabel::Date);
    }

    #[test]
    fn test_numeric_date() {
        let text = "Seen 03/15/1980 in clinic";
        assert_exact_span(text, "03/15/1980", PhiLabel::Date);
        let spans = detect(text);
        let date = spans.iter().find(|s| s.label == PhiLabel::Date).unwrap();
        assert_eq!(date.confidence, 0.83);
    }

    #[test]
    fn test_anchored_dob_scores_higher() {
        let text = "Patient DOB: 03/15/1980";
        let spans = detect(text);
        let start = text.find("03/15/1980").unwrap();
        let date = spans
            .iter()
            .find(|s| s.label == PhiLabel::Date && s.start == start)
            .expect("DOB date span");
        assert_eq!(date.end, start + "03/15/1980".len());
        assert!(date.confidence >= 0.90);
        // the anchored and bare matches collapse to one span
        assert_eq!(
            spans.iter().filter(|s| s.label == PhiLabel::Date).count(),
            1
        );
    }

    #[test]
    fn test_month_name_dates() {
        assert_exact_span("Discharged 15-Mar-2024 home", "15-Mar-2024", PhiLabel::Date);
        assert_exact_span("Discharged 15 March 2024 home", "15 March 2024", PhiLabel::Date);
        assert_exact_span("Discharged March 15, 2024 home", "March 15, 2024", PhiLabel::Date);
    }

    #[test]
    fn test_month_name_without_year_still_detected() {
        assert_exact_span("Follow up March 15 next visit", "March 15", PhiLabel::Date);
    }

    #[test]
    fn test_iso_not_double_matched_as_numeric() {
        let spans = detect("on 2024-06-01 only");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].confidence, 0.90);
    }

    #[test]
    fn test_output_sorted() {
        let text = "DOB: 01/02/1990, call 555-123-4567 or jane@example.org";
        let spans = detect(text);
        for pair in spans.windows(2) {
            assert!(
                pair[0].start < pair[1].start
                    || (pair[0].start == pair[1].start && pair[0].end >= pair[1].end)
            );
        }
    }

    #[test]
    fn test_clean_text_empty_result() {
        assert!(detect("Patient resting comfortably, no acute distress.").is_empty());
        assert!(detect("").is_empty());
    }

    #[test]
    fn test_all_sources_pattern() {
        let spans = detect("DOB: 01/02/1990 jane@example.org");
        assert!(!spans.is_empty());
        assert!(spans.iter().all(|s| s.source == SpanSource::Pattern));
    }
}
