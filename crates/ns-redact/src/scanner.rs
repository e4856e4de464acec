//! Residual-date leak scanner.
//!
//! The last line of defense before any submission: after the system's
//! own bracketed tokens are removed from consideration, any remaining
//! absolute-date-shaped text is counted, and a non-zero count blocks
//! the operation. Fail-closed, not fail-open.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// The system's own tokens: `[HEAD]` or `[HEAD: payload]` with an
// all-uppercase head (markers, date tokens, header tokens). Stripped
// before counting so they can never trigger a false positive.
static BRACKET_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[A-Z][A-Z0-9 _/+-]*(?::[^\[\]]*)?\]").unwrap());

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{4}[-/]\d{1,2}[-/]\d{1,2}\b").unwrap());

static NUMERIC_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,2}[-/]\d{1,2}[-/]\d{2,4}\b").unwrap());

static MONTH_NAME_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2}(?:st|nd|rd|th)?\s*,?\s*\d{4}|\d{1,2}[-\s](?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?[-\s,]\s*\d{2,4})\b",
    )
    .unwrap()
});

/// Result of one leak scan. Transient; recomputed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeakScanResult {
    /// Total residual date-shaped matches. Any non-zero value blocks
    /// submission.
    pub count: usize,
    /// ISO-shaped matches.
    pub iso: usize,
    /// US-numeric-shaped matches.
    pub numeric: usize,
    /// Month-name-shaped matches.
    pub month_name: usize,
}

impl LeakScanResult {
    /// True when the text is safe to submit.
    pub fn is_clean(&self) -> bool {
        self.count == 0
    }
}

/// Count residual absolute-date-shaped text outside recognized tokens.
///
/// Pure and side-effect free; cheap enough to re-run on every submit.
pub fn scan(text: &str) -> LeakScanResult {
    // replace rather than delete, so stripping can never splice two
    // innocent fragments into something date-shaped in a way that
    // hides text from the counters
    let stripped = BRACKET_TOKEN.replace_all(text, " ");

    let iso = ISO_DATE.find_iter(&stripped).count();
    let numeric = NUMERIC_DATE.find_iter(&stripped).count();
    let month_name = MONTH_NAME_DATE.find_iter(&stripped).count();

    LeakScanResult {
        count: iso + numeric + month_name,
        iso,
        numeric,
        month_name,
    }
}
