//! Header tokens.
//!
//! One single-line metadata token per bundled document: role, sequence,
//! day offset. Shaped like the system's other bracketed tokens so the
//! leak scanner ignores it, and carrying zero PHI.

use crate::error::{BundleError, Result};
use ns_temporal::format_offset;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[([A-Z][A-Z0-9 _-]*)/(\d+): T([+-])(\d+) DAYS\]$").unwrap());

/// Non-PHI metadata token prefixed to each bundled document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderToken {
    /// Document role (e.g. "operative note"). Rendered uppercase.
    pub role: String,

    /// Position within the bundle; unique, starts at 1.
    pub sequence: u32,

    /// Signed day offset from the bundle anchor.
    pub offset_days: i64,
}

impl HeaderToken {
    /// Build a token, validating role and sequence.
    pub fn new(role: impl Into<String>, sequence: u32, offset_days: i64) -> Result<Self> {
        let role = role.into();
        if role.trim().is_empty() {
            return Err(BundleError::EmptyRole);
        }
        if sequence == 0 {
            return Err(BundleError::ZeroSequence);
        }
        Ok(HeaderToken {
            role,
            sequence,
            offset_days,
        })
    }

    /// Render the single-line token, e.g. `[OPERATIVE NOTE/2: T+30 DAYS]`.
    pub fn render(&self) -> String {
        format!(
            "[{}/{}: {} DAYS]",
            self.role.trim().to_uppercase(),
            self.sequence,
            format_offset(self.offset_days)
        )
    }

    /// Parse a rendered token back into its fields.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = HEADER.captures(line.trim())?;
        let role = caps[1].to_string();
        let sequence: u32 = caps[2].parse().ok()?;
        if sequence == 0 {
            return None;
        }
        let magnitude: i64 = caps[4].parse().ok()?;
        let offset_days = if &caps[3] == "-" { -magnitude } else { magnitude };
        Some(HeaderToken {
            role,
            sequence,
            offset_days,
        })
    }
}
