//! Compact identifier types.
//!
//! Ids are short uuid-derived strings: unique within a session, cheap to
//! clone, and safe to log (they carry no PHI).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a detection span, unique within a detection session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpanId(pub String);

impl SpanId {
    /// Generate a new span id.
    ///
    /// Format: `sp-xxxxxxxx` (first 8 hex chars of a v4 uuid).
    pub fn new() -> Self {
        SpanId(format!("sp-{}", short_suffix()))
    }
}

impl Default for SpanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a document within a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    /// Generate a new document id.
    ///
    /// Format: `doc-xxxxxxxx`.
    pub fn new() -> Self {
        DocumentId(format!("doc-{}", short_suffix()))
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn short_suffix() -> String {
    let uuid = uuid::Uuid::new_v4();
    uuid.simple().to_string()[..8].to_string()
}
