//! Redaction and leak scanning.
//!
//! The applier turns a finalized span set into redacted text: date
//! spans become anchored relative-offset tokens, everything else gets a
//! fixed generic marker, and replacements are spliced strictly
//! right-to-left so offsets can never drift. The leak scanner is the
//! hard gate afterwards: it counts residual absolute-date-shaped text
//! outside the system's own bracketed tokens, and any non-zero count
//! blocks submission.

pub mod applier;
pub mod scanner;

pub use applier::{apply, RedactionOptions, RedactionOutcome, SpanWarning};
pub use scanner::{scan, LeakScanResult};
