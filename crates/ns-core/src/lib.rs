//! Caller-facing PHI redaction pipeline.
//!
//! Wires the pieces together: pattern battery and model detector into
//! the merge engine, operator edits over the merged set, redaction with
//! anchored date tokens, the leak-scan gate, and multi-document bundle
//! assembly.
//!
//! # Example
//!
//! ```no_run
//! use ns_core::{run_detection, scan_for_leaks, MergePolicy, RedactionOptions};
//!
//! let mut session = run_detection("Patient DOB: 03/15/1980", MergePolicy::default());
//! let outcome = session.finalize_and_redact(&RedactionOptions::generic());
//! assert!(scan_for_leaks(&outcome.text).is_clean());
//! ```

pub mod error;
pub mod pipeline;

pub use error::{PipelineError, Result};
pub use pipeline::{assemble_bundle, run_detection, run_detection_with_model, DocumentSpec, Session};

pub use ns_bundle::{Bundle, BundleAssembler, BundleDocument, BundleError, HeaderToken};
pub use ns_common::{DetectionSpan, MergeMode, MergePolicy, PhiLabel, SpanId, SpanSource};
pub use ns_detect::{detect, ModelDetector, ModelEvent, ModelSession, ModelStatus};
pub use ns_merge::{MergeError, SessionState};
pub use ns_redact::scan as scan_for_leaks;
pub use ns_redact::{LeakScanResult, RedactionOptions, RedactionOutcome, SpanWarning};
pub use ns_temporal::{parse_date, DateParseResult, TemporalAnchor};
