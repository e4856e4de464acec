//! Merge engine for PHI detection spans.
//!
//! Consumes the pattern battery's spans and the model detector's batches,
//! applies the caller's merge policy, and owns the one authoritative,
//! editable span set for a detection session. Re-merging the same inputs
//! always yields the same result: the merged view is recomputed from the
//! retained raw inputs on every mutation.

pub mod engine;
pub mod error;

pub use engine::{MergeEngine, SessionState};
pub use error::{MergeError, Result};
