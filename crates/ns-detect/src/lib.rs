//! PHI detection for clinical note text.
//!
//! Two producers feed the merge engine:
//!
//! - **Pattern battery** (`detect`): deterministic, synchronous regex
//!   matching over a fixed set of PHI formats. Pure and infallible.
//! - **Model detector contract** (`ModelDetector`): the capability
//!   interface for the external probabilistic detector. It streams span
//!   batches over a channel, terminates with exactly one done/error
//!   event, and is cancellable at any point without aborting the
//!   pipeline.
//!
//! A scripted playback implementation of the contract ships for tests
//! and integration harnesses.

pub mod model;
pub mod pattern;
pub mod scripted;

pub use model::{ModelDetector, ModelEvent, ModelSession, ModelStatus};
pub use pattern::detect;
pub use scripted::{ScriptedModelDetector, SpanSpec};
