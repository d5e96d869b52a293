//! Estimated progress reporting
//!
//! The separation library exposes no progress callback, so progress is an
//! estimate: an asymptotic curve per phase, driven by a background task,
//! written through a shared line-oriented emitter. It can under- or
//! over-shoot the real completion time.

mod emitter;
mod estimator;
mod task;

pub use emitter::{ProgressEmitter, ProgressEvent, PROGRESS_PREFIX};
pub use estimator::{format_clock, PhaseEstimate, PhaseEstimator, PhaseKind};
pub use task::{EstimatorTask, StopOutcome};
