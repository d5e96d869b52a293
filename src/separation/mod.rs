//! Stem separation
//!
//! This module provides:
//! - `SeparationBackend`, the seam to the separation library, and
//!   `PythonBridge`, its production implementation
//! - `SeparationModel`, the supported models
//! - `Orchestrator`, which runs one job and writes the progress stream
//! - `StemReconciler`, which gives raw outputs canonical stem names

mod audio;
mod backend;
mod bridge;
mod models;
mod orchestrator;
mod reconcile;
mod stems;

pub use audio::wav_duration;
pub use backend::{Handshake, SeparationBackend};
pub use bridge::{PythonBridge, DRIVER_SCRIPT};
pub use models::SeparationModel;
pub use orchestrator::{
    expected_processing_secs, ErrorInfo, Orchestrator, RunContext, RunResult, SeparationJob,
};
pub use reconcile::{classify, Reconciliation, StemReconciler, StemRule, STEM_RULES};
pub use stems::{Stem, StemMapping};
