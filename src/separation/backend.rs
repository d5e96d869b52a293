//! Separation backend trait
//!
//! The separation library is an opaque collaborator reached through blocking
//! calls. This trait is the seam: the production implementation talks to
//! Python, tests substitute scripted backends.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::device::ProbeReport;
use crate::error::Result;

/// Versions reported by a successful handshake
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    #[serde(default)]
    pub separator_version: Option<String>,
    #[serde(default)]
    pub torch_version: Option<String>,
    #[serde(default)]
    pub python_version: Option<String>,
}

/// Trait for stem separation backends
///
/// All calls block the caller. Call order for one run is `handshake`,
/// `probe_devices`, `prepare`, `load_model`, `separate`.
pub trait SeparationBackend {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Verify the runtime and separation library are importable
    ///
    /// Fails with `StemError::MissingDependency` when they are not.
    fn handshake(&mut self) -> Result<Handshake>;

    /// Report the compute devices the runtime can see
    fn probe_devices(&mut self) -> Result<ProbeReport>;

    /// Construct the separator for a device and output directory
    ///
    /// # Arguments
    /// * `device` - Device string already translated for the library
    /// * `output_dir` - Directory the library writes stems into
    fn prepare(&mut self, device: &str, output_dir: &Path) -> Result<()>;

    /// Load model weights; the slow part of start-up
    fn load_model(&mut self, model_file: &str) -> Result<()>;

    /// Run the separation and return the raw output paths
    ///
    /// Paths may be relative to the output directory.
    fn separate(&mut self, input: &Path) -> Result<Vec<PathBuf>>;

    /// Input duration in seconds for formats not readable locally
    fn audio_duration(&mut self, input: &Path) -> Option<f64> {
        let _ = input;
        None
    }
}
