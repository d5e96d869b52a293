//! Separation run lifecycle
//!
//! One run walks Init → Loading → Transition → Processing → Finalizing →
//! Terminal. Fixed checkpoints are emitted between phases; inside the two slow
//! phases an estimator task fills the gap while the backend call blocks this
//! thread. Every estimator is stopped before the next line is written, on
//! success and on failure alike.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::audio::wav_duration;
use super::backend::SeparationBackend;
use super::models::SeparationModel;
use super::reconcile::{Reconciliation, StemReconciler};
use super::stems::StemMapping;
use crate::config::{PhaseTiming, SeparatorConfig};
use crate::device::{resolve, DeviceCatalog, DeviceDescriptor, DeviceTranslation, Resolution};
use crate::error::{Result, StemError};
use crate::progress::{EstimatorTask, PhaseEstimator, ProgressEmitter, StopOutcome};

/// Checkpoint emitted right before the loading estimator starts
const LOADING_SEED: u8 = 3;

/// Everything one invocation needs, passed explicitly
#[derive(Debug)]
pub struct RunContext {
    pub config: SeparatorConfig,
    pub catalog: DeviceCatalog,
    pub resolution: Resolution,
    pub translation: DeviceTranslation,
    pub emitter: ProgressEmitter,
}

impl RunContext {
    /// Resolve `requested_device` against `catalog` and build the context
    pub fn new(
        config: SeparatorConfig,
        catalog: DeviceCatalog,
        requested_device: &str,
        emitter: ProgressEmitter,
    ) -> Self {
        let resolution = resolve(&catalog, requested_device);
        let translation = match &config.device_map {
            Some(overrides) => DeviceTranslation::default().with_overrides(overrides),
            None => DeviceTranslation::default(),
        };

        info!("Requested device: {}", requested_device);
        info!("Using device: {}", resolution.device);

        Self {
            config,
            catalog,
            resolution,
            translation,
            emitter,
        }
    }

    pub fn device(&self) -> &DeviceDescriptor {
        &self.resolution.device
    }

    /// Device string handed to the separation library
    pub fn device_string(&self) -> String {
        self.translation.translate(self.device())
    }
}

/// One input to separate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparationJob {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub model: SeparationModel,
}

/// Terminal failure summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
    pub suggestions: Vec<String>,
}

impl From<&StemError> for ErrorInfo {
    fn from(err: &StemError) -> Self {
        Self {
            code: err.error_code().to_string(),
            message: err.to_string(),
            suggestions: err
                .recovery_suggestions()
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Outcome of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub stems: StemMapping,
    pub error: Option<ErrorInfo>,
}

impl RunResult {
    pub fn failed(err: &StemError) -> Self {
        Self {
            stems: StemMapping::default(),
            error: Some(ErrorInfo::from(err)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// Expected processing time in seconds
///
/// Unknown or nonsensical durations fall back to the configured default.
pub fn expected_processing_secs(
    audio_secs: Option<f64>,
    device: &DeviceDescriptor,
    config: &SeparatorConfig,
) -> f64 {
    let audio = audio_secs
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .unwrap_or(config.default_audio_duration_secs);
    let factor = if device.is_gpu() {
        config.gpu_realtime_factor
    } else {
        config.cpu_realtime_factor
    };
    audio * factor
}

/// Drives one separation through a backend
pub struct Orchestrator<'a, B: SeparationBackend + ?Sized> {
    ctx: &'a RunContext,
    backend: &'a mut B,
}

impl<'a, B: SeparationBackend + ?Sized> Orchestrator<'a, B> {
    pub fn new(ctx: &'a RunContext, backend: &'a mut B) -> Self {
        Self { ctx, backend }
    }

    /// Run a job and fold any failure into the result
    pub fn run(&mut self, job: &SeparationJob) -> RunResult {
        match self.execute(job) {
            Ok(reconciliation) => RunResult {
                stems: reconciliation.mapping,
                error: None,
            },
            Err(e) => {
                debug!("Run failed: {:?}", e);
                RunResult::failed(&e)
            }
        }
    }

    /// Run a job, emitting the full progress stream and the result line
    pub fn execute(&mut self, job: &SeparationJob) -> Result<Reconciliation> {
        // Pre-flight: nothing is emitted until these pass
        if !job.input.is_file() {
            return Err(StemError::InputNotFound {
                path: job.input.clone(),
            });
        }
        fs::create_dir_all(&job.output_dir)?;
        let output_dir = fs::canonicalize(&job.output_dir)?;

        let config = &self.ctx.config;
        let emitter = &self.ctx.emitter;

        // Init
        emitter.emit(0, "Initializing");
        info!("Model: {} ({})", job.model, job.model.file_name());
        info!("Input: {}", job.input.display());
        info!("Output: {}", output_dir.display());
        emitter.emit(1, "Initializing");
        self.backend.prepare(&self.ctx.device_string(), &output_dir)?;
        emitter.emit(LOADING_SEED, "Loading AI model");

        // Loading
        let estimator = PhaseEstimator::loading(config, LOADING_SEED);
        let task = self.spawn_phase("loading", estimator, &config.loading)?;
        let loaded = self.backend.load_model(job.model.file_name());
        log_stop(task.stop());
        loaded?;

        // Transition
        emitter.emit(11, "Starting separation");
        let audio_secs =
            wav_duration(&job.input).or_else(|| self.backend.audio_duration(&job.input));
        match audio_secs {
            Some(secs) => info!("Audio duration: {:.1}s", secs),
            None => info!(
                "Audio duration unknown, assuming {:.0}s",
                config.default_audio_duration_secs
            ),
        }
        let expected = expected_processing_secs(audio_secs, self.ctx.device(), config);
        if self.ctx.device().is_gpu() {
            info!("Processing with GPU acceleration (estimated {:.0}s)", expected);
        } else {
            info!("Processing with CPU (estimated {:.0}s)", expected);
        }

        // Processing
        let estimator = PhaseEstimator::processing(config, expected);
        let task = self.spawn_phase("processing", estimator, &config.processing)?;
        let separated = self.backend.separate(&job.input);
        log_stop(task.stop());
        let raw_outputs = separated?;

        // Finalizing
        emitter.emit(92, "Writing stems");
        info!("Raw output files: {:?}", raw_outputs);
        let reconciliation = StemReconciler::new(&output_dir).reconcile(&raw_outputs)?;

        for stem in job.model.expected_stems() {
            if !reconciliation.mapping.contains(*stem) {
                warn!("Model {} did not produce a {} stem", job.model, stem);
            }
        }
        if reconciliation.mapping.is_empty() {
            warn!(
                "No recognizable stems in {}; unmatched outputs: {:?}",
                output_dir.display(),
                reconciliation.unmatched
            );
        }

        // Terminal
        emitter.emit(100, "Complete");
        emitter.emit_result(&reconciliation.mapping)?;
        Ok(reconciliation)
    }

    fn spawn_phase(
        &self,
        name: &str,
        estimator: PhaseEstimator,
        timing: &PhaseTiming,
    ) -> Result<EstimatorTask> {
        let task = EstimatorTask::spawn(
            name,
            Arc::new(estimator),
            self.ctx.emitter.clone(),
            timing.tick(),
            self.ctx.config.join_timeout(),
        )?;
        Ok(task)
    }
}

fn log_stop(outcome: StopOutcome) {
    if outcome == StopOutcome::TimedOut {
        warn!("Progress estimator was detached; it will not write further lines");
    }
}
