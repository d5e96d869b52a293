//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command. Machine-readable output
//! goes to stdout; human diagnostics go to stderr.

use std::path::Path;

use log::{debug, info, warn};

use crate::config::SeparatorConfig;
use crate::device::DeviceCatalog;
use crate::error::{Result, StemError};
use crate::progress::ProgressEmitter;
use crate::separation::{
    Orchestrator, PythonBridge, RunContext, RunResult, SeparationBackend, SeparationJob,
    SeparationModel,
};

/// Verify the separation library and report versions and devices.
pub fn check(config: &SeparatorConfig) -> Result<()> {
    info!("Checking installation with {}", config.python);
    debug!("Configuration: {}", serde_json::to_string(config)?);

    let mut bridge = PythonBridge::new(&config.python);
    let handshake = bridge.handshake()?;
    let catalog = build_catalog(&mut bridge);

    eprintln!(
        "audio-separator: OK ({})",
        handshake.separator_version.as_deref().unwrap_or("unknown version")
    );
    if let Some(torch) = &handshake.torch_version {
        eprintln!("PyTorch: {}", torch);
    }
    if let Some(python) = &handshake.python_version {
        eprintln!("Python: {}", python);
    }
    eprintln!();
    eprintln!("{}", catalog.summary());

    println!("Installation OK!");
    Ok(())
}

/// Print the supported models.
pub fn list_models() {
    println!("Available models:");
    for model in SeparationModel::ALL {
        let marker = if model == SeparationModel::default() {
            " [default]"
        } else {
            ""
        };
        println!("  {} - {}{}", model.name(), model.description(), marker);
    }
}

/// Print the compute devices visible to the runtime.
pub fn list_devices(config: &SeparatorConfig) -> Result<()> {
    let mut bridge = PythonBridge::new(&config.python);
    let catalog = build_catalog(&mut bridge);
    println!("{}", catalog.summary());
    Ok(())
}

/// Probe devices through a backend, falling back to a CPU-only catalog.
pub fn build_catalog<B: SeparationBackend + ?Sized>(backend: &mut B) -> DeviceCatalog {
    match backend.probe_devices() {
        Ok(report) => {
            if let Some(torch) = &report.torch_version {
                debug!("PyTorch {}", torch);
            }
            DeviceCatalog::enumerate(&report)
        }
        Err(e) => {
            warn!("Device probe failed, only the CPU is available: {}", e);
            DeviceCatalog::cpu_only()
        }
    }
}

/// Separate one input with the production Python bridge.
pub fn separate(
    input: &Path,
    output_dir: &Path,
    model: SeparationModel,
    device: &str,
    config: SeparatorConfig,
) -> RunResult {
    let mut bridge = PythonBridge::new(&config.python);
    let emitter = ProgressEmitter::stdout();
    separate_with(&mut bridge, input, output_dir, model, device, config, emitter)
}

/// Separate one input with any backend.
///
/// Pre-flight failures (missing input, missing dependencies) are reported
/// before any progress line is written.
pub fn separate_with<B: SeparationBackend + ?Sized>(
    backend: &mut B,
    input: &Path,
    output_dir: &Path,
    model: SeparationModel,
    device: &str,
    config: SeparatorConfig,
    emitter: ProgressEmitter,
) -> RunResult {
    if !input.is_file() {
        return RunResult::failed(&StemError::InputNotFound {
            path: input.to_path_buf(),
        });
    }

    if let Err(e) = backend.handshake() {
        return RunResult::failed(&e);
    }
    info!("Using {} backend", backend.name());

    let catalog = build_catalog(backend);
    let ctx = RunContext::new(config, catalog, device, emitter);
    let job = SeparationJob {
        input: input.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        model,
    };

    Orchestrator::new(&ctx, backend).run(&job)
}
