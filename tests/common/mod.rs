//! Shared test helpers

#![allow(dead_code)]

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use stemperator::config::SeparatorConfig;
use stemperator::device::ProbeReport;
use stemperator::progress::{ProgressEmitter, ProgressEvent};
use stemperator::separation::{Handshake, SeparationBackend};
use stemperator::{Result, StemError};

/// In-memory writer shared between the emitter and the test
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    pub fn emitter(&self) -> ProgressEmitter {
        ProgressEmitter::new(Box::new(self.clone()))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(str::to_string).collect()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.lines()
            .iter()
            .filter_map(|line| ProgressEvent::parse(line))
            .collect()
    }

    pub fn percents(&self) -> Vec<u8> {
        self.events().iter().map(|e| e.percent).collect()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Config with short ticks so phases produce several lines quickly
pub fn fast_config() -> SeparatorConfig {
    let mut config = SeparatorConfig::default();
    config.loading.tick_ms = 5;
    config.processing.tick_ms = 5;
    config.join_timeout_ms = 500;
    config
}

pub fn is_non_decreasing(values: &[u8]) -> bool {
    values.windows(2).all(|w| w[0] <= w[1])
}

/// Scripted backend that writes placeholder outputs like the real library
#[derive(Debug, Default)]
pub struct MockBackend {
    pub probe: ProbeReport,
    /// File names created in the output directory by `separate`
    pub outputs: Vec<String>,
    pub load_delay: Duration,
    pub separate_delay: Duration,
    pub missing_dependency: bool,
    pub fail_load: Option<String>,
    pub fail_separate: Option<String>,
    pub duration: Option<f64>,

    pub calls: Vec<String>,
    pub prepared_device: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub loaded_model: Option<String>,
}

impl MockBackend {
    pub fn with_outputs(outputs: &[&str]) -> Self {
        Self {
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }
}

impl SeparationBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn handshake(&mut self) -> Result<Handshake> {
        self.calls.push("handshake".to_string());
        if self.missing_dependency {
            return Err(StemError::MissingDependency {
                component: "audio-separator".to_string(),
                detail: "No module named 'audio_separator'".to_string(),
            });
        }
        Ok(Handshake {
            separator_version: Some("0.0-mock".to_string()),
            ..Handshake::default()
        })
    }

    fn probe_devices(&mut self) -> Result<ProbeReport> {
        self.calls.push("devices".to_string());
        Ok(self.probe.clone())
    }

    fn prepare(&mut self, device: &str, output_dir: &Path) -> Result<()> {
        self.calls.push("prepare".to_string());
        self.prepared_device = Some(device.to_string());
        self.output_dir = Some(output_dir.to_path_buf());
        Ok(())
    }

    fn load_model(&mut self, model_file: &str) -> Result<()> {
        self.calls.push("load".to_string());
        thread::sleep(self.load_delay);
        if let Some(reason) = &self.fail_load {
            return Err(StemError::ModelLoad {
                model: model_file.to_string(),
                reason: reason.clone(),
            });
        }
        self.loaded_model = Some(model_file.to_string());
        Ok(())
    }

    fn separate(&mut self, _input: &Path) -> Result<Vec<PathBuf>> {
        self.calls.push("separate".to_string());
        thread::sleep(self.separate_delay);
        if let Some(reason) = &self.fail_separate {
            return Err(StemError::Separation {
                reason: reason.clone(),
            });
        }

        let dir = self.output_dir.clone().ok_or_else(|| StemError::Bridge {
            reason: "separate before prepare".to_string(),
        })?;
        for name in &self.outputs {
            fs::write(dir.join(name), name.as_bytes())?;
        }
        Ok(self.outputs.iter().map(PathBuf::from).collect())
    }

    fn audio_duration(&mut self, _input: &Path) -> Option<f64> {
        self.duration
    }
}

/// Write a short silent WAV file
pub fn write_wav(path: &Path, seconds: u32) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for _ in 0..(8000 * 2 * seconds) {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();
}
