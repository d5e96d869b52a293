//! Runtime configuration
//!
//! Defaults are tuned for the audio-separator Demucs models. Every value can be
//! overridden through `STEMPERATOR_*` environment variables; invalid values are
//! logged and ignored.

use std::env;
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

/// Interpreter used when `STEMPERATOR_PYTHON` is unset
pub const DEFAULT_PYTHON: &str = "python3";

/// Audio duration assumed when the input length cannot be determined
pub const DEFAULT_AUDIO_DURATION_SECS: f64 = 180.0;

/// Progress band and timing for one estimated phase
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseTiming {
    /// Lowest percent of the band
    pub floor: u8,
    /// Percent the curve approaches but never reaches
    pub ceiling: u8,
    /// Interval between progress ticks in milliseconds
    pub tick_ms: u64,
}

impl PhaseTiming {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// Configuration for one separation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeparatorConfig {
    /// Python interpreter that has `audio-separator` installed
    pub python: String,

    /// Raw `kind=template` overrides for the device translation table
    pub device_map: Option<String>,

    /// Loading phase band (1..10 by default)
    pub loading: PhaseTiming,

    /// Half-life of the loading curve in seconds
    pub loading_time_constant_secs: f64,

    /// Processing phase band (12..88 by default)
    pub processing: PhaseTiming,

    /// Processing time as a multiple of audio duration on GPU devices
    pub gpu_realtime_factor: f64,

    /// Processing time as a multiple of audio duration on the CPU
    pub cpu_realtime_factor: f64,

    /// Audio duration assumed when it cannot be read
    pub default_audio_duration_secs: f64,

    /// Upper bound on waiting for an estimator to stop
    pub join_timeout_ms: u64,
}

impl Default for SeparatorConfig {
    fn default() -> Self {
        Self {
            python: DEFAULT_PYTHON.to_string(),
            device_map: None,
            loading: PhaseTiming {
                floor: 1,
                ceiling: 10,
                tick_ms: 400,
            },
            loading_time_constant_secs: 15.0,
            processing: PhaseTiming {
                floor: 12,
                ceiling: 88,
                tick_ms: 300,
            },
            gpu_realtime_factor: 0.5,
            cpu_realtime_factor: 3.0,
            default_audio_duration_secs: DEFAULT_AUDIO_DURATION_SECS,
            join_timeout_ms: 1000,
        }
    }
}

impl SeparatorConfig {
    /// Defaults with `STEMPERATOR_*` environment overrides applied
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from a key lookup (the environment in production)
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(python) = lookup("STEMPERATOR_PYTHON").filter(|p| !p.trim().is_empty()) {
            self.python = python;
        }
        if let Some(map) = lookup("STEMPERATOR_DEVICE_MAP") {
            self.device_map = Some(map);
        }
        override_positive(&lookup, "STEMPERATOR_GPU_FACTOR", &mut self.gpu_realtime_factor);
        override_positive(&lookup, "STEMPERATOR_CPU_FACTOR", &mut self.cpu_realtime_factor);
        override_positive(
            &lookup,
            "STEMPERATOR_DEFAULT_DURATION_SECS",
            &mut self.default_audio_duration_secs,
        );
        if let Some(raw) = lookup("STEMPERATOR_JOIN_TIMEOUT_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.join_timeout_ms = ms,
                Err(_) => warn!("Ignoring invalid STEMPERATOR_JOIN_TIMEOUT_MS={:?}", raw),
            }
        }
        self
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

fn override_positive<F>(lookup: &F, key: &str, target: &mut f64)
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => *target = value,
        _ => warn!("Ignoring invalid {}={:?} (expected a positive number)", key, raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SeparatorConfig::default();
        assert_eq!(config.python, "python3");
        assert_eq!((config.loading.floor, config.loading.ceiling), (1, 10));
        assert_eq!((config.processing.floor, config.processing.ceiling), (12, 88));
        assert_eq!(config.join_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_overrides_applied() {
        let config = SeparatorConfig::default().with_overrides(lookup_from(&[
            ("STEMPERATOR_PYTHON", "/opt/venv/bin/python"),
            ("STEMPERATOR_CPU_FACTOR", "4"),
            ("STEMPERATOR_DEVICE_MAP", "directml=privateuseone:{index}"),
        ]));
        assert_eq!(config.python, "/opt/venv/bin/python");
        assert_eq!(config.cpu_realtime_factor, 4.0);
        assert_eq!(
            config.device_map.as_deref(),
            Some("directml=privateuseone:{index}")
        );
    }

    #[test]
    fn test_invalid_overrides_keep_defaults() {
        let config = SeparatorConfig::default().with_overrides(lookup_from(&[
            ("STEMPERATOR_GPU_FACTOR", "-1"),
            ("STEMPERATOR_DEFAULT_DURATION_SECS", "abc"),
            ("STEMPERATOR_JOIN_TIMEOUT_MS", "soon"),
            ("STEMPERATOR_PYTHON", "  "),
        ]));
        assert_eq!(config.gpu_realtime_factor, 0.5);
        assert_eq!(config.default_audio_duration_secs, DEFAULT_AUDIO_DURATION_SECS);
        assert_eq!(config.join_timeout_ms, 1000);
        assert_eq!(config.python, DEFAULT_PYTHON);
    }
}
