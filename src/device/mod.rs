//! Compute device catalog and resolution
//!
//! This module provides:
//! - `DeviceKind`, the closed set of backends the separator can run on
//! - `DeviceCatalog`, the devices found on this host
//! - `resolve`, which maps a user token to a catalog entry and never fails
//! - `DeviceTranslation`, the table turning a descriptor into the device string
//!   the separation library expects

mod catalog;
mod resolver;
mod translation;

pub use catalog::{DeviceCatalog, DeviceProbe, ProbeReport};
pub use resolver::{parse_token, resolve, Resolution, ResolveWarning};
pub use translation::DeviceTranslation;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend family of a compute device
///
/// Declaration order is catalog order, which is also `auto` preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Always available
    Cpu,
    /// NVIDIA CUDA (and ROCm builds exposing the CUDA API)
    Cuda,
    /// DirectML on Windows (AMD/Intel GPUs)
    DirectMl,
    /// Metal Performance Shaders on Apple silicon
    Mps,
}

impl DeviceKind {
    /// All kinds in probe order
    pub const ALL: [DeviceKind; 4] = [
        DeviceKind::Cpu,
        DeviceKind::Cuda,
        DeviceKind::DirectMl,
        DeviceKind::Mps,
    ];

    /// Token prefix used on the CLI and in the wire protocol
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Cuda => "cuda",
            Self::DirectMl => "directml",
            Self::Mps => "mps",
        }
    }

    /// Look up a kind by its token prefix
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.prefix() == prefix)
    }

    pub fn is_gpu(&self) -> bool {
        !matches!(self, Self::Cpu)
    }

    /// Whether devices of this kind carry an index (`cuda:1`)
    pub fn is_indexed(&self) -> bool {
        matches!(self, Self::Cuda | Self::DirectMl)
    }

    /// Whether this kind may be probed on the given `std::env::consts::OS`
    pub fn is_probed_on(&self, os: &str) -> bool {
        match self {
            Self::DirectMl => os == "windows",
            _ => true,
        }
    }

    /// Name used when the runtime does not report one
    pub fn fallback_name(&self, index: Option<usize>) -> String {
        match self {
            Self::Cpu => "CPU".to_string(),
            Self::Cuda => format!("CUDA Device {}", index.unwrap_or(0)),
            Self::DirectMl => format!("DirectML Device {}", index.unwrap_or(0)),
            Self::Mps => "Apple Silicon GPU".to_string(),
        }
    }

    /// Canonical token for a device of this kind
    pub fn token(&self, index: Option<usize>) -> String {
        match index {
            Some(i) if self.is_indexed() => format!("{}:{}", self.prefix(), i),
            _ => self.prefix().to_string(),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// One compute device found on the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Canonical token (`cpu`, `cuda:0`, `directml:0`, `mps`)
    pub id: String,
    /// Human-readable name reported by the runtime
    pub display_name: String,
    pub kind: DeviceKind,
    pub index: Option<usize>,
}

impl DeviceDescriptor {
    pub fn new(kind: DeviceKind, index: Option<usize>, display_name: impl Into<String>) -> Self {
        let index = if kind.is_indexed() {
            Some(index.unwrap_or(0))
        } else {
            None
        };
        let display_name = display_name.into();
        let display_name = if display_name.trim().is_empty() {
            kind.fallback_name(index)
        } else {
            display_name
        };

        Self {
            id: kind.token(index),
            display_name,
            kind,
            index,
        }
    }

    pub fn cpu() -> Self {
        Self::new(DeviceKind::Cpu, None, "CPU")
    }

    pub fn is_gpu(&self) -> bool {
        self.kind.is_gpu()
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.display_name)
    }
}
