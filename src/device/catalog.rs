//! Device enumeration
//!
//! The catalog is built once per invocation from a `DeviceProbe`. Kinds are
//! probed in fixed order and a kind the probe cannot see is simply absent.

use std::collections::HashSet;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::{DeviceDescriptor, DeviceKind};

/// Source of per-kind device information
pub trait DeviceProbe {
    /// Names of the devices of `kind`, in index order. Empty when absent.
    fn device_names(&self, kind: DeviceKind) -> Vec<String>;
}

/// Device inventory reported by the ML runtime
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    /// PyTorch version, when importable
    #[serde(default)]
    pub torch_version: Option<String>,

    /// CUDA device names in index order
    #[serde(default)]
    pub cuda: Vec<String>,

    /// DirectML device names; `None` when `torch_directml` is not importable
    #[serde(default)]
    pub directml: Option<Vec<String>>,

    /// Whether the MPS backend reports itself available
    #[serde(default)]
    pub mps: bool,
}

impl DeviceProbe for ProbeReport {
    fn device_names(&self, kind: DeviceKind) -> Vec<String> {
        match kind {
            DeviceKind::Cpu => vec![kind.fallback_name(None)],
            DeviceKind::Cuda => self.cuda.clone(),
            DeviceKind::DirectMl => self.directml.clone().unwrap_or_default(),
            DeviceKind::Mps if self.mps => vec![kind.fallback_name(None)],
            DeviceKind::Mps => Vec::new(),
        }
    }
}

/// Ordered, read-only list of devices on this host
///
/// The CPU is always present and always first; ids are unique.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceCatalog {
    devices: Vec<DeviceDescriptor>,
}

impl DeviceCatalog {
    /// Catalog with only the CPU
    pub fn cpu_only() -> Self {
        Self {
            devices: vec![DeviceDescriptor::cpu()],
        }
    }

    /// Enumerate devices for the current host OS
    pub fn enumerate(probe: &dyn DeviceProbe) -> Self {
        Self::enumerate_for_os(probe, std::env::consts::OS)
    }

    /// Enumerate devices as if running on `os`
    pub fn enumerate_for_os(probe: &dyn DeviceProbe, os: &str) -> Self {
        let mut devices = Vec::new();

        for kind in DeviceKind::ALL {
            if kind == DeviceKind::Cpu {
                continue;
            }
            if !kind.is_probed_on(os) {
                debug!("Skipping {} probe on {}", kind, os);
                continue;
            }
            for (index, name) in probe.device_names(kind).into_iter().enumerate() {
                devices.push(DeviceDescriptor::new(kind, Some(index), name));
            }
        }

        Self::from_descriptors(devices)
    }

    /// Build a catalog from explicit descriptors
    ///
    /// A CPU entry is placed first regardless of input, and later duplicates
    /// of an id are dropped.
    pub fn from_descriptors<I>(descriptors: I) -> Self
    where
        I: IntoIterator<Item = DeviceDescriptor>,
    {
        let mut devices = vec![DeviceDescriptor::cpu()];
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(devices[0].id.clone());

        for descriptor in descriptors {
            if descriptor.kind == DeviceKind::Cpu {
                continue;
            }
            if !seen.insert(descriptor.id.clone()) {
                warn!("Duplicate device id {} ignored", descriptor.id);
                continue;
            }
            devices.push(descriptor);
        }

        // Stable sort keeps index order within a kind.
        devices.sort_by_key(|d| d.kind);

        Self { devices }
    }

    pub fn devices(&self) -> &[DeviceDescriptor] {
        &self.devices
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceDescriptor> {
        self.devices.iter()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Never true: the CPU entry is always present
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn cpu(&self) -> &DeviceDescriptor {
        &self.devices[0]
    }

    /// Find a descriptor by exact id
    pub fn get(&self, id: &str) -> Option<&DeviceDescriptor> {
        self.devices.iter().find(|d| d.id == id)
    }

    /// Find a descriptor by kind and index
    pub fn find(&self, kind: DeviceKind, index: Option<usize>) -> Option<&DeviceDescriptor> {
        self.devices
            .iter()
            .find(|d| d.kind == kind && (!kind.is_indexed() || d.index == index))
    }

    /// First GPU in catalog order
    pub fn first_gpu(&self) -> Option<&DeviceDescriptor> {
        self.devices.iter().find(|d| d.is_gpu())
    }

    /// Human-readable inventory, one device per line
    pub fn summary(&self) -> String {
        let mut out = format!("Available devices ({}):", self.devices.len());
        for device in &self.devices {
            out.push_str(&format!("\n  {}: {}", device.id, device.display_name));
        }
        out
    }
}
