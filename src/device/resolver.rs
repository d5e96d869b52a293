//! Device token resolution
//!
//! Resolution never fails: the worst case is the CPU plus a warning.

use std::fmt;

use log::warn;

use super::{DeviceCatalog, DeviceDescriptor, DeviceKind};

/// Why the resolved device differs from the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveWarning {
    /// A known backend kind was requested but that device is not present
    Unavailable { requested: String, fallback: String },
    /// The token names no known backend
    UnknownToken { requested: String },
}

impl fmt::Display for ResolveWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable {
                requested,
                fallback,
            } => write!(
                f,
                "{} requested but not available, falling back to {}",
                requested, fallback
            ),
            Self::UnknownToken { requested } => {
                write!(f, "Unknown device string '{}', falling back to cpu", requested)
            }
        }
    }
}

/// Outcome of resolving a device token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub device: DeviceDescriptor,
    pub warning: Option<ResolveWarning>,
}

impl Resolution {
    fn exact(device: &DeviceDescriptor) -> Self {
        Self {
            device: device.clone(),
            warning: None,
        }
    }

    fn fallback(device: &DeviceDescriptor, warning: ResolveWarning) -> Self {
        warn!("{}", warning);
        Self {
            device: device.clone(),
            warning: Some(warning),
        }
    }
}

/// Split a token into a backend kind and optional index
///
/// Returns `None` for unknown prefixes and malformed indices.
pub fn parse_token(token: &str) -> Option<(DeviceKind, Option<usize>)> {
    let (prefix, index) = match token.split_once(':') {
        Some((prefix, index)) => (prefix, Some(index.trim().parse::<usize>().ok()?)),
        None => (token, None),
    };
    let kind = DeviceKind::from_prefix(prefix.trim())?;
    Some((kind, index))
}

/// Map a requested device token to a catalog entry
///
/// Precedence: `auto`, `cpu`, exact id, same-kind fallback to index 0, CPU.
pub fn resolve(catalog: &DeviceCatalog, requested: &str) -> Resolution {
    let token = requested.trim().to_ascii_lowercase();

    if token == "auto" {
        return Resolution::exact(catalog.first_gpu().unwrap_or_else(|| catalog.cpu()));
    }

    if let Some(device) = catalog.get(&token) {
        return Resolution::exact(device);
    }

    let Some((kind, index)) = parse_token(&token) else {
        // A known prefix with an index that does not parse (`cuda:x`, `cuda:`)
        let malformed = token
            .split_once(':')
            .and_then(|(prefix, _)| DeviceKind::from_prefix(prefix.trim()));
        if let Some(kind) = malformed {
            return fall_back_within(catalog, kind, token);
        }
        return Resolution::fallback(
            catalog.cpu(),
            ResolveWarning::UnknownToken {
                requested: requested.trim().to_string(),
            },
        );
    };

    if kind == DeviceKind::Cpu {
        return Resolution::exact(catalog.cpu());
    }

    let wanted = if kind.is_indexed() {
        Some(index.unwrap_or(0))
    } else {
        None
    };

    // A bare prefix (`cuda`) means index 0 and is not a fallback.
    if let Some(device) = catalog.find(kind, wanted) {
        return Resolution::exact(device);
    }

    fall_back_within(catalog, kind, token)
}

/// First device of `kind` at index 0, else the CPU
fn fall_back_within(catalog: &DeviceCatalog, kind: DeviceKind, token: String) -> Resolution {
    let first_of_kind = if kind.is_indexed() {
        catalog.find(kind, Some(0))
    } else {
        None
    };
    let fallback = first_of_kind.unwrap_or_else(|| catalog.cpu());

    Resolution::fallback(
        fallback,
        ResolveWarning::Unavailable {
            requested: token,
            fallback: fallback.id.clone(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token() {
        assert_eq!(parse_token("cuda:1"), Some((DeviceKind::Cuda, Some(1))));
        assert_eq!(parse_token("directml"), Some((DeviceKind::DirectMl, None)));
        assert_eq!(parse_token("cuda:x"), None);
        assert_eq!(parse_token("vulkan:0"), None);
    }

    #[test]
    fn test_malformed_index_stays_within_kind() {
        let catalog = DeviceCatalog::from_descriptors(vec![DeviceDescriptor::new(
            DeviceKind::Cuda,
            Some(0),
            "",
        )]);
        let resolution = resolve(&catalog, "cuda:x");
        assert_eq!(resolution.device.id, "cuda:0");
        assert_eq!(
            resolution.warning,
            Some(ResolveWarning::Unavailable {
                requested: "cuda:x".to_string(),
                fallback: "cuda:0".to_string(),
            })
        );
    }

    #[test]
    fn test_warning_display() {
        let warning = ResolveWarning::Unavailable {
            requested: "cuda:5".to_string(),
            fallback: "cuda:0".to_string(),
        };
        assert_eq!(
            warning.to_string(),
            "cuda:5 requested but not available, falling back to cuda:0"
        );
    }
}
