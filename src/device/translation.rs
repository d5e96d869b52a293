//! Device string translation
//!
//! The device string the separation library accepts has changed between
//! library versions (DirectML in particular has been both `directml:N` and
//! `privateuseone:N`). Templates are per kind and may be overridden from
//! configuration with `kind=template` pairs, e.g.
//! `directml=privateuseone:{index}`.

use std::collections::HashMap;

use log::warn;

use super::{DeviceDescriptor, DeviceKind};

const INDEX_PLACEHOLDER: &str = "{index}";

/// Per-kind device string templates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTranslation {
    templates: HashMap<DeviceKind, String>,
}

impl Default for DeviceTranslation {
    fn default() -> Self {
        let templates = DeviceKind::ALL
            .into_iter()
            .map(|kind| {
                let template = if kind.is_indexed() {
                    format!("{}:{}", kind.prefix(), INDEX_PLACEHOLDER)
                } else {
                    kind.prefix().to_string()
                };
                (kind, template)
            })
            .collect();

        Self { templates }
    }
}

impl DeviceTranslation {
    /// Default table with `kind=template` overrides applied
    ///
    /// Entries are comma separated; malformed entries are logged and skipped.
    pub fn with_overrides(mut self, overrides: &str) -> Self {
        for entry in overrides.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let Some((prefix, template)) = entry.split_once('=') else {
                warn!("Ignoring device map entry without '=': {:?}", entry);
                continue;
            };
            let Some(kind) = DeviceKind::from_prefix(&prefix.trim().to_ascii_lowercase()) else {
                warn!("Ignoring device map entry for unknown kind: {:?}", prefix);
                continue;
            };
            let template = template.trim();
            if template.is_empty() {
                warn!("Ignoring empty device map template for {}", kind);
                continue;
            }
            self.templates.insert(kind, template.to_string());
        }
        self
    }

    pub fn with_template(mut self, kind: DeviceKind, template: impl Into<String>) -> Self {
        self.templates.insert(kind, template.into());
        self
    }

    /// Device string to hand to the separation library
    pub fn translate(&self, device: &DeviceDescriptor) -> String {
        match self.templates.get(&device.kind) {
            Some(template) => {
                template.replace(INDEX_PLACEHOLDER, &device.index.unwrap_or(0).to_string())
            }
            None => device.id.clone(),
        }
    }
}
