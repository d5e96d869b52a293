//! Output stem reconciliation
//!
//! The separation library names its outputs after the input file, the model
//! and its own stem labels (`song_(Vocals)_htdemucs.wav`, `no_vocals.wav`,
//! `Instrumental`), and the scheme varies by backend and version. Each raw
//! output is matched against an ordered rule table and moved to
//! `<output_dir>/<stem>.wav`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::stems::{Stem, StemMapping};
use crate::error::Result;

/// One row of the matching table
///
/// A lower-cased file stem matches when it contains any pattern and none of
/// the exclusions.
#[derive(Debug, Clone, Copy)]
pub struct StemRule {
    pub stem: Stem,
    pub patterns: &'static [&'static str],
    pub excludes: &'static [&'static str],
}

impl StemRule {
    pub fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| name.contains(p))
            && !self.excludes.iter().any(|e| name.contains(e))
    }
}

/// Matching rules in priority order; first match wins
pub const STEM_RULES: &[StemRule] = &[
    StemRule {
        stem: Stem::Vocals,
        patterns: &["vocals", "vocal"],
        excludes: &["no_vocal", "no vocal", "novocal", "instrumental"],
    },
    StemRule {
        stem: Stem::Drums,
        patterns: &["drums", "drum"],
        excludes: &[],
    },
    StemRule {
        stem: Stem::Bass,
        patterns: &["bass"],
        excludes: &[],
    },
    StemRule {
        stem: Stem::Other,
        patterns: &["other", "no_vocals", "no vocals", "instrumental"],
        excludes: &[],
    },
    StemRule {
        stem: Stem::Guitar,
        patterns: &["guitar"],
        excludes: &[],
    },
    StemRule {
        stem: Stem::Piano,
        patterns: &["piano", "keys"],
        excludes: &[],
    },
];

/// Classify a file by its base name (without extension)
pub fn classify(file_stem: &str) -> Option<Stem> {
    let name = file_stem.to_lowercase();
    STEM_RULES
        .iter()
        .find(|rule| rule.matches(&name))
        .map(|rule| rule.stem)
}

/// Result of reconciling one run's outputs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub mapping: StemMapping,
    /// Outputs that matched no rule, left in place
    pub unmatched: Vec<PathBuf>,
}

/// Moves raw separator outputs to canonical stem names
#[derive(Debug, Clone)]
pub struct StemReconciler {
    output_dir: PathBuf,
}

impl StemReconciler {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Match and move every raw output
    ///
    /// An existing `<stem>.wav` is replaced. Files already at their canonical
    /// path are left untouched.
    pub fn reconcile<P: AsRef<Path>>(&self, raw_outputs: &[P]) -> Result<Reconciliation> {
        let mut result = Reconciliation::default();

        for raw in raw_outputs {
            let source = self.absolute(raw.as_ref());
            let Some(name) = source.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                warn!("Output without a file name: {}", source.display());
                result.unmatched.push(source);
                continue;
            };

            let Some(stem) = classify(&name) else {
                warn!("Output matches no known stem: {}", source.display());
                result.unmatched.push(source);
                continue;
            };

            if !source.exists() {
                warn!("Reported output does not exist: {}", source.display());
                continue;
            }

            let target = self.output_dir.join(stem.file_name());
            if !same_file(&source, &target) {
                move_file(&source, &target)?;
                debug!("Moved {} -> {}", source.display(), target.display());
            }

            if let Some(previous) = result.mapping.insert(stem, target.clone()) {
                warn!(
                    "Multiple outputs for {}; {} replaced by {}",
                    stem,
                    previous.display(),
                    source.display()
                );
            }
            info!("  {}: {}", stem, target.display());
        }

        Ok(result)
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.output_dir.join(path)
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Rename, falling back to copy and remove across filesystems
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if to.exists() {
        fs::remove_file(to)?;
    }
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!("rename failed ({}), copying instead", e);
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}
