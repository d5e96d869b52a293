//! Canonical stem vocabulary

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One isolated component of a mix
///
/// Declaration order is the canonical order used in results and for matching
/// priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stem {
    Vocals,
    Drums,
    Bass,
    /// Catch-all, also receives `no_vocals` and `instrumental` outputs
    Other,
    Guitar,
    Piano,
}

impl Stem {
    pub const ALL: [Stem; 6] = [
        Stem::Vocals,
        Stem::Drums,
        Stem::Bass,
        Stem::Other,
        Stem::Guitar,
        Stem::Piano,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vocals => "vocals",
            Self::Drums => "drums",
            Self::Bass => "bass",
            Self::Other => "other",
            Self::Guitar => "guitar",
            Self::Piano => "piano",
        }
    }

    /// File name of the stem inside the output directory
    pub fn file_name(&self) -> String {
        format!("{}.wav", self.as_str())
    }
}

impl fmt::Display for Stem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|stem| stem.as_str() == lower)
            .ok_or_else(|| format!("unknown stem: {}", s))
    }
}

/// Canonical stem name to output file
///
/// Serializes as a JSON object in canonical stem order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StemMapping(BTreeMap<Stem, PathBuf>);

impl StemMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stem, returning the path it replaces
    pub fn insert(&mut self, stem: Stem, path: impl Into<PathBuf>) -> Option<PathBuf> {
        self.0.insert(stem, path.into())
    }

    pub fn get(&self, stem: Stem) -> Option<&Path> {
        self.0.get(&stem).map(PathBuf::as_path)
    }

    pub fn contains(&self, stem: Stem) -> bool {
        self.0.contains_key(&stem)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stem, &Path)> {
        self.0.iter().map(|(stem, path)| (*stem, path.as_path()))
    }

    pub fn stems(&self) -> impl Iterator<Item = Stem> + '_ {
        self.0.keys().copied()
    }
}
