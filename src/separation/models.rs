//! Supported separation models
//!
//! A closed set: each entry knows the file name the separation library loads
//! and which stems it is expected to produce.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::stems::Stem;

const FOUR_STEMS: &[Stem] = &[Stem::Vocals, Stem::Drums, Stem::Bass, Stem::Other];
const SIX_STEMS: &[Stem] = &[
    Stem::Vocals,
    Stem::Drums,
    Stem::Bass,
    Stem::Other,
    Stem::Guitar,
    Stem::Piano,
];
const VOCAL_SPLIT: &[Stem] = &[Stem::Vocals, Stem::Other];

/// Separation model selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
pub enum SeparationModel {
    /// Hybrid Transformer Demucs
    #[default]
    #[value(name = "htdemucs")]
    Htdemucs,
    /// Fine-tuned Hybrid Transformer Demucs
    #[value(name = "htdemucs_ft")]
    HtdemucsFt,
    /// Six-stem Hybrid Transformer Demucs
    #[value(name = "htdemucs_6s")]
    Htdemucs6s,
    /// Hybrid Demucs MMI
    #[value(name = "hdemucs_mmi")]
    HdemucsMmi,
    /// MDX-Net vocal model
    #[value(name = "UVR-MDX-NET-Voc_FT")]
    MdxNetVocFt,
    /// Kim vocal model
    #[value(name = "Kim_Vocal_2")]
    KimVocal2,
}

impl SeparationModel {
    pub const ALL: [SeparationModel; 6] = [
        SeparationModel::Htdemucs,
        SeparationModel::HtdemucsFt,
        SeparationModel::Htdemucs6s,
        SeparationModel::HdemucsMmi,
        SeparationModel::MdxNetVocFt,
        SeparationModel::KimVocal2,
    ];

    /// Short name used on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Self::Htdemucs => "htdemucs",
            Self::HtdemucsFt => "htdemucs_ft",
            Self::Htdemucs6s => "htdemucs_6s",
            Self::HdemucsMmi => "hdemucs_mmi",
            Self::MdxNetVocFt => "UVR-MDX-NET-Voc_FT",
            Self::KimVocal2 => "Kim_Vocal_2",
        }
    }

    /// Model file name understood by audio-separator
    ///
    /// Demucs v4 models are addressed by their `.yaml` config.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Htdemucs => "htdemucs.yaml",
            Self::HtdemucsFt => "htdemucs_ft.yaml",
            Self::Htdemucs6s => "htdemucs_6s.yaml",
            Self::HdemucsMmi => "hdemucs_mmi.yaml",
            Self::MdxNetVocFt => "UVR-MDX-NET-Voc_FT.onnx",
            Self::KimVocal2 => "Kim_Vocal_2.onnx",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Htdemucs => "Hybrid Transformer Demucs (default, fast)",
            Self::HtdemucsFt => "Fine-tuned Demucs (better quality, slower)",
            Self::Htdemucs6s => "6-stem model (adds guitar, piano)",
            Self::HdemucsMmi => "Hybrid Demucs v3 MMI",
            Self::MdxNetVocFt => "Best vocal isolation",
            Self::KimVocal2 => "Alternative vocal model",
        }
    }

    /// Stems this model is expected to produce
    pub fn expected_stems(&self) -> &'static [Stem] {
        match self {
            Self::Htdemucs6s => SIX_STEMS,
            Self::MdxNetVocFt | Self::KimVocal2 => VOCAL_SPLIT,
            _ => FOUR_STEMS,
        }
    }
}

impl fmt::Display for SeparationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
