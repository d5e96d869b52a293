//! CLI Module
//!
//! Command-line interface for the Stemperator separation launcher.

pub mod commands;

use std::path::{Path, PathBuf};

use clap::Parser;
use log::warn;

use crate::separation::SeparationModel;

/// Stemperator - AI stem separation with live progress
#[derive(Parser, Debug)]
#[command(name = "stemperator-cli")]
#[command(version, about, long_about = None)]
#[command(allow_negative_numbers = true)]
pub struct Cli {
    /// Input audio file
    pub input: Option<PathBuf>,

    /// Output directory for stems
    pub output_dir: Option<PathBuf>,

    /// Separation model
    #[arg(long, value_enum, default_value_t = SeparationModel::Htdemucs)]
    pub model: SeparationModel,

    /// Device: auto, cpu, cuda:0, cuda:1, directml:0, mps
    #[arg(long, default_value = "auto")]
    pub device: String,

    /// Deprecated: use --device. GPU index, or -1 for CPU
    #[arg(long, hide = true)]
    pub gpu_id: Option<i64>,

    /// Only check the installation, don't process
    #[arg(long)]
    pub check: bool,

    /// List available models
    #[arg(long)]
    pub list_models: bool,

    /// List available compute devices
    #[arg(long)]
    pub list_devices: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Device token after applying the deprecated `--gpu-id`
    pub fn effective_device(&self) -> String {
        match self.gpu_id {
            Some(id) => {
                warn!("--gpu-id is deprecated, use --device instead");
                if id < 0 {
                    "cpu".to_string()
                } else {
                    format!("cuda:{}", id)
                }
            }
            None => self.device.clone(),
        }
    }

    /// Input and output directory, when both were given
    pub fn positionals(&self) -> Option<(&Path, &Path)> {
        match (&self.input, &self.output_dir) {
            (Some(input), Some(output)) => Some((input.as_path(), output.as_path())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["stemperator-cli", "in.wav", "out"]).unwrap();
        assert_eq!(cli.model, SeparationModel::Htdemucs);
        assert_eq!(cli.effective_device(), "auto");
        assert!(cli.positionals().is_some());
    }

    #[test]
    fn test_gpu_id_maps_to_device() {
        let cli = Cli::try_parse_from(["stemperator-cli", "--gpu-id", "1"]).unwrap();
        assert_eq!(cli.effective_device(), "cuda:1");

        let cli = Cli::try_parse_from(["stemperator-cli", "--gpu-id", "-1"]).unwrap();
        assert_eq!(cli.effective_device(), "cpu");
    }

    #[test]
    fn test_gpu_id_overrides_device() {
        let cli =
            Cli::try_parse_from(["stemperator-cli", "--device", "mps", "--gpu-id", "0"]).unwrap();
        assert_eq!(cli.effective_device(), "cuda:0");
    }

    #[test]
    fn test_model_names() {
        let cli = Cli::try_parse_from(["stemperator-cli", "--model", "UVR-MDX-NET-Voc_FT"]).unwrap();
        assert_eq!(cli.model, SeparationModel::MdxNetVocFt);
        assert!(Cli::try_parse_from(["stemperator-cli", "--model", "spleeter"]).is_err());
    }

    #[test]
    fn test_missing_output_dir() {
        let cli = Cli::try_parse_from(["stemperator-cli", "in.wav"]).unwrap();
        assert!(cli.positionals().is_none());
    }
}
