//! CLI definition using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stockcount_types::{DevicePreference, OutputFormat};

#[derive(Parser)]
#[command(name = "stockcount")]
#[command(version)]
#[command(about = "Digitize handwritten count sheets and reconcile them against book stock")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Completion model override
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// OCR service URL override
    #[arg(long, global = true)]
    pub ocr_url: Option<String>,

    /// OCR device (auto, gpu, cpu). Uses config value if not specified.
    #[arg(long, global = true)]
    pub device: Option<DevicePreference>,

    /// Output format (json, table). Uses config value if not specified.
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cut the red seal out of a document photo as a transparent PNG
    Seal {
        /// Path to image file
        image: PathBuf,

        /// Output PNG path (default: <image>_seal.png)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Recognize the text on a page photo
    Text {
        /// Path to image file
        image: PathBuf,
    },

    /// Structure already recognized text into inventory rows
    Parse {
        /// Path to a text file with OCR output
        text: PathBuf,
    },

    /// Recognize and structure a count-sheet photo
    Analyze {
        /// Path to image file
        image: PathBuf,

        /// Also write the reconciliation workbook to this path
        #[arg(long, short = 'x')]
        xlsx: Option<PathBuf>,
    },

    /// Export analyze results to a reconciliation workbook
    Export {
        /// Path to JSON produced by `analyze --format json`
        results: PathBuf,

        /// Output Excel file path (default: <store>_导出.xlsx next to the results)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Set completion service base URL
        #[arg(long)]
        set_base_url: Option<String>,

        /// Set completion model
        #[arg(long)]
        set_model: Option<String>,

        /// Set completion service API key
        #[arg(long)]
        set_api_key: Option<String>,

        /// Set OCR service URL
        #[arg(long)]
        set_ocr_url: Option<String>,

        /// Set OCR device (auto, gpu, cpu)
        #[arg(long)]
        set_device: Option<DevicePreference>,

        /// Set default output format
        #[arg(long)]
        set_output: Option<OutputFormat>,

        /// Reset to defaults
        #[arg(long)]
        reset: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "stockcount", "analyze", "page.jpg", "--device", "cpu", "-f", "json", "-x", "out.xlsx",
        ])
        .unwrap();

        assert_eq!(cli.device, Some(DevicePreference::Cpu));
        assert_eq!(cli.format, Some(OutputFormat::Json));
        match cli.command {
            Commands::Analyze { image, xlsx } => {
                assert_eq!(image, PathBuf::from("page.jpg"));
                assert_eq!(xlsx, Some(PathBuf::from("out.xlsx")));
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_config_setters() {
        let cli = Cli::try_parse_from([
            "stockcount", "config", "--set-device", "gpu", "--set-output", "json",
        ])
        .unwrap();

        match cli.command {
            Commands::Config {
                set_device,
                set_output,
                reset,
                ..
            } => {
                assert_eq!(set_device, Some(DevicePreference::Gpu));
                assert_eq!(set_output, Some(OutputFormat::Json));
                assert!(!reset);
            }
            _ => panic!("expected config"),
        }
    }
}
