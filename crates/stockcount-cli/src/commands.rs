//! Command handlers

use crate::cli::{Cli, Commands};
use crate::output::{
    output_export, output_export_error, output_parse, output_report, output_seal, output_text,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use stockcount_app::app::{build_extractor, build_recognizer};
use stockcount_app::config::Config;
use stockcount_app::export::{
    build_reconciliation_table, export_request, ExportSheet, EMPTY_EXPORT_MESSAGE,
};
use stockcount_app::DocumentAnalyzer;
use stockcount_types::{DevicePreference, Error, OutputFormat, Result};
use stockcount_vision::extract_seal;
use tracing::{info, warn};

pub fn execute(cli: Cli) -> Result<()> {
    // Config edits work on the file alone, never on env overrides
    if let Commands::Config {
        show,
        set_base_url,
        set_model,
        set_api_key,
        set_ocr_url,
        set_device,
        set_output,
        reset,
    } = &cli.command
    {
        return cmd_config(
            *show,
            set_base_url.clone(),
            set_model.clone(),
            set_api_key.clone(),
            set_ocr_url.clone(),
            *set_device,
            *set_output,
            *reset,
        );
    }

    // Load config, then override from CLI args
    let mut config = Config::load_with_env()?;
    if let Some(ref model) = cli.model {
        config.model = model.clone();
    }
    if let Some(ref ocr_url) = cli.ocr_url {
        config.ocr_url = ocr_url.clone();
    }
    if let Some(device) = cli.device {
        config.device = device;
    }
    let output_format = cli.format.unwrap_or(config.output_format);

    match &cli.command {
        Commands::Seal { image, output } => cmd_seal(image, output.clone(), output_format),
        Commands::Text { image } => cmd_text(&config, image, output_format),
        Commands::Parse { text } => cmd_parse(&config, text, output_format),
        Commands::Analyze { image, xlsx } => {
            cmd_analyze(&config, image, xlsx.clone(), output_format)
        }
        Commands::Export { results, output } => cmd_export(results, output.clone(), output_format),
        Commands::Config { .. } => Ok(()),
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Image not found: {}", path.display()),
        )));
    }
    Ok(std::fs::read(path)?)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

fn cmd_seal(image: &Path, output: Option<PathBuf>, output_format: OutputFormat) -> Result<()> {
    let bytes = read_image(image)?;
    let png = extract_seal(&bytes)?;

    let output_path = output.unwrap_or_else(|| {
        let stem = image
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("seal");
        image.with_file_name(format!("{}_seal.png", stem))
    });
    std::fs::write(&output_path, &png)?;

    output_seal(output_format, &output_path, png.len())
}

fn cmd_text(config: &Config, image: &Path, output_format: OutputFormat) -> Result<()> {
    let bytes = read_image(image)?;
    let recognizer = build_recognizer(config)?;

    let pb = spinner("Recognizing text...");
    let result = recognizer.extract_text(&bytes);
    pb.finish_and_clear();

    info!(mode = %recognizer.current_mode(), "recognition finished");
    output_text(output_format, &result?)
}

fn cmd_parse(config: &Config, text_path: &Path, output_format: OutputFormat) -> Result<()> {
    let raw_text = std::fs::read_to_string(text_path)?;
    let extractor = build_extractor(config)?;

    let pb = spinner("Structuring text...");
    let outcome = extractor.parse_content(&raw_text);
    pb.finish_and_clear();

    output_parse(output_format, &outcome)
}

fn cmd_analyze(
    config: &Config,
    image: &Path,
    xlsx: Option<PathBuf>,
    output_format: OutputFormat,
) -> Result<()> {
    let bytes = read_image(image)?;
    let analyzer = DocumentAnalyzer::from_config(config)?;

    let pb = spinner("Analyzing count sheet...");
    let result = analyzer.analyze_document(&bytes, &file_label(image));
    pb.finish_and_clear();
    let report = result?;

    output_report(output_format, &report)?;

    let Some(xlsx_path) = xlsx else {
        return Ok(());
    };
    match report.data {
        Some(ref sheet) => {
            let artifact = build_reconciliation_table(&ExportSheet::from(sheet))?;
            std::fs::write(&xlsx_path, &artifact.bytes)?;
            if output_format == OutputFormat::Table {
                println!("\nExported to: {}", xlsx_path.display());
            }
            info!(path = %xlsx_path.display(), rows = artifact.rows.len(), "workbook written");
        }
        None => warn!("no structured rows; workbook not written"),
    }
    Ok(())
}

fn cmd_export(
    results_path: &Path,
    output: Option<PathBuf>,
    output_format: OutputFormat,
) -> Result<()> {
    // Load results
    let content = std::fs::read_to_string(results_path)?;
    let body: serde_json::Value = serde_json::from_str(&content)?;

    let artifact = match export_request(&body) {
        Ok(artifact) => artifact,
        Err(Error::EmptyInput) => {
            output_export_error(output_format, EMPTY_EXPORT_MESSAGE)?;
            return Err(Error::EmptyInput);
        }
        Err(e) => return Err(e),
    };

    // Determine output path
    let output_path = output.unwrap_or_else(|| results_path.with_file_name(&artifact.filename));
    std::fs::write(&output_path, &artifact.bytes)?;

    output_export(output_format, &artifact, &output_path)
}

#[allow(clippy::too_many_arguments)]
fn cmd_config(
    show: bool,
    set_base_url: Option<String>,
    set_model: Option<String>,
    set_api_key: Option<String>,
    set_ocr_url: Option<String>,
    set_device: Option<DevicePreference>,
    set_output: Option<OutputFormat>,
    reset: bool,
) -> Result<()> {
    if reset {
        let config = Config::default();
        config.save()?;
        println!("Configuration reset to defaults");
        println!("\n{}", config);
        return Ok(());
    }

    let mut config = Config::load()?;
    let mut modified = false;

    if let Some(base_url) = set_base_url {
        config.base_url = base_url;
        modified = true;
    }

    if let Some(model) = set_model {
        config.model = model;
        modified = true;
    }

    if let Some(api_key) = set_api_key {
        config.api_key = Some(api_key).filter(|key| !key.trim().is_empty());
        modified = true;
    }

    if let Some(ocr_url) = set_ocr_url {
        config.ocr_url = ocr_url;
        modified = true;
    }

    if let Some(device) = set_device {
        config.device = device;
        modified = true;
    }

    if let Some(output_format) = set_output {
        config.output_format = output_format;
        modified = true;
    }

    if modified {
        config.save()?;
        println!("Configuration updated");
    }

    if show || !modified {
        println!("{}", config);
    }

    Ok(())
}
