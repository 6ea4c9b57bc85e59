//! Output formatting module

use serde_json::json;
use std::path::Path;
use stockcount_app::{AnalysisReport, ExportArtifact, ReconciliationRow};
use stockcount_types::{InventoryRecord, InventorySheet, OutputFormat, ParseOutcome, Result};

pub fn output_seal(output_format: OutputFormat, path: &Path, bytes: usize) -> Result<()> {
    if output_format == OutputFormat::Json {
        let content = json!({
            "status": "success",
            "output": path.display().to_string(),
            "bytes": bytes,
        });
        println!("{}", serde_json::to_string_pretty(&content)?);
    } else {
        println!("Seal written to: {} ({} bytes)", path.display(), bytes);
    }
    Ok(())
}

pub fn output_text(output_format: OutputFormat, text: &str) -> Result<()> {
    if output_format == OutputFormat::Json {
        let content = json!({"status": "success", "text": text});
        println!("{}", serde_json::to_string_pretty(&content)?);
    } else if text.is_empty() {
        println!("(no text recognized)");
    } else {
        println!("{}", text);
    }
    Ok(())
}

pub fn output_parse(output_format: OutputFormat, outcome: &ParseOutcome) -> Result<()> {
    if output_format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    match (&outcome.data, &outcome.message) {
        (Some(sheet), _) => print_sheet(sheet),
        (None, message) => {
            println!("\nExtraction failed");
            println!("=================");
            println!("{}", message.as_deref().unwrap_or("unknown error"));
            if let Some(ref raw) = outcome.raw_text {
                println!("\nRaw text:");
                println!("{}", raw);
            }
        }
    }
    Ok(())
}

pub fn output_report(output_format: OutputFormat, report: &AnalysisReport) -> Result<()> {
    if output_format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("\nAnalysis Result");
    println!("===============");
    if let Some(ref filename) = report.filename {
        println!("File:            {}", filename);
    }
    println!("Elapsed:         {:.2}s", report.elapsed_ms as f64 / 1000.0);

    if let Some(ref message) = report.message {
        println!("Message:         {}", message);
    }

    match report.data {
        Some(ref sheet) => print_sheet(sheet),
        None => {
            if let Some(ref raw) = report.raw_text {
                println!("\nRaw text:");
                println!("{}", raw);
            }
        }
    }
    Ok(())
}

pub fn output_export(
    output_format: OutputFormat,
    artifact: &ExportArtifact,
    path: &Path,
) -> Result<()> {
    if output_format == OutputFormat::Json {
        let content = json!({
            "status": "success",
            "output": path.display().to_string(),
            "filename": artifact.filename,
            "content_disposition": artifact.content_disposition(),
            "summary": artifact.summary,
            "rows": artifact.rows,
        });
        println!("{}", serde_json::to_string_pretty(&content)?);
        return Ok(());
    }

    println!(
        "{:<12} {:<20} {:>10} {:>10}  {}",
        "Code", "Name", "System", "Actual", "Status"
    );
    println!("{}", "-".repeat(66));
    for row in &artifact.rows {
        println!("{}", format_export_row(row));
    }
    println!("\nExported to: {}", path.display());
    println!(
        "Rows: {} (matched {}, mismatched {}, missing {}, unclassified {})",
        artifact.summary.total(),
        artifact.summary.matched,
        artifact.summary.mismatched,
        artifact.summary.missing,
        artifact.summary.unclassifiable
    );
    Ok(())
}

/// Structured error body for a failed export
pub fn output_export_error(output_format: OutputFormat, message: &str) -> Result<()> {
    if output_format == OutputFormat::Json {
        let content = json!({"status": "error", "message": message});
        println!("{}", serde_json::to_string_pretty(&content)?);
    }
    Ok(())
}

fn format_export_row(row: &ReconciliationRow) -> String {
    format!(
        "{:<12} {:<20} {:>10} {:>10}  {}",
        truncate(row.code.as_deref().unwrap_or("-"), 12),
        truncate(&row.name, 20),
        cell_or_dash(row.system_stock.as_deref()),
        cell_or_dash(row.actual_count.as_deref()),
        row.classification.label()
    )
}

fn cell_or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("-")
}

fn print_sheet(sheet: &InventorySheet) {
    let store = if sheet.store_name.is_empty() {
        "-"
    } else {
        sheet.store_name.as_str()
    };
    println!("\nStore: {}", store);
    println!(
        "{:<12} {:<20} {:<6} {:>10} {:>10}",
        "Code", "Name", "Unit", "System", "Actual"
    );
    println!("{}", "-".repeat(62));
    for record in &sheet.items {
        print_record(record);
    }
    println!("{} rows", sheet.items.len());
}

fn print_record(record: &InventoryRecord) {
    println!(
        "{:<12} {:<20} {:<6} {:>10} {:>10}",
        truncate(record_code(record), 12),
        truncate(&record.name, 20),
        record.unit.as_deref().unwrap_or("-"),
        format_quantity(record.system_stock),
        format_quantity(record.actual_count)
    );
}

/// Product code for display; rows without a usable code show `-`
fn record_code(record: &InventoryRecord) -> &str {
    match record.code.as_deref() {
        Some(code) if !record.has_default_code() => code,
        _ => "-",
    }
}

fn format_quantity(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 => format!("{}", v as i64),
        Some(v) => format!("{}", v),
        None => "-".to_string(),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", truncated)
    }
}
