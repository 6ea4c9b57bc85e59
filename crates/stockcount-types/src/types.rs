//! Shared data model for count-sheet processing

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Code value the model emits when a row has no product code
pub const DEFAULT_CODE: &str = "DEFAULT";

/// One canonical row of an inventory count sheet.
///
/// `name` is the natural key: a record without a name is invalid and is
/// never produced. A missing or `DEFAULT` code does not invalidate a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    /// Store the page belongs to (shared by every record of one page)
    #[serde(default)]
    pub store_name: String,

    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub batch_number: Option<String>,

    pub name: String,

    #[serde(default)]
    pub spec: Option<String>,

    #[serde(default)]
    pub unit: Option<String>,

    /// Book stock (usually printed)
    #[serde(default)]
    pub system_stock: Option<f64>,

    /// Physically counted stock (usually handwritten)
    #[serde(default)]
    pub actual_count: Option<f64>,
}

impl InventoryRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            store_name: String::new(),
            code: None,
            batch_number: None,
            name: name.into(),
            spec: None,
            unit: None,
            system_stock: None,
            actual_count: None,
        }
    }

    /// True when the row carries no usable product code
    pub fn has_default_code(&self) -> bool {
        match self.code.as_deref() {
            None => true,
            Some(code) => code.trim().is_empty() || code.eq_ignore_ascii_case(DEFAULT_CODE),
        }
    }
}

/// All records extracted from one page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventorySheet {
    #[serde(default)]
    pub store_name: String,

    #[serde(default)]
    pub items: Vec<InventoryRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseStatus {
    Success,
    Error,
}

/// Result of structured extraction.
///
/// Extraction failures are reported here rather than as `Err`, so callers
/// can fall back to showing `raw_text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseOutcome {
    pub status: ParseStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<InventorySheet>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// OCR text the extraction was attempted on (error outcomes only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

impl ParseOutcome {
    pub fn success(data: InventorySheet) -> Self {
        Self {
            status: ParseStatus::Success,
            data: Some(data),
            message: None,
            raw_text: None,
        }
    }

    pub fn error(message: impl Into<String>, raw_text: &str) -> Self {
        Self {
            status: ParseStatus::Error,
            data: None,
            message: Some(message.into()),
            raw_text: Some(raw_text.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ParseStatus::Success
    }
}

/// Outcome of comparing system stock against the physical count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// No physical count recorded
    Missing,
    Matched,
    Mismatched,
    /// One side could not be read as a number
    Unclassifiable,
}

impl Classification {
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Missing => "待核查",
            Classification::Matched => "账实相符",
            Classification::Mismatched => "差异",
            Classification::Unclassifiable => "-",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classification::Missing => write!(f, "missing"),
            Classification::Matched => write!(f, "matched"),
            Classification::Mismatched => write!(f, "mismatched"),
            Classification::Unclassifiable => write!(f, "unclassifiable"),
        }
    }
}

/// Execution mode of the OCR backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareMode {
    Gpu,
    Cpu,
}

impl std::fmt::Display for HardwareMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HardwareMode::Gpu => write!(f, "GPU"),
            HardwareMode::Cpu => write!(f, "CPU"),
        }
    }
}

/// Requested OCR device; `Auto` probes the backend for an accelerator
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    #[default]
    Auto,
    Gpu,
    Cpu,
}

impl std::fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DevicePreference::Auto => write!(f, "auto"),
            DevicePreference::Gpu => write!(f, "gpu"),
            DevicePreference::Cpu => write!(f, "cpu"),
        }
    }
}

impl std::str::FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(DevicePreference::Auto),
            "gpu" | "cuda" => Ok(DevicePreference::Gpu),
            "cpu" => Ok(DevicePreference::Cpu),
            other => Err(format!("unknown device '{}' (expected auto, gpu or cpu)", other)),
        }
    }
}

/// One recognized text line, in reading order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrLine {
    pub text: String,

    #[serde(default)]
    pub confidence: Option<f32>,

    /// Corner points of the line's bounding quadrilateral
    #[serde(default)]
    pub bbox: Option<Vec<[f32; 2]>>,
}

impl OcrLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
            bbox: None,
        }
    }
}
