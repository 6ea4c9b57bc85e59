//! Excel export of reconciled count sheets
//!
//! Rows come in dict-shaped, exactly as the analyze step returned them, so
//! a sheet only gets the columns its rows actually carry. Each row is
//! classified by comparing book stock with the physical count and styled
//! accordingly.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rust_xlsxwriter::{Color, Format, FormatPattern, Workbook, Worksheet};
use serde::Serialize;
use serde_json::{Map, Value};
use stockcount_domain::service::{classify_counts, ReconciliationSummary};
use stockcount_types::{Classification, Error, InventorySheet, Result};
use tracing::info;

/// Store name used when the request carries none
pub const DEFAULT_STORE_NAME: &str = "库存盘点单";

/// Message reported when there is nothing to export
pub const EMPTY_EXPORT_MESSAGE: &str = "没有数据可导出";

pub const SHEET_NAME: &str = "盘点数据";

/// Record field → header, in output order
pub const COLUMNS: [(&str, &str); 7] = [
    ("code", "商品编码"),
    ("batch_number", "批次"),
    ("name", "商品名称"),
    ("spec", "规格"),
    ("unit", "单位"),
    ("system_stock", "系统库存"),
    ("actual_count", "实盘数量"),
];

const SYSTEM_STOCK_FIELD: &str = "system_stock";
const ACTUAL_COUNT_FIELD: &str = "actual_count";

/// Optional text columns dropped from typed sheets when no row has a value
const SPARSE_FIELDS: [&str; 4] = ["code", "batch_number", "spec", "unit"];

const MISSING_FILL: u32 = 0xFFF2CC;
const MISSING_FONT: u32 = 0xFF9900;
const MISMATCH_FONT: u32 = 0xFF0000;
const MATCH_FONT: u32 = 0x008000;

/// RFC 5987 attr-char: alphanumerics plus `-._~` stay literal
const FILENAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Records to export, in the shape the analyze step produced them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportSheet {
    pub store_name: String,
    pub items: Vec<Map<String, Value>>,
}

impl ExportSheet {
    /// Accept an analyze response body.
    ///
    /// `{"data": {"store_name", "items"}}`, `{"data": [...]}` and a bare
    /// `{"store_name", "items"}` object are all understood. Non-object items
    /// are ignored.
    pub fn from_request(body: &Value) -> Self {
        let data = body.get("data").unwrap_or(body);

        let (store_name, items) = match data {
            Value::Array(items) => (None, items.as_slice()),
            Value::Object(sheet) => (
                sheet.get("store_name").and_then(Value::as_str),
                sheet
                    .get("items")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or_default(),
            ),
            _ => (None, &[][..]),
        };

        Self {
            store_name: store_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(DEFAULT_STORE_NAME)
                .to_string(),
            items: items
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .collect(),
        }
    }

    /// Export file name
    pub fn filename(&self) -> String {
        format!("{}_导出.xlsx", self.store_name)
    }

    /// Fields from `COLUMNS` carried by at least one row
    fn present_columns(&self) -> Vec<(&'static str, &'static str)> {
        COLUMNS
            .iter()
            .copied()
            .filter(|(field, _)| self.items.iter().any(|item| item.contains_key(*field)))
            .collect()
    }
}

impl From<&InventorySheet> for ExportSheet {
    fn from(sheet: &InventorySheet) -> Self {
        let mut items: Vec<Map<String, Value>> = sheet
            .items
            .iter()
            .filter_map(|record| match serde_json::to_value(record) {
                Ok(Value::Object(map)) => Some(map),
                _ => None,
            })
            .collect();

        for field in SPARSE_FIELDS {
            let unused = items
                .iter()
                .all(|item| item.get(field).map_or(true, Value::is_null));
            if unused {
                for item in &mut items {
                    item.remove(field);
                }
            }
        }

        let store_name = if sheet.store_name.trim().is_empty() {
            DEFAULT_STORE_NAME.to_string()
        } else {
            sheet.store_name.clone()
        };

        Self { store_name, items }
    }
}

/// One exported row, in cell-text form, and how it was classified
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationRow {
    pub store_name: String,
    pub code: Option<String>,
    pub batch_number: Option<String>,
    pub name: String,
    pub spec: Option<String>,
    pub unit: Option<String>,
    pub system_stock: Option<String>,
    pub actual_count: Option<String>,
    pub classification: Classification,
}

/// Finished workbook plus what went into it
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub headers: Vec<&'static str>,
    pub rows: Vec<ReconciliationRow>,
    pub summary: ReconciliationSummary,
}

impl ExportArtifact {
    /// `Content-Disposition` value for serving the workbook as a download
    pub fn content_disposition(&self) -> String {
        content_disposition(&self.filename)
    }
}

pub fn content_disposition(filename: &str) -> String {
    format!(
        "attachment; filename*=utf-8''{}",
        utf8_percent_encode(filename, FILENAME_ENCODE_SET)
    )
}

/// Build the reconciliation workbook for `sheet`.
///
/// Fails with `EmptyInput` when there are no rows.
pub fn build_reconciliation_table(sheet: &ExportSheet) -> Result<ExportArtifact> {
    if sheet.items.is_empty() {
        return Err(Error::EmptyInput);
    }

    let columns = sheet.present_columns();
    let has_actual_column = columns.iter().any(|(field, _)| *field == ACTUAL_COUNT_FIELD);

    let rows: Vec<ReconciliationRow> = sheet
        .items
        .iter()
        .map(|item| classify_item(item, &sheet.store_name, has_actual_column))
        .collect();
    let summary = ReconciliationSummary::tally(rows.iter().map(|row| row.classification));

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    write_table(worksheet, &columns, &sheet.items, &rows)?;

    let bytes = workbook
        .save_to_buffer()
        .map_err(|e| Error::Excel(e.to_string()))?;

    info!(
        store = %sheet.store_name,
        rows = rows.len(),
        missing = summary.missing,
        matched = summary.matched,
        mismatched = summary.mismatched,
        unclassifiable = summary.unclassifiable,
        "reconciliation table built"
    );

    Ok(ExportArtifact {
        bytes,
        filename: sheet.filename(),
        headers: columns.iter().map(|(_, header)| *header).collect(),
        rows,
        summary,
    })
}

/// Parse an analyze response body and build its workbook.
pub fn export_request(body: &Value) -> Result<ExportArtifact> {
    build_reconciliation_table(&ExportSheet::from_request(body))
}

fn classify_item(
    item: &Map<String, Value>,
    store_name: &str,
    has_actual_column: bool,
) -> ReconciliationRow {
    let field = |key: &str| item.get(key).and_then(cell_text);
    let system_stock = field(SYSTEM_STOCK_FIELD);
    let actual_count = field(ACTUAL_COUNT_FIELD);

    // Without a count column there is nothing to reconcile against
    let classification = if has_actual_column {
        classify_counts(system_stock.as_deref(), actual_count.as_deref())
    } else {
        Classification::Unclassifiable
    };

    ReconciliationRow {
        store_name: store_name.to_string(),
        code: field("code"),
        batch_number: field("batch_number"),
        name: field("name").unwrap_or_default(),
        spec: field("spec"),
        unit: field("unit"),
        system_stock,
        actual_count,
        classification,
    }
}

/// Textual form of a cell; `None` for null
fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn column_width(header: &str) -> f64 {
    if header.contains("名称") {
        30.0
    } else if header.contains("编码") {
        20.0
    } else if header.contains("单位") {
        8.0
    } else {
        15.0
    }
}

/// Cell formats used by the sheet
struct Styles {
    header: Format,
    plain: Format,
    missing_row: Format,
    missing_count: Format,
    mismatched: Format,
    matched: Format,
}

impl Styles {
    fn new() -> Self {
        let missing_row = Format::new()
            .set_background_color(Color::RGB(MISSING_FILL))
            .set_pattern(FormatPattern::Solid);
        Self {
            header: Format::new().set_bold(),
            plain: Format::new(),
            missing_count: missing_row
                .clone()
                .set_italic()
                .set_font_color(Color::RGB(MISSING_FONT)),
            missing_row,
            mismatched: Format::new()
                .set_bold()
                .set_font_color(Color::RGB(MISMATCH_FONT)),
            matched: Format::new()
                .set_bold()
                .set_font_color(Color::RGB(MATCH_FONT)),
        }
    }
}

fn write_table(
    sheet: &mut Worksheet,
    columns: &[(&'static str, &'static str)],
    items: &[Map<String, Value>],
    rows: &[ReconciliationRow],
) -> Result<()> {
    sheet
        .set_name(SHEET_NAME)
        .map_err(|e| Error::Excel(e.to_string()))?;

    let styles = Styles::new();

    for (col, (_, header)) in columns.iter().enumerate() {
        let col = col as u16;
        sheet
            .write_string_with_format(0, col, *header, &styles.header)
            .map_err(|e| Error::Excel(e.to_string()))?;
        sheet
            .set_column_width(col, column_width(header))
            .map_err(|e| Error::Excel(e.to_string()))?;
    }

    for (row_idx, (item, row)) in items.iter().zip(rows).enumerate() {
        let excel_row = (row_idx + 1) as u32;

        for (col, (field, _)) in columns.iter().enumerate() {
            let col = col as u16;
            let is_count = *field == ACTUAL_COUNT_FIELD;

            let format = match (row.classification, is_count) {
                (Classification::Missing, true) => {
                    sheet
                        .write_string_with_format(
                            excel_row,
                            col,
                            Classification::Missing.label(),
                            &styles.missing_count,
                        )
                        .map_err(|e| Error::Excel(e.to_string()))?;
                    continue;
                }
                (Classification::Missing, false) => &styles.missing_row,
                (Classification::Mismatched, true) => &styles.mismatched,
                (Classification::Matched, true) => &styles.matched,
                _ => &styles.plain,
            };

            write_cell(sheet, excel_row, col, item.get(*field), format)?;
        }
    }

    Ok(())
}

fn write_cell(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: Option<&Value>,
    format: &Format,
) -> Result<()> {
    let result = match value {
        None | Some(Value::Null) => sheet.write_blank(row, col, format),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(number) => sheet.write_number_with_format(row, col, number, format),
            None => sheet.write_string_with_format(row, col, n.to_string(), format),
        },
        Some(Value::String(s)) => sheet.write_string_with_format(row, col, s, format),
        Some(other) => sheet.write_string_with_format(row, col, other.to_string(), format),
    };
    result.map_err(|e| Error::Excel(e.to_string()))?;
    Ok(())
}
