//! Structured extraction: raw OCR text → canonical inventory rows
//!
//! The model does the heavy lifting, guided by the prompt. Its reply is then
//! salvaged (fences and surrounding prose removed), parsed leniently and
//! normalized with the same disambiguation rules the prompt states, so a
//! model that echoes raw cell text still yields canonical rows.

use serde_json::{Map, Value};
use stockcount_domain::service::{
    interpret_count, parse_quantity, split_unit_and_stock, CountValue,
};
use stockcount_types::{Error, InventoryRecord, InventorySheet, ParseOutcome, Result};
use tracing::{debug, info, warn};

use super::completion::{
    CompletionRequest, CompletionService, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
use super::prompts::{build_extraction_prompt, SYSTEM_PROMPT};

/// Turns OCR text into an `InventorySheet` via a completion service
pub struct StructuredExtractor {
    service: Box<dyn CompletionService>,
    temperature: f32,
    max_tokens: u32,
}

impl StructuredExtractor {
    pub fn new(service: Box<dyn CompletionService>) -> Self {
        Self {
            service,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Extract rows from `raw_text`.
    ///
    /// Never fails: service and parsing errors come back as an error outcome
    /// carrying the message and the original text.
    pub fn parse_content(&self, raw_text: &str) -> ParseOutcome {
        match self.try_parse(raw_text) {
            Ok(sheet) => ParseOutcome::success(sheet),
            Err(e) => {
                warn!(error = %e, "structured extraction failed");
                ParseOutcome::error(e.to_string(), raw_text)
            }
        }
    }

    fn try_parse(&self, raw_text: &str) -> Result<InventorySheet> {
        let request = CompletionRequest::new(SYSTEM_PROMPT, build_extraction_prompt(raw_text))
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let response = self.service.complete(&request)?;
        debug!(chars = response.chars().count(), "model response received");

        parse_model_output(&response)
    }
}

/// Strip code fences and keep the span from the first `{` to the last `}`.
///
/// A deliberately small leniency layer: braces in prose outside the payload
/// will widen the span and the parse will fail rather than be guessed at.
pub fn extract_json_from_response(response: &str) -> String {
    let content = response.replace("```json", "").replace("```", "");

    if let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) {
        if start < end {
            return content[start..=end].trim().to_string();
        }
    }

    content.trim().to_string()
}

/// Parse a model reply into a normalized sheet.
pub fn parse_model_output(response: &str) -> Result<InventorySheet> {
    let json_str = extract_json_from_response(response);
    let root: Value = serde_json::from_str(&json_str)
        .map_err(|e| Error::malformed(format!("invalid JSON: {}", e), response))?;

    if root.get("status").and_then(Value::as_str) == Some("error") {
        let message = root
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("model reported an error");
        return Err(Error::malformed(format!("model reported error: {}", message), response));
    }

    // Accept both the documented envelope and a bare sheet object
    let data = root.get("data").unwrap_or(&root);
    let (store_name, items) = match data {
        Value::Object(sheet) => {
            let items = sheet
                .get("items")
                .and_then(Value::as_array)
                .ok_or_else(|| Error::malformed("missing `items` array", response))?;
            (text_field(sheet, "store_name").unwrap_or_default(), items)
        }
        Value::Array(items) => (String::new(), items),
        _ => return Err(Error::malformed("`data` is not an object", response)),
    };

    let records: Vec<InventoryRecord> = items
        .iter()
        .filter_map(|item| item.as_object())
        .filter_map(|item| normalize_item(item, &store_name))
        .collect();

    let dropped = items.len() - records.len();
    if dropped > 0 {
        debug!(dropped, "rows without a product name discarded");
    }
    info!(store = %store_name, rows = records.len(), "sheet extracted");

    Ok(InventorySheet {
        store_name,
        items: records,
    })
}

/// Build a canonical record; `None` only when the row has no name.
fn normalize_item(item: &Map<String, Value>, store_name: &str) -> Option<InventoryRecord> {
    let name = text_field(item, "name")?;

    let mut unit = text_field(item, "unit");
    let raw_stock = item.get("system_stock").unwrap_or(&Value::Null);
    let system_stock = match (raw_stock, &unit) {
        (Value::String(s), None) => match split_unit_and_stock(s) {
            Some((split_unit, stock)) => {
                unit = Some(split_unit);
                Some(stock)
            }
            None => parse_quantity(raw_stock),
        },
        _ => parse_quantity(raw_stock),
    };

    let actual_count = match interpret_count(item.get("actual_count").unwrap_or(&Value::Null)) {
        CountValue::Number(n) => Some(n),
        CountValue::SameAsSystem => system_stock,
        CountValue::NotCounted => None,
        CountValue::Unreadable(text) => {
            warn!(name = %name, cell = %text, "unreadable count cell left empty");
            None
        }
    };

    Some(InventoryRecord {
        store_name: store_name.to_string(),
        code: text_field(item, "code"),
        batch_number: text_field(item, "batch_number"),
        name,
        spec: text_field(item, "spec"),
        unit,
        system_stock,
        actual_count,
    })
}

/// Non-empty trimmed text for string or numeric JSON values
fn text_field(item: &Map<String, Value>, key: &str) -> Option<String> {
    match item.get(key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
