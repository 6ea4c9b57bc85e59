//! AI prompts for count-sheet structuring
//!
//! Sheets come from different stores (仁厚店, 三合店, 西安店 ...) with
//! different column sets, so the prompt describes every field the model may
//! find and lets it decide which ones the page actually has.
//!
//! Language convention:
//! - English for AI instructions (extract, output, keep, etc.)
//! - Chinese for domain terms and literal sheet content (系统库存, 实盘,
//!   未盘, 盒, 袋)

/// Placeholder replaced with the OCR text
const RAW_TEXT_PLACEHOLDER: &str = "{raw_text}";

/// System message: row retention outranks everything else.
pub const SYSTEM_PROMPT: &str = "You are a meticulous data-entry clerk for inventory count sheets (库存盘点单). \
If a row's code is 'DEFAULT' or empty, you must still keep the row.";

const EXTRACTION_TEMPLATE: &str = r#"# Role
You clean OCR output of inventory count sheets (库存盘点单). Layouts differ between stores; columns may be missing, merged or shifted.

# Critical rules
1. NEVER DROP A ROW. If a line has a product name (商品名称), it must appear in the output, even when its code is missing or reads "DEFAULT".
2. Decide from the text itself which columns this page has. Only output fields that exist on the page.

# Fields
- `store_name`: store name, usually near the top (e.g. "三合店").
- `code`: product code (商品编码). If the page shows "DEFAULT" or no code, output "DEFAULT" or null. A missing code is never a reason to drop the row.
- `batch_number`: batch or date (批次, e.g. 20250902). Only when present.
- `name`: product name (商品名称). REQUIRED, this is the row key.
- `spec`: specification (规格, e.g. 120g/袋, 5斤/箱).
- `unit`: unit, usually a single measure word (单位: 盒, 袋, 瓶, 提). Extract it when the page has a unit column.
- `system_stock`: book stock (系统库存/账存), usually printed digits.
- `actual_count`: counted stock (实盘数量), usually handwritten in the right-most column.

# Special cases
1. Reading `actual_count`:
   - A number: output it as is (5, 10.5).
   - An arithmetic expression: output the result ("18+6" -> 24).
   - A checkmark "✔", "v" or "√": the count matches the books; copy `system_stock` into `actual_count`.
   - "未盘", "/" or "-": output null. Do not drop the row and do not output 0.
2. Merged columns: OCR may glue the unit and the book stock together (e.g. "盒 6"). Split them: the leading non-numeric token is `unit` ("盒"), the trailing number is `system_stock` (6).

# Output format
Output valid JSON only, with no commentary:
{
  "status": "success",
  "data": {
    "store_name": "<store>",
    "items": [
      {
        "code": "<code or DEFAULT>",
        "name": "<product name>",
        "batch_number": "<optional>",
        "spec": "<optional>",
        "unit": "<optional>",
        "system_stock": <number or null>,
        "actual_count": <number or null>
      }
    ]
  }
}

# Input text
{raw_text}
"#;

/// Build the user prompt for one page of OCR text.
pub fn build_extraction_prompt(raw_text: &str) -> String {
    EXTRACTION_TEMPLATE.replace(RAW_TEXT_PLACEHOLDER, raw_text)
}
