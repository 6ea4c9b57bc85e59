//! Interpretation of quantity cells as they come out of OCR
//!
//! Count sheets mix printed numbers with handwriting, so a "quantity" may be
//! a plain number, a checkmark, a small sum the counter scribbled, a
//! not-yet-counted marker, or a unit glued to a number by the OCR engine.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// First run of digits, optionally with a decimal part
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.?\d*").expect("number pattern is valid"));

/// Leading non-numeric unit followed by a trailing number, e.g. "盒 6"
static UNIT_STOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([^\d\s.+\-*/]+)\s*(\d+(?:\.\d+)?)\s*$").expect("unit/stock pattern is valid")
});

/// Handwritten marks meaning "count equals book stock"
const CHECKMARKS: &[&str] = &["✓", "✔", "√", "v", "V", "☑"];

/// Marks meaning "not counted yet"
const NOT_COUNTED: &[&str] = &["未盘", "/", "／", "-", "—", "－"];

/// Extract the first numeric token from free text.
///
/// Tolerates units and stray characters around the digits ("12盒" → 12).
/// Signs, thousands separators and locale decimal commas are not handled.
pub fn first_number(text: &str) -> Option<f64> {
    NUMBER_RE
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Meaning of a physical-count cell
#[derive(Debug, Clone, PartialEq)]
pub enum CountValue {
    Number(f64),
    /// Checkmark: the counted value equals the system stock
    SameAsSystem,
    NotCounted,
    /// Text that carries no readable quantity
    Unreadable(String),
}

/// Interpret a physical-count cell (number, checkmark, sum or marker).
pub fn interpret_count(value: &Value) -> CountValue {
    match value {
        Value::Null => CountValue::NotCounted,
        Value::Number(n) => n
            .as_f64()
            .map(CountValue::Number)
            .unwrap_or_else(|| CountValue::Unreadable(n.to_string())),
        Value::String(s) => interpret_count_text(s),
        other => CountValue::Unreadable(other.to_string()),
    }
}

fn interpret_count_text(text: &str) -> CountValue {
    let trimmed = text.trim();
    if trimmed.is_empty() || NOT_COUNTED.contains(&trimmed) {
        return CountValue::NotCounted;
    }
    if CHECKMARKS.contains(&trimmed) {
        return CountValue::SameAsSystem;
    }
    match evaluate_expression(trimmed).or_else(|| first_number(trimmed)) {
        Some(n) => CountValue::Number(n),
        None => CountValue::Unreadable(trimmed.to_string()),
    }
}

/// Read a book-stock style cell as a number.
pub fn parse_quantity(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            evaluate_expression(trimmed).or_else(|| first_number(trimmed))
        }
        _ => None,
    }
}

/// Split a merged "unit + stock" token such as "盒 6" into ("盒", 6).
///
/// The leading non-numeric part is the unit, the trailing number the stock.
pub fn split_unit_and_stock(text: &str) -> Option<(String, f64)> {
    let caps = UNIT_STOCK_RE.captures(text)?;
    let unit = caps.get(1)?.as_str().trim().to_string();
    let stock = caps.get(2)?.as_str().parse::<f64>().ok()?;
    Some((unit, stock))
}

/// Evaluate a small arithmetic expression written in a count cell ("18+6").
///
/// Supports `+ - * /` with the usual precedence, parentheses and full-width
/// operators. Returns `None` for anything else, including a bare number
/// followed by text.
pub fn evaluate_expression(text: &str) -> Option<f64> {
    let normalized: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '＋' => '+',
            '－' | '—' => '-',
            '×' | 'x' | 'X' | '＊' => '*',
            '÷' | '／' => '/',
            '（' => '(',
            '）' => ')',
            '．' => '.',
            other => other,
        })
        .collect();

    if normalized.is_empty() {
        return None;
    }

    let mut parser = ExprParser {
        chars: normalized.chars().collect(),
        pos: 0,
    };
    let value = parser.expr()?;
    if parser.pos != parser.chars.len() || !value.is_finite() {
        return None;
    }
    Some(value)
}

struct ExprParser {
    chars: Vec<char>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn expr(&mut self) -> Option<f64> {
        let mut acc = self.term()?;
        while let Some(op) = self.peek() {
            match op {
                '+' => {
                    self.pos += 1;
                    acc += self.term()?;
                }
                '-' => {
                    self.pos += 1;
                    acc -= self.term()?;
                }
                _ => break,
            }
        }
        Some(acc)
    }

    fn term(&mut self) -> Option<f64> {
        let mut acc = self.factor()?;
        while let Some(op) = self.peek() {
            match op {
                '*' => {
                    self.pos += 1;
                    acc *= self.factor()?;
                }
                '/' => {
                    self.pos += 1;
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return None;
                    }
                    acc /= divisor;
                }
                _ => break,
            }
        }
        Some(acc)
    }

    fn factor(&mut self) -> Option<f64> {
        match self.peek()? {
            '(' => {
                self.pos += 1;
                let value = self.expr()?;
                if self.peek()? != ')' {
                    return None;
                }
                self.pos += 1;
                Some(value)
            }
            c if c.is_ascii_digit() => self.number(),
            _ => None,
        }
    }

    fn number(&mut self) -> Option<f64> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '.' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let literal: String = self.chars[start..self.pos].iter().collect();
        literal.parse::<f64>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_number_tolerates_units() {
        assert_eq!(first_number("12盒"), Some(12.0));
        assert_eq!(first_number("约 10.5 kg"), Some(10.5));
        assert_eq!(first_number("待核查"), None);
        assert_eq!(first_number(""), None);
    }

    #[test]
    fn test_first_number_takes_first_run_only() {
        assert_eq!(first_number("3箱2袋"), Some(3.0));
    }

    #[test]
    fn test_expression_sum() {
        assert_eq!(evaluate_expression("18+6"), Some(24.0));
        assert_eq!(evaluate_expression("18 ＋ 6"), Some(24.0));
    }

    #[test]
    fn test_expression_precedence_and_parens() {
        assert_eq!(evaluate_expression("2+3*4"), Some(14.0));
        assert_eq!(evaluate_expression("(2+3)×4"), Some(20.0));
        assert_eq!(evaluate_expression("10-4/2"), Some(8.0));
    }

    #[test]
    fn test_expression_rejects_garbage() {
        assert_eq!(evaluate_expression("12盒"), None);
        assert_eq!(evaluate_expression("5/0"), None);
        assert_eq!(evaluate_expression("+"), None);
        assert_eq!(evaluate_expression("(3+4"), None);
    }

    #[test]
    fn test_interpret_checkmarks() {
        for mark in ["√", "✓", "✔", "v", "V"] {
            assert_eq!(interpret_count(&json!(mark)), CountValue::SameAsSystem, "{}", mark);
        }
    }

    #[test]
    fn test_interpret_not_counted_markers() {
        for mark in ["未盘", "/", "-", "", "  "] {
            assert_eq!(interpret_count(&json!(mark)), CountValue::NotCounted, "{:?}", mark);
        }
        assert_eq!(interpret_count(&Value::Null), CountValue::NotCounted);
    }

    #[test]
    fn test_interpret_numbers_and_sums() {
        assert_eq!(interpret_count(&json!(5)), CountValue::Number(5.0));
        assert_eq!(interpret_count(&json!("10.5")), CountValue::Number(10.5));
        assert_eq!(interpret_count(&json!("18+6")), CountValue::Number(24.0));
        assert_eq!(interpret_count(&json!("7袋")), CountValue::Number(7.0));
    }

    #[test]
    fn test_interpret_unreadable() {
        assert_eq!(
            interpret_count(&json!("看不清")),
            CountValue::Unreadable("看不清".to_string())
        );
        assert!(matches!(interpret_count(&json!(true)), CountValue::Unreadable(_)));
    }

    #[test]
    fn test_split_unit_and_stock() {
        assert_eq!(split_unit_and_stock("盒 6"), Some(("盒".to_string(), 6.0)));
        assert_eq!(split_unit_and_stock("袋12.5"), Some(("袋".to_string(), 12.5)));
        assert_eq!(split_unit_and_stock("6"), None);
        assert_eq!(split_unit_and_stock("6 盒"), None);
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(&json!(12)), Some(12.0));
        assert_eq!(parse_quantity(&json!("12")), Some(12.0));
        assert_eq!(parse_quantity(&json!("3+4")), Some(7.0));
        assert_eq!(parse_quantity(&Value::Null), None);
    }
}
