//! Domain services

pub mod quantity;
pub mod reconciliation;

pub use quantity::{
    evaluate_expression, first_number, interpret_count, parse_quantity, split_unit_and_stock,
    CountValue,
};
pub use reconciliation::{classify_counts, ReconciliationSummary};
