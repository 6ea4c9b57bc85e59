//! Reconciliation of book stock against physically counted stock

use serde::{Deserialize, Serialize};
use stockcount_types::Classification;

use super::quantity::first_number;

/// Classify one row from the textual form of its two stock cells.
///
/// `None` means the cell is absent. An empty physical count is `Missing`;
/// otherwise both sides must yield a number or the row is `Unclassifiable`.
pub fn classify_counts(system_stock: Option<&str>, actual_count: Option<&str>) -> Classification {
    let actual = match actual_count {
        Some(text) if !text.trim().is_empty() => text,
        _ => return Classification::Missing,
    };

    let system = match system_stock {
        Some(text) => text,
        None => return Classification::Unclassifiable,
    };

    match (first_number(system), first_number(actual)) {
        (Some(sys), Some(act)) if sys != act => Classification::Mismatched,
        (Some(_), Some(_)) => Classification::Matched,
        _ => Classification::Unclassifiable,
    }
}

/// Per-classification row counts for one sheet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub missing: usize,
    pub matched: usize,
    pub mismatched: usize,
    pub unclassifiable: usize,
}

impl ReconciliationSummary {
    pub fn tally<I>(classifications: I) -> Self
    where
        I: IntoIterator<Item = Classification>,
    {
        let mut summary = Self::default();
        for classification in classifications {
            match classification {
                Classification::Missing => summary.missing += 1,
                Classification::Matched => summary.matched += 1,
                Classification::Mismatched => summary.mismatched += 1,
                Classification::Unclassifiable => summary.unclassifiable += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.missing + self.matched + self.mismatched + self.unclassifiable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_count() {
        assert_eq!(classify_counts(Some("10"), Some("")), Classification::Missing);
        assert_eq!(classify_counts(Some("10"), Some("  ")), Classification::Missing);
        assert_eq!(classify_counts(Some("10"), None), Classification::Missing);
    }

    #[test]
    fn test_matched_count() {
        assert_eq!(classify_counts(Some("10"), Some("10")), Classification::Matched);
        assert_eq!(classify_counts(Some("10.0"), Some("10盒")), Classification::Matched);
    }

    #[test]
    fn test_mismatched_count() {
        assert_eq!(classify_counts(Some("10"), Some("8")), Classification::Mismatched);
    }

    #[test]
    fn test_unparseable_side_is_unclassifiable() {
        assert_eq!(classify_counts(Some("10"), Some("看不清")), Classification::Unclassifiable);
        assert_eq!(classify_counts(Some(""), Some("8")), Classification::Unclassifiable);
        assert_eq!(classify_counts(None, Some("8")), Classification::Unclassifiable);
    }

    #[test]
    fn test_summary_tally() {
        let summary = ReconciliationSummary::tally([
            Classification::Missing,
            Classification::Matched,
            Classification::Matched,
            Classification::Mismatched,
        ]);
        assert_eq!(summary.missing, 1);
        assert_eq!(summary.matched, 2);
        assert_eq!(summary.mismatched, 1);
        assert_eq!(summary.unclassifiable, 0);
        assert_eq!(summary.total(), 4);
    }
}
