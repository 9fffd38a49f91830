use crate::models::{DateSummary, PurchaseRecord};

/// Grand total plus per-day subtotals, ordered by date.
///
/// Works on the extracted records only, so the figures do not depend on
/// which writes succeeded.
pub fn summarize(records: &[PurchaseRecord]) -> DateSummary {
    let mut summary = DateSummary::default();
    for record in records {
        *summary.by_date.entry(record.date()).or_default() += record.amount;
        summary.total += record.amount;
    }
    summary
}
