use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};

/// One row from the export, keyed by header name.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    /// 1-based line in the source file (header is line 1).
    pub line: u64,
    pub fields: HashMap<String, String>,
}

impl RawRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseRecord {
    pub fund_name: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

impl PurchaseRecord {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Fund display name -> Notion page id.
pub type EntityLookup = HashMap<String, String>;

#[derive(Debug, Clone)]
pub struct DispatchFailure {
    pub record: PurchaseRecord,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct SyncOutcome {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<DispatchFailure>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateSummary {
    pub by_date: BTreeMap<NaiveDate, f64>,
    pub total: f64,
}
