use std::thread;

use log::info;

use crate::dispatcher::{self, DispatchTarget};
use crate::error::{Result, SyncError};
use crate::importer::{self, Extraction};
use crate::models::{DateSummary, SyncOutcome};
use crate::notion::FundStore;
use crate::reports;
use crate::resolver;
use crate::settings::SyncConfig;

/// Everything one run needs, built once and passed down explicitly.
pub struct SyncContext {
    pub store: Box<dyn FundStore>,
    pub config: SyncConfig,
}

pub struct SyncReport {
    pub extraction: Extraction,
    pub outcome: SyncOutcome,
    pub summary: DateSummary,
}

impl SyncContext {
    pub fn new(store: Box<dyn FundStore>, config: SyncConfig) -> Self {
        Self { store, config }
    }

    /// Resolve funds and read the export side by side, then dispatch and
    /// summarize. Only resolution or an unreadable export abort the run.
    pub fn run(&self) -> Result<SyncReport> {
        let store = self.store.as_ref();
        let config = &self.config;

        let (lookup, extraction) = thread::scope(|s| {
            let funds = s.spawn(|| resolver::resolve(store, &config.fund_database_id));
            let extraction = importer::extract_file(&config.file_path);
            let lookup = funds
                .join()
                .unwrap_or_else(|_| Err(SyncError::Resolution("fund lookup panicked".to_string())));
            (lookup, extraction)
        });
        let lookup = lookup?;
        let extraction = extraction?;
        info!(
            "Extracted {} purchases ({} rows rejected)",
            extraction.records.len(),
            extraction.rejected.len()
        );

        let target = DispatchTarget {
            database_id: config.fund_buy_database_id.clone(),
            category: config.category_label.clone(),
            concurrency: config.concurrency,
        };
        let outcome = dispatcher::dispatch(store, &extraction.records, &lookup, &target);
        let summary = reports::summarize(&extraction.records);

        Ok(SyncReport {
            extraction,
            outcome,
            summary,
        })
    }
}
