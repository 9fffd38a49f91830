use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

use log::{error, info};

use crate::error::{Result, SyncError};
use crate::models::{DispatchFailure, EntityLookup, PurchaseRecord, SyncOutcome};
use crate::notion::{FundStore, NewPurchasePage};

/// Where and how purchase pages are written.
#[derive(Debug, Clone)]
pub struct DispatchTarget {
    pub database_id: String,
    pub category: String,
    pub concurrency: usize,
}

pub fn purchase_page(
    record: &PurchaseRecord,
    lookup: &EntityLookup,
    target: &DispatchTarget,
) -> Result<NewPurchasePage> {
    let fund_page_id = lookup
        .get(&record.fund_name)
        .ok_or_else(|| SyncError::Dispatch(format!("unknown fund {:?}", record.fund_name)))?;
    Ok(NewPurchasePage {
        database_id: target.database_id.clone(),
        fund_page_id: fund_page_id.clone(),
        amount: record.amount,
        category: target.category.clone(),
        date: record.timestamp,
    })
}

/// Create one purchase page per record.
///
/// Records are handed out to a fixed pool of scoped workers; a failed write
/// is counted and logged and never stops the others. Returns only once every
/// worker has been joined, so `succeeded + failed == total`.
pub fn dispatch(
    store: &dyn FundStore,
    records: &[PurchaseRecord],
    lookup: &EntityLookup,
    target: &DispatchTarget,
) -> SyncOutcome {
    let next = AtomicUsize::new(0);
    let succeeded = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let failures: Mutex<Vec<(usize, DispatchFailure)>> = Mutex::new(Vec::new());
    let workers = target.concurrency.clamp(1, records.len().max(1));

    thread::scope(|s| {
        for _ in 0..workers {
            s.spawn(|| loop {
                let idx = next.fetch_add(1, Ordering::Relaxed);
                let Some(record) = records.get(idx) else {
                    break;
                };
                let result = purchase_page(record, lookup, target)
                    .and_then(|page| store.create_page(&page));
                match result {
                    Ok(_) => {
                        succeeded.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        failed.fetch_add(1, Ordering::Relaxed);
                        error!(
                            "Failed to process {} {} {}: {e}",
                            record.date(),
                            record.fund_name,
                            record.amount
                        );
                        let failure = DispatchFailure {
                            record: record.clone(),
                            reason: e.to_string(),
                        };
                        failures
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner())
                            .push((idx, failure));
                    }
                }
            });
        }
    });

    let mut failures = failures.into_inner().unwrap_or_else(|e| e.into_inner());
    failures.sort_by_key(|(idx, _)| *idx);

    let outcome = SyncOutcome {
        total: records.len(),
        succeeded: succeeded.into_inner(),
        failed: failed.into_inner(),
        failures: failures.into_iter().map(|(_, f)| f).collect(),
    };
    info!(
        "Total record count: {}, success: {}, failed: {}",
        outcome.total, outcome.succeeded, outcome.failed
    );
    outcome
}
