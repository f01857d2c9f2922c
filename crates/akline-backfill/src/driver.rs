//! Backfill driver: a resumable, paced, re-logging batch walker over a
//! symbol universe. Walks a finite slice of the universe (bounded by a
//! resumable start index and an optional max-stocks cap), re-logs the
//! bulk vendor session every N symbols, and records one outcome per
//! symbol without letting a single failure abort the walk.

use std::time::Duration;

use akline_models::{Resolution, UniverseEntry};
use chrono::NaiveDate;
use rusqlite::Connection;
use tokio_util::sync::CancellationToken;

use akline_vendor::{Adjustment, BulkHistoryAdapter, VendorError};

use crate::config::BatchOptions;
use crate::error::BackfillError;

/// The historical frequencies the batch walker fetches per symbol.
const BATCH_RESOLUTIONS: [Resolution; 3] = [Resolution::Day, Resolution::Week, Resolution::Month];

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolOutcome {
    pub symbol: String,
    pub succeeded: Vec<Resolution>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackfillReport {
    pub outcomes: Vec<SymbolOutcome>,
    pub login_calls: u32,
    pub logout_calls: u32,
    pub cancelled: bool,
}

impl BackfillReport {
    pub fn failures(&self) -> Vec<&SymbolOutcome> {
        self.outcomes.iter().filter(|o| o.error.is_some()).collect()
    }
}

fn window_start(opts: &BatchOptions, entry: &UniverseEntry) -> NaiveDate {
    match entry.list_date {
        Some(list_date) => opts.start_date.min(list_date),
        None => opts.start_date,
    }
}

/// Runs the batch walk over `universe`, starting at `opts.start_index`
/// and stopping after `opts.max_stocks` symbols (if set) or at
/// cancellation, whichever comes first.
pub async fn run_batch(
    conn: &mut Connection,
    bulk: &mut dyn BulkHistoryAdapter,
    universe: &[UniverseEntry],
    opts: &BatchOptions,
    cancel: &CancellationToken,
) -> Result<BackfillReport, BackfillError> {
    let mut report = BackfillReport::default();

    let slice: Vec<&UniverseEntry> = match opts.max_stocks {
        Some(max) => universe
            .iter()
            .skip(opts.start_index)
            .take(max)
            .collect(),
        None => universe.iter().skip(opts.start_index).collect(),
    };

    if slice.is_empty() {
        return Ok(report);
    }

    if bulk.login().await.is_ok() {
        report.login_calls += 1;
    } else {
        tracing::warn!("initial bulk vendor login failed; aborting batch");
        return Ok(report);
    }

    for (offset, entry) in slice.iter().enumerate() {
        let idx = offset + 1;
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }

        if idx > 1 && (idx - 1) % opts.relogin_interval == 0 {
            let _ = bulk.logout().await;
            report.logout_calls += 1;
            if bulk.login().await.is_ok() {
                report.login_calls += 1;
            } else {
                tracing::warn!(symbol = %entry.symbol, "relogin failed; stopping batch");
                report.cancelled = true;
                break;
            }
        }

        let begin = window_start(opts, entry);
        let outcome = import_one(conn, bulk, entry, begin, opts.end_date).await;
        report.outcomes.push(outcome);

        if opts.delay_ms > 0 && idx < slice.len() {
            tokio::time::sleep(Duration::from_millis(opts.delay_ms)).await;
        }
    }

    let _ = bulk.logout().await;
    report.logout_calls += 1;
    Ok(report)
}

/// Fetches and stores every resolution in `BATCH_RESOLUTIONS` for one
/// symbol. Success means at least one frequency was written; a
/// session-expired error is retried once after relogin, and any
/// resolution that still fails is recorded but does not fail the whole
/// symbol.
async fn import_one(
    conn: &mut Connection,
    bulk: &mut dyn BulkHistoryAdapter,
    entry: &UniverseEntry,
    begin: NaiveDate,
    end: NaiveDate,
) -> SymbolOutcome {
    let mut succeeded = Vec::new();
    let mut last_error = None;

    for resolution in BATCH_RESOLUTIONS {
        match fetch_and_store(conn, bulk, entry, resolution, begin, end).await {
            Ok(true) => succeeded.push(resolution),
            Ok(false) => {}
            Err(VendorError::SessionExpired) => {
                if bulk.login().await.is_ok() {
                    match fetch_and_store(conn, bulk, entry, resolution, begin, end).await {
                        Ok(true) => succeeded.push(resolution),
                        Ok(false) => {}
                        Err(err) => last_error = Some(err.to_string()),
                    }
                } else {
                    last_error = Some("relogin after session expiry failed".to_string());
                }
            }
            Err(err) => last_error = Some(err.to_string()),
        }
    }

    SymbolOutcome {
        symbol: entry.symbol.to_string(),
        error: if succeeded.is_empty() {
            Some(last_error.unwrap_or_else(|| "no frequency returned data".to_string()))
        } else {
            None
        },
        succeeded,
    }
}

async fn fetch_and_store(
    conn: &mut Connection,
    bulk: &mut dyn BulkHistoryAdapter,
    entry: &UniverseEntry,
    resolution: Resolution,
    begin: NaiveDate,
    end: NaiveDate,
) -> Result<bool, VendorError> {
    match bulk
        .fetch(&entry.symbol, resolution, begin, end, Adjustment::Forward)
        .await
    {
        Ok(candles) if !candles.is_empty() => {
            akline_store::historical::upsert_batch(conn, &candles)
                .map_err(|err| VendorError::Unsupported(err.to_string()))?;
            Ok(true)
        }
        Ok(_) => Ok(false),
        Err(VendorError::Empty) => Ok(false),
        Err(err) => Err(err),
    }
}
