//! Intraday router: decides, per candle returned by the intraday vendor,
//! whether it has already sealed (routed to the historical store) or is
//! still forming (routed to the intraday store), and sweeps stale
//! intraday rows once the day has rolled over.

use akline_models::{Resolution, Symbol, SymbolKind};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::Connection;

use akline_store::error::StoreError;
use akline_vendor::{Adjustment, IntradayAdapter, VendorError};

use crate::registry;

/// Runs the freshness check, pulls from the intraday vendor if needed,
/// routes each candle to the historical or intraday store, and sweeps
/// stale intraday rows. Only called when the caller's read window
/// covers today.
///
/// Vendor errors never abort a read: an unsupported combination or an
/// empty vendor result is logged and the router returns `Ok(())`,
/// leaving whatever is already in the store. Only a store write
/// failure propagates.
pub async fn refresh(
    conn: &mut Connection,
    symbol: &Symbol,
    resolution: Resolution,
    intraday: &dyn IntradayAdapter,
    now: NaiveDateTime,
    today: NaiveDate,
) -> Result<(), StoreError> {
    let expected = akline_calendar::expected_finished_count(resolution, now);
    if expected >= 1 {
        let historical_count =
            akline_store::historical::query_range(conn, symbol, resolution, today, today)?.len();
        let intraday_count =
            akline_store::intraday::query(conn, symbol, resolution, today)?.len();
        if (historical_count + intraday_count) as u32 >= expected {
            akline_store::intraday::sweep_before(conn, today)?;
            return Ok(());
        }
    }

    let kind = registry::classify(conn, symbol);
    let rows = match kind {
        SymbolKind::Index => intraday.fetch_index(symbol, resolution).await,
        SymbolKind::Stock | SymbolKind::Etf => {
            intraday.fetch_stock(symbol, resolution, Adjustment::Forward).await
        }
    };

    let rows = match rows {
        Ok(rows) => rows,
        Err(VendorError::Unsupported(reason)) => {
            tracing::info!(symbol = %symbol, ?resolution, reason, "intraday combination unsupported; skipping");
            Vec::new()
        }
        Err(VendorError::Empty) => {
            tracing::warn!(symbol = %symbol, ?resolution, "intraday vendor returned no data");
            Vec::new()
        }
        Err(err) => {
            tracing::warn!(symbol = %symbol, ?resolution, error = %err, "intraday pull failed; skipping this refresh");
            Vec::new()
        }
    };

    let mut sealed_batch = Vec::new();
    let mut forming_batch = Vec::new();
    for candle in rows {
        if candle.end_ts.date_naive() != today {
            continue;
        }
        if candle.validate().is_err() {
            tracing::warn!(symbol = %symbol, ?resolution, "dropping malformed vendor candle");
            continue;
        }
        if candle.end_ts.naive_utc() <= now {
            sealed_batch.push(candle);
        } else {
            // Still forming: the intraday store's own `sealed` flag is
            // false here by construction -- a candle the router routes to
            // the intraday table is, by definition, not yet sealed.
            forming_batch.push((candle, false));
        }
    }

    if !sealed_batch.is_empty() {
        akline_store::historical::upsert_batch(conn, &sealed_batch)?;
    }
    if !forming_batch.is_empty() {
        akline_store::intraday::upsert_batch(conn, &forming_batch, today)?;
    }

    akline_store::intraday::sweep_before(conn, today)?;
    Ok(())
}
