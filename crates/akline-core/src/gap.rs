//! Gap detector: finds the leading and trailing sub-ranges of a
//! requested window not yet covered by the historical store. Interior
//! holes are not detected, by design.

use akline_calendar::{snap, SnapDirection};
use akline_models::{Resolution, Symbol};
use chrono::{Duration, NaiveDate};
use rusqlite::Connection;

use akline_store::error::StoreError;

fn prev_trading_day(date: NaiveDate) -> NaiveDate {
    snap(date - Duration::days(1), SnapDirection::Back)
}

fn next_trading_day(date: NaiveDate) -> NaiveDate {
    snap(date + Duration::days(1), SnapDirection::Forward)
}

/// Sub-ranges of `[begin, end]` not covered by the historical store for
/// `(symbol, resolution)`. Interior holes are never reported: historical
/// candles are persisted only via this pipeline's own contiguous
/// backfills, so an interior hole is structurally improbable.
pub fn detect(
    conn: &Connection,
    symbol: &Symbol,
    resolution: Resolution,
    begin: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<(NaiveDate, NaiveDate)>, StoreError> {
    let Some((first, last)) =
        akline_store::historical::first_and_last_date(conn, symbol, resolution, begin, end)?
    else {
        return Ok(vec![(begin, end)]);
    };

    let mut gaps = Vec::new();
    if begin < first {
        let leading_end = prev_trading_day(first);
        if leading_end >= begin {
            gaps.push((begin, leading_end));
        }
    }
    if last < end {
        let trailing_start = next_trading_day(last);
        if trailing_start <= end {
            gaps.push((trailing_start, end));
        }
    }
    Ok(gaps)
}
