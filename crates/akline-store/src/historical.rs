use akline_models::{Candle, Resolution, Symbol};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::historical_table_name;
use crate::error::StoreError;

fn row_to_candle(
    symbol: &Symbol,
    resolution: Resolution,
    row: &rusqlite::Row<'_>,
) -> rusqlite::Result<Candle> {
    let end_ts: String = row.get("end_ts")?;
    let end_ts = DateTime::parse_from_rfc3339(&end_ts)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    Ok(Candle {
        symbol: symbol.clone(),
        resolution,
        end_ts,
        open: row.get("open")?,
        high: row.get("high")?,
        low: row.get("low")?,
        close: row.get("close")?,
        volume: row.get("volume")?,
        amount: row.get("amount")?,
        turn: row.get("turn")?,
    })
}

/// Reads every historical candle for `symbol`/`resolution` whose
/// trading day falls in `[begin, end]`, ordered by `end_ts`.
pub fn query_range(
    conn: &Connection,
    symbol: &Symbol,
    resolution: Resolution,
    begin: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Candle>, StoreError> {
    let table = historical_table_name(resolution);
    let sql = format!(
        "SELECT end_ts, open, high, low, close, volume, amount, turn FROM {table}
         WHERE code = ?1 AND date(end_ts) BETWEEN date(?2) AND date(?3)
         ORDER BY end_ts ASC"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(
        params![symbol.to_string(), begin.to_string(), end.to_string()],
        |row| row_to_candle(symbol, resolution, row),
    )?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Upserts a batch of historical candles inside one transaction. All
/// candles must share the same resolution (the router and backfill
/// driver always write one resolution at a time). Conflict key is
/// `(end_ts, code)`; OHLCV fields replace on conflict.
pub fn upsert_batch(conn: &mut Connection, candles: &[Candle]) -> Result<usize, StoreError> {
    let Some(first) = candles.first() else {
        return Ok(0);
    };
    let resolution = first.resolution;
    let table = historical_table_name(resolution);
    let sql = format!(
        "INSERT INTO {table} (end_ts, code, open, high, low, close, volume, amount, turn)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(end_ts, code) DO UPDATE SET
             open = excluded.open,
             high = excluded.high,
             low = excluded.low,
             close = excluded.close,
             volume = excluded.volume,
             amount = excluded.amount,
             turn = excluded.turn"
    );

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare_cached(&sql)?;
        for candle in candles {
            candle.validate()?;
            stmt.execute(params![
                candle.end_ts.to_rfc3339(),
                candle.symbol.to_string(),
                candle.open,
                candle.high,
                candle.low,
                candle.close,
                candle.volume,
                candle.amount,
                candle.turn,
            ])?;
        }
    }
    tx.commit()?;
    Ok(candles.len())
}

/// The first and last trading day with a stored row for this
/// symbol/resolution within `[begin, end]`. Used by the gap detector to
/// bound leading/trailing gaps without loading full candle rows.
pub fn first_and_last_date(
    conn: &Connection,
    symbol: &Symbol,
    resolution: Resolution,
    begin: NaiveDate,
    end: NaiveDate,
) -> Result<Option<(NaiveDate, NaiveDate)>, StoreError> {
    let table = historical_table_name(resolution);
    let sql = format!(
        "SELECT min(date(end_ts)), max(date(end_ts)) FROM {table}
         WHERE code = ?1 AND date(end_ts) BETWEEN date(?2) AND date(?3)"
    );
    let result: Option<(Option<String>, Option<String>)> = conn
        .prepare_cached(&sql)?
        .query_row(
            params![symbol.to_string(), begin.to_string(), end.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    Ok(result.and_then(|(first, last)| match (first, last) {
        (Some(first), Some(last)) => Some((
            first.parse::<NaiveDate>().unwrap(),
            last.parse::<NaiveDate>().unwrap(),
        )),
        _ => None,
    }))
}

/// True if any historical row exists for `symbol`/`resolution`,
/// regardless of date range. Used by the reader to tell a cold-but-known
/// symbol apart from a genuinely unregistered one.
pub fn has_any_row(conn: &Connection, symbol: &Symbol, resolution: Resolution) -> Result<bool, StoreError> {
    let table = historical_table_name(resolution);
    let sql = format!("SELECT 1 FROM {table} WHERE code = ?1 LIMIT 1");
    let exists = conn
        .prepare_cached(&sql)?
        .query_row(params![symbol.to_string()], |_| Ok(()))
        .optional()?
        .is_some();
    Ok(exists)
}
