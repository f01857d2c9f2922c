use akline_models::{Candle, Resolution, Symbol};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

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

/// Reads today's intraday candles for `symbol`/`resolution`, ordered by
/// `end_ts`. Includes both sealed and still-forming bars.
pub fn query(
    conn: &Connection,
    symbol: &Symbol,
    resolution: Resolution,
    session_date: NaiveDate,
) -> Result<Vec<Candle>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT end_ts, open, high, low, close, volume, amount, turn FROM intraday_candles
         WHERE code = ?1 AND resolution = ?2 AND session_date = ?3
         ORDER BY end_ts ASC",
    )?;
    let rows = stmt.query_map(
        params![
            symbol.to_string(),
            resolution_key(resolution),
            session_date.to_string()
        ],
        |row| row_to_candle(symbol, resolution, row),
    )?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Upserts intraday candles inside one transaction. Conflict key is
/// `(code, resolution, end_ts)`; OHLCV fields and `sealed` replace on
/// conflict. Each candle carries its own `sealed` flag rather than one
/// flag for the whole batch, matching the store contract's
/// `(Candle, sealed)` pairing.
pub fn upsert_batch(
    conn: &mut Connection,
    candles: &[(Candle, bool)],
    session_date: NaiveDate,
) -> Result<usize, StoreError> {
    if candles.is_empty() {
        return Ok(0);
    }
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare_cached(
            "INSERT INTO intraday_candles
                (code, resolution, end_ts, open, high, low, close, volume, amount, turn, sealed, session_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(code, resolution, end_ts) DO UPDATE SET
                open = excluded.open,
                high = excluded.high,
                low = excluded.low,
                close = excluded.close,
                volume = excluded.volume,
                amount = excluded.amount,
                turn = excluded.turn,
                sealed = excluded.sealed",
        )?;
        for (candle, sealed) in candles {
            candle.validate()?;
            stmt.execute(params![
                candle.symbol.to_string(),
                resolution_key(candle.resolution),
                candle.end_ts.to_rfc3339(),
                candle.open,
                candle.high,
                candle.low,
                candle.close,
                candle.volume,
                candle.amount,
                candle.turn,
                sealed,
                session_date.to_string(),
            ])?;
        }
    }
    tx.commit()?;
    Ok(candles.len())
}

/// True if any intraday row exists for `symbol`/`resolution`, regardless
/// of session date. Used by the reader to tell a cold-but-known symbol
/// apart from a genuinely unregistered one.
pub fn has_any_row(conn: &Connection, symbol: &Symbol, resolution: Resolution) -> Result<bool, StoreError> {
    let exists = conn
        .prepare_cached("SELECT 1 FROM intraday_candles WHERE code = ?1 AND resolution = ?2 LIMIT 1")?
        .query_row(params![symbol.to_string(), resolution_key(resolution)], |_| Ok(()))
        .optional()?
        .is_some();
    Ok(exists)
}

/// Deletes intraday rows for session dates strictly before `cutoff`.
/// Best-effort: a row that's concurrently promoted to the historical
/// table and swept in the same window is harmless to delete twice.
pub fn sweep_before(conn: &Connection, cutoff: NaiveDate) -> Result<usize, StoreError> {
    let deleted = conn.execute(
        "DELETE FROM intraday_candles WHERE session_date < ?1",
        params![cutoff.to_string()],
    )?;
    Ok(deleted)
}

fn resolution_key(resolution: Resolution) -> &'static str {
    resolution.table_suffix()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use chrono::TimeZone;

    fn sample(date: NaiveDate, minute: u32) -> Candle {
        Candle {
            symbol: "sh.600519".parse().unwrap(),
            resolution: Resolution::Min5,
            end_ts: Utc.from_utc_datetime(&date.and_hms_opt(9, minute, 0).unwrap()),
            open: 10.0,
            high: 10.2,
            low: 9.9,
            close: 10.1,
            volume: 500.0,
            amount: 5_050.0,
            turn: None,
        }
    }

    #[test]
    fn upsert_and_query_roundtrip() {
        let mut conn = open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        upsert_batch(&mut conn, &[(sample(date, 35), false)], date).unwrap();

        let rows = query(&conn, &"sh.600519".parse().unwrap(), Resolution::Min5, date).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn upsert_replaces_forming_bar() {
        let mut conn = open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let mut candle = sample(date, 35);
        upsert_batch(&mut conn, &[(candle.clone(), false)], date).unwrap();
        candle.close = 12.0;
        upsert_batch(&mut conn, &[(candle.clone(), false)], date).unwrap();

        let rows = query(&conn, &"sh.600519".parse().unwrap(), Resolution::Min5, date).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].close, 12.0);
    }

    #[test]
    fn upsert_replaces_sealed_flag_on_conflict() {
        let mut conn = open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let candle = sample(date, 35);
        upsert_batch(&mut conn, &[(candle.clone(), false)], date).unwrap();
        assert!(has_any_row(&conn, &candle.symbol, candle.resolution).unwrap());
        upsert_batch(&mut conn, &[(candle.clone(), true)], date).unwrap();

        let sealed: bool = conn
            .query_row(
                "SELECT sealed FROM intraday_candles WHERE code = ?1",
                params![candle.symbol.to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert!(sealed);
    }

    #[test]
    fn has_any_row_is_false_for_unknown_symbol() {
        let conn = open_in_memory().unwrap();
        let symbol: Symbol = "sh.600519".parse().unwrap();
        assert!(!has_any_row(&conn, &symbol, Resolution::Min5).unwrap());
    }

    #[test]
    fn sweep_removes_stale_sessions() {
        let mut conn = open_in_memory().unwrap();
        let old_date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        upsert_batch(&mut conn, &[(sample(old_date, 35), false)], old_date).unwrap();

        let deleted = sweep_before(&conn, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()).unwrap();
        assert_eq!(deleted, 1);
        let remaining = query(
            &conn,
            &"sh.600519".parse().unwrap(),
            Resolution::Min5,
            old_date,
        )
        .unwrap();
        assert!(remaining.is_empty());
    }
}
