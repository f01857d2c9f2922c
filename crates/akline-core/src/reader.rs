//! Read-through reader: orchestrates one `(symbol, resolution, begin,
//! end)` read through the
//! `SNAP -> QUERY_H -> DETECT_GAPS -> BACKFILL* -> INTRADAY? ->
//! QUERY_H2/QUERY_I -> MERGE` pipeline. Every gap backfill degrades
//! independently on failure rather than aborting the whole read, so a
//! vendor outage on one sub-range never blocks the rows already present.

use akline_calendar::{snap, SnapDirection};
use akline_models::{Candle, Resolution, Symbol};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;

use akline_vendor::{Adjustment, BulkHistoryAdapter, IntradayAdapter, VendorError};

use crate::error::ReaderError;
use crate::{gap, registry, router};

#[derive(Debug, Clone)]
pub struct ReadRequest {
    pub symbol: Symbol,
    pub resolution: Resolution,
    pub begin: NaiveDate,
    pub end: NaiveDate,
}

/// Runs one full read-through cycle and returns the merged,
/// duplicate-free, `end_ts`-ascending candle stream.
///
/// `now` is the caller's local PRC wall-clock timestamp, supplied rather
/// than read from the system clock so tests can drive every
/// session-clock branch.
pub async fn read(
    conn: &mut Connection,
    bulk: &mut dyn BulkHistoryAdapter,
    intraday: &dyn IntradayAdapter,
    request: ReadRequest,
    now: NaiveDateTime,
) -> Result<Vec<Candle>, ReaderError> {
    let today = now.date();

    // SNAP
    let mut begin = request.begin;
    if let Some(list_date) = registry::list_date(&*conn, &request.symbol, request.resolution)? {
        begin = begin.max(list_date);
    }
    let begin = snap(begin, SnapDirection::Forward);
    let end = snap(request.end, SnapDirection::Back);
    if begin > end {
        return Ok(Vec::new());
    }

    // Week/month candles are "derived only at vendor and stored whole"
    // (they have no in-progress/intraday form), so a window that needs
    // today's still-forming bar at these resolutions can't be served.
    if end >= today && matches!(request.resolution, Resolution::Week | Resolution::Month) {
        return Err(ReaderError::UnsupportedResolution(format!(
            "{:?} has no intraday form; cannot read today's window",
            request.resolution
        )));
    }

    // QUERY_H (consulted only to detect gaps; the result is re-read
    // after backfill in QUERY_H2 since backfill may have added rows).
    // DETECT_GAPS
    let gaps = gap::detect(&*conn, &request.symbol, request.resolution, begin, end)?;

    // BACKFILL. Each gap degrades independently, but a gap that fails
    // for a real (non-empty-result) vendor reason surfaces to the
    // caller once the whole window has been attempted.
    let mut vendor_failure = None;
    for (gap_begin, gap_end) in gaps {
        if let GapOutcome::Failed(reason) =
            backfill_gap(conn, bulk, &request.symbol, request.resolution, gap_begin, gap_end).await
        {
            vendor_failure.get_or_insert(reason);
        }
    }
    if let Some(reason) = vendor_failure {
        return Err(ReaderError::VendorUnavailable(reason));
    }

    // INTRADAY
    if end >= today {
        if let Err(err) = akline_store::intraday::sweep_before(&*conn, today) {
            tracing::warn!(error = %err, "intraday sweep failed; continuing");
        }
        if let Err(err) =
            router::refresh(conn, &request.symbol, request.resolution, intraday, now, today).await
        {
            tracing::warn!(symbol = %request.symbol, error = %err, "intraday refresh failed; continuing with stored data");
        }
    }

    // QUERY_H2 / QUERY_I
    let historical =
        akline_store::historical::query_range(&*conn, &request.symbol, request.resolution, begin, end)?;
    let intraday_rows = if end >= today {
        akline_store::intraday::query(&*conn, &request.symbol, request.resolution, today)?
    } else {
        Vec::new()
    };

    // MERGE: historical rows, then any intraday row strictly newer than
    // the last historical `end_ts`. This suppresses intraday duplicates
    // of rows the router has since sealed into the historical store.
    let last_historical_ts = historical.last().map(|c| c.end_ts);
    let mut merged = historical;
    merged.extend(
        intraday_rows
            .into_iter()
            .filter(|c| last_historical_ts.map_or(true, |last| c.end_ts > last)),
    );

    Ok(merged)
}

/// Result of attempting to heal one gap. An empty vendor result is a
/// legitimate outcome (e.g. a pre-listing range) and never surfaces to the
/// caller; any other failure does, once every gap has been attempted.
enum GapOutcome {
    Healed,
    EmptyUpstream,
    Failed(String),
}

async fn backfill_gap(
    conn: &mut Connection,
    bulk: &mut dyn BulkHistoryAdapter,
    symbol: &Symbol,
    resolution: Resolution,
    gap_begin: NaiveDate,
    gap_end: NaiveDate,
) -> GapOutcome {
    if !bulk.is_authenticated() {
        if let Err(err) = bulk.login().await {
            tracing::warn!(symbol = %symbol, error = %err, "bulk vendor login failed; skipping this gap");
            return GapOutcome::Failed(err.to_string());
        }
    }

    match bulk
        .fetch(symbol, resolution, gap_begin, gap_end, Adjustment::Forward)
        .await
    {
        Ok(candles) => {
            store_backfilled(conn, symbol, &candles);
            GapOutcome::Healed
        }
        Err(VendorError::SessionExpired) => {
            tracing::info!(symbol = %symbol, "bulk vendor session expired; re-logging in");
            if let Err(err) = bulk.login().await {
                tracing::warn!(symbol = %symbol, "relogin failed; skipping this gap");
                return GapOutcome::Failed(err.to_string());
            }
            match bulk
                .fetch(symbol, resolution, gap_begin, gap_end, Adjustment::Forward)
                .await
            {
                Ok(candles) => {
                    store_backfilled(conn, symbol, &candles);
                    GapOutcome::Healed
                }
                Err(VendorError::Empty) => {
                    tracing::warn!(symbol = %symbol, ?gap_begin, ?gap_end, "bulk vendor returned no data for this gap");
                    GapOutcome::EmptyUpstream
                }
                Err(err) => {
                    tracing::warn!(symbol = %symbol, error = %err, "backfill retry after relogin failed; skipping this gap");
                    GapOutcome::Failed(err.to_string())
                }
            }
        }
        Err(VendorError::Empty) => {
            tracing::warn!(symbol = %symbol, ?gap_begin, ?gap_end, "bulk vendor returned no data for this gap");
            GapOutcome::EmptyUpstream
        }
        Err(err) => {
            tracing::warn!(symbol = %symbol, error = %err, "bulk vendor fetch failed; skipping this gap");
            GapOutcome::Failed(err.to_string())
        }
    }
}

fn store_backfilled(conn: &mut Connection, symbol: &Symbol, candles: &[Candle]) {
    if candles.is_empty() {
        return;
    }
    if let Err(err) = akline_store::historical::upsert_batch(conn, candles) {
        tracing::warn!(symbol = %symbol, error = %err, "failed to persist backfilled candles");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use akline_models::{SymbolKind, UniverseEntry};
    use akline_vendor::{MockBulkAdapter, MockIntradayAdapter};
    use chrono::{NaiveTime, TimeZone, Utc};

    fn daily_candle(symbol: &str, date: NaiveDate) -> Candle {
        Candle {
            symbol: symbol.parse().unwrap(),
            resolution: Resolution::Day,
            end_ts: Utc.from_utc_datetime(&date.and_hms_opt(15, 0, 0).unwrap()),
            open: 10.0,
            high: 10.5,
            low: 9.8,
            close: 10.2,
            volume: 1_000.0,
            amount: 10_200.0,
            turn: Some(1.0),
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    async fn s1_cold_read_past_window_backfills_four_trading_days() {
        let mut conn = akline_store::db::open_in_memory().unwrap();
        let symbol: Symbol = "sh.600519".parse().unwrap();
        let mut bulk = MockBulkAdapter::new();
        bulk.seed(
            symbol.clone(),
            Resolution::Day,
            vec![
                daily_candle("sh.600519", d(2024, 1, 2)),
                daily_candle("sh.600519", d(2024, 1, 3)),
                daily_candle("sh.600519", d(2024, 1, 4)),
                daily_candle("sh.600519", d(2024, 1, 5)),
            ],
        );
        let intraday = MockIntradayAdapter::new();

        let request = ReadRequest {
            symbol: symbol.clone(),
            resolution: Resolution::Day,
            begin: d(2024, 1, 2),
            end: d(2024, 1, 5),
        };
        let now = d(2024, 1, 10).and_hms_opt(9, 0, 0).unwrap();

        let result = read(&mut conn, &mut bulk, &intraday, request, now).await.unwrap();
        assert_eq!(result.len(), 4);
        assert!(result.windows(2).all(|w| w[0].end_ts < w[1].end_ts));
    }

    #[tokio::test]
    async fn s2_non_trading_endpoints_snap_to_same_four_rows() {
        let mut conn = akline_store::db::open_in_memory().unwrap();
        let symbol: Symbol = "sh.600519".parse().unwrap();
        let mut bulk = MockBulkAdapter::new();
        bulk.seed(
            symbol.clone(),
            Resolution::Day,
            vec![
                daily_candle("sh.600519", d(2024, 1, 2)),
                daily_candle("sh.600519", d(2024, 1, 3)),
                daily_candle("sh.600519", d(2024, 1, 4)),
                daily_candle("sh.600519", d(2024, 1, 5)),
            ],
        );
        let intraday = MockIntradayAdapter::new();

        // Jan 1 is a holiday, Jan 6 is a Saturday.
        let request = ReadRequest {
            symbol: symbol.clone(),
            resolution: Resolution::Day,
            begin: d(2024, 1, 1),
            end: d(2024, 1, 6),
        };
        let now = d(2024, 1, 10).and_hms_opt(9, 0, 0).unwrap();

        let result = read(&mut conn, &mut bulk, &intraday, request, now).await.unwrap();
        assert_eq!(result.len(), 4);
    }

    #[tokio::test]
    async fn s5_pre_list_clamping_excludes_rows_before_list_date() {
        let mut conn = akline_store::db::open_in_memory().unwrap();
        let symbol: Symbol = "sh.600519".parse().unwrap();
        let list_date = d(2021, 6, 10);
        akline_store::universe::upsert_batch(
            &mut conn,
            &[UniverseEntry {
                symbol: symbol.clone(),
                name: "贵州茅台".to_string(),
                kind: SymbolKind::Stock,
                list_date: Some(list_date),
                pinyin: "guizhoumaotai".to_string(),
                pinyin_initials: "gzmt".to_string(),
            }],
        )
        .unwrap();

        let mut bulk = MockBulkAdapter::new();
        bulk.seed(
            symbol.clone(),
            Resolution::Day,
            vec![daily_candle("sh.600519", list_date)],
        );
        let intraday = MockIntradayAdapter::new();

        let request = ReadRequest {
            symbol: symbol.clone(),
            resolution: Resolution::Day,
            begin: d(2020, 1, 1),
            end: d(2021, 7, 1),
        };
        let now = d(2021, 7, 2).and_hms_opt(9, 0, 0).unwrap();

        let result = read(&mut conn, &mut bulk, &intraday, request, now).await.unwrap();
        assert!(result.iter().all(|c| c.end_ts.date_naive() >= list_date));
    }

    #[tokio::test]
    async fn gap_closure_second_read_does_no_further_backfill() {
        let mut conn = akline_store::db::open_in_memory().unwrap();
        let symbol: Symbol = "sh.600519".parse().unwrap();
        let mut bulk = MockBulkAdapter::new();
        bulk.seed(
            symbol.clone(),
            Resolution::Day,
            vec![
                daily_candle("sh.600519", d(2024, 1, 2)),
                daily_candle("sh.600519", d(2024, 1, 3)),
            ],
        );
        let intraday = MockIntradayAdapter::new();
        let now = d(2024, 1, 10).and_hms_opt(9, 0, 0).unwrap();

        let request = ReadRequest {
            symbol: symbol.clone(),
            resolution: Resolution::Day,
            begin: d(2024, 1, 2),
            end: d(2024, 1, 3),
        };
        read(&mut conn, &mut bulk, &intraday, request.clone(), now)
            .await
            .unwrap();
        let login_calls_after_first = bulk.login_calls;

        bulk.fail_symbols.insert(symbol.clone());
        let result = read(&mut conn, &mut bulk, &intraday, request, now).await.unwrap();
        assert_eq!(result.len(), 2);
        // No new gaps, so login isn't invoked again for this read.
        assert_eq!(bulk.login_calls, login_calls_after_first);
    }

    #[tokio::test]
    async fn s3_intraday_split_routes_sealed_and_forming_rows() {
        let mut conn = akline_store::db::open_in_memory().unwrap();
        let symbol: Symbol = "sh.600519".parse().unwrap();
        let mut bulk = MockBulkAdapter::new();
        let mut intraday = MockIntradayAdapter::new();
        let today = d(2025, 12, 22);

        fn hourly(date: NaiveDate, h: u32, mi: u32) -> Candle {
            Candle {
                symbol: "sh.600519".parse().unwrap(),
                resolution: Resolution::Min60,
                end_ts: Utc.from_utc_datetime(&date.and_hms_opt(h, mi, 0).unwrap()),
                open: 10.0,
                high: 10.5,
                low: 9.8,
                close: 10.2,
                volume: 1_000.0,
                amount: 10_200.0,
                turn: None,
            }
        }

        intraday.seed_stock(
            symbol.clone(),
            Resolution::Min60,
            vec![
                hourly(today, 10, 30),
                hourly(today, 11, 30),
                hourly(today, 14, 0),
                hourly(today, 15, 0),
            ],
        );

        let request = ReadRequest {
            symbol: symbol.clone(),
            resolution: Resolution::Min60,
            begin: today,
            end: today,
        };
        let now = today.and_hms_opt(10, 45, 0).unwrap();

        let result = read(&mut conn, &mut bulk, &intraday, request, now).await.unwrap();
        assert_eq!(result.len(), 4);
        assert_eq!(result[0].end_ts.time(), NaiveTime::from_hms_opt(10, 30, 0).unwrap());
        assert!(result.windows(2).all(|w| w[0].end_ts < w[1].end_ts));
    }

    #[tokio::test]
    async fn s4_seal_promotion_advances_across_reads_without_duplication() {
        let mut conn = akline_store::db::open_in_memory().unwrap();
        let symbol: Symbol = "sh.600519".parse().unwrap();
        let mut bulk = MockBulkAdapter::new();
        let mut intraday = MockIntradayAdapter::new();
        let today = d(2025, 12, 22);

        fn hourly(date: NaiveDate, h: u32, mi: u32) -> Candle {
            Candle {
                symbol: "sh.600519".parse().unwrap(),
                resolution: Resolution::Min60,
                end_ts: Utc.from_utc_datetime(&date.and_hms_opt(h, mi, 0).unwrap()),
                open: 10.0,
                high: 10.5,
                low: 9.8,
                close: 10.2,
                volume: 1_000.0,
                amount: 10_200.0,
                turn: None,
            }
        }

        intraday.seed_stock(
            symbol.clone(),
            Resolution::Min60,
            vec![
                hourly(today, 10, 30),
                hourly(today, 11, 30),
                hourly(today, 14, 0),
                hourly(today, 15, 0),
            ],
        );

        let request = ReadRequest {
            symbol: symbol.clone(),
            resolution: Resolution::Min60,
            begin: today,
            end: today,
        };

        // t1 = 10:45: only the 10:30 candle is sealed.
        let first = read(&mut conn, &mut bulk, &intraday, request.clone(), today.and_hms_opt(10, 45, 0).unwrap())
            .await
            .unwrap();
        assert_eq!(first.len(), 4);

        // t2 = 11:31: the 11:30 candle has since sealed too.
        let second = read(&mut conn, &mut bulk, &intraday, request, today.and_hms_opt(11, 31, 0).unwrap())
            .await
            .unwrap();
        assert_eq!(second.len(), 4);

        // Every end_ts from the first read reappears exactly once in the second.
        for c in &first {
            assert_eq!(second.iter().filter(|c2| c2.end_ts == c.end_ts).count(), 1);
        }
        let historical =
            akline_store::historical::query_range(&conn, &symbol, Resolution::Min60, today, today)
                .unwrap();
        assert_eq!(historical.len(), 2);
        assert_eq!(historical[0].end_ts.time(), NaiveTime::from_hms_opt(10, 30, 0).unwrap());
        assert_eq!(historical[1].end_ts.time(), NaiveTime::from_hms_opt(11, 30, 0).unwrap());
    }

    #[tokio::test]
    async fn vendor_unavailable_surfaces_when_a_gap_cannot_be_healed() {
        let mut conn = akline_store::db::open_in_memory().unwrap();
        let symbol: Symbol = "sh.600519".parse().unwrap();
        let mut bulk = MockBulkAdapter::new();
        bulk.fail_login = true;
        let intraday = MockIntradayAdapter::new();

        let request = ReadRequest {
            symbol: symbol.clone(),
            resolution: Resolution::Day,
            begin: d(2024, 1, 2),
            end: d(2024, 1, 5),
        };
        let now = d(2024, 1, 10).and_hms_opt(9, 0, 0).unwrap();

        let err = read(&mut conn, &mut bulk, &intraday, request, now).await.unwrap_err();
        assert!(matches!(err, ReaderError::VendorUnavailable(_)));
    }

    #[tokio::test]
    async fn unsupported_resolution_rejects_weekly_read_of_todays_window() {
        let mut conn = akline_store::db::open_in_memory().unwrap();
        let symbol: Symbol = "sh.600519".parse().unwrap();
        let mut bulk = MockBulkAdapter::new();
        let intraday = MockIntradayAdapter::new();
        let today = d(2025, 12, 22);

        let request = ReadRequest {
            symbol: symbol.clone(),
            resolution: Resolution::Week,
            begin: d(2025, 12, 1),
            end: today,
        };
        let now = today.and_hms_opt(10, 0, 0).unwrap();

        let err = read(&mut conn, &mut bulk, &intraday, request, now).await.unwrap_err();
        assert!(matches!(err, ReaderError::UnsupportedResolution(_)));
    }

    #[tokio::test]
    async fn invariant_merged_output_has_no_duplicate_end_ts_and_is_monotone() {
        let mut conn = akline_store::db::open_in_memory().unwrap();
        let symbol: Symbol = "sh.600519".parse().unwrap();
        let mut bulk = MockBulkAdapter::new();
        let mut intraday = MockIntradayAdapter::new();
        let today = d(2025, 12, 22);

        fn hourly(date: NaiveDate, h: u32, mi: u32) -> Candle {
            Candle {
                symbol: "sh.600519".parse().unwrap(),
                resolution: Resolution::Min60,
                end_ts: Utc.from_utc_datetime(&date.and_hms_opt(h, mi, 0).unwrap()),
                open: 10.0,
                high: 10.5,
                low: 9.8,
                close: 10.2,
                volume: 1_000.0,
                amount: 10_200.0,
                turn: None,
            }
        }

        intraday.seed_stock(
            symbol.clone(),
            Resolution::Min60,
            vec![
                hourly(today, 10, 30),
                hourly(today, 11, 30),
                hourly(today, 14, 0),
                hourly(today, 15, 0),
            ],
        );

        let request = ReadRequest {
            symbol: symbol.clone(),
            resolution: Resolution::Min60,
            begin: today,
            end: today,
        };

        // Run several reads at increasing wall-clock times, as a scheduler
        // would across a trading session, and check the merge invariant
        // (no duplicate end_ts, strictly increasing) holds after each one.
        for now in [
            today.and_hms_opt(9, 0, 0).unwrap(),
            today.and_hms_opt(10, 45, 0).unwrap(),
            today.and_hms_opt(11, 31, 0).unwrap(),
            today.and_hms_opt(14, 5, 0).unwrap(),
            today.and_hms_opt(15, 1, 0).unwrap(),
        ] {
            let result = read(&mut conn, &mut bulk, &intraday, request.clone(), now)
                .await
                .unwrap();
            let mut seen = std::collections::HashSet::new();
            for c in &result {
                assert!(seen.insert(c.end_ts), "duplicate end_ts {} at now={now}", c.end_ts);
            }
            assert!(
                result.windows(2).all(|w| w[0].end_ts < w[1].end_ts),
                "not strictly increasing at now={now}"
            );
        }
    }
}
