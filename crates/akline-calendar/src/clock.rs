//! A-share session clock: classifies "now" against a resolution's
//! candle grid and reports whether the current candle is sealed.
//!
//! Every PRC exchange publishes the same two session windows: morning
//! 09:30–11:30, afternoon 13:00–15:00 (240 trading minutes a day).
//! Minute bars never straddle the midday break; day/week/month bars
//! close at the afternoon session's end, 15:00.

use akline_models::Resolution;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

pub const MORNING_START: (u32, u32) = (9, 30);
pub const MORNING_END: (u32, u32) = (11, 30);
pub const AFTERNOON_START: (u32, u32) = (13, 0);
pub const AFTERNOON_END: (u32, u32) = (15, 0);

/// Total trading minutes in one session day.
pub const TRADING_MINUTES_PER_DAY: i64 = 240;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedCandle {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub sealed: bool,
}

fn at(date: NaiveDate, hm: (u32, u32)) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(hm.0, hm.1, 0).unwrap())
}

struct Sessions {
    morning_start: NaiveDateTime,
    morning_end: NaiveDateTime,
    afternoon_start: NaiveDateTime,
    afternoon_end: NaiveDateTime,
}

fn sessions_for(date: NaiveDate) -> Sessions {
    Sessions {
        morning_start: at(date, MORNING_START),
        morning_end: at(date, MORNING_END),
        afternoon_start: at(date, AFTERNOON_START),
        afternoon_end: at(date, AFTERNOON_END),
    }
}

/// Classifies `now` (a local PRC wall-clock timestamp) against
/// `resolution`'s candle grid.
///
/// Four cases, matching the original system's realtime updater:
/// - before the open: the first candle of the day, unsealed.
/// - mid-candle: the candle containing `now`, unsealed.
/// - the midday break: the last morning candle, sealed.
/// - after the close: the last candle of the day, sealed.
pub fn classify(resolution: Resolution, now: NaiveDateTime) -> ClassifiedCandle {
    let s = sessions_for(now.date());

    match resolution.minutes() {
        None => ClassifiedCandle {
            start: s.morning_start,
            end: s.afternoon_end,
            sealed: now >= s.afternoon_end,
        },
        Some(m) => classify_minute(m, now, &s),
    }
}

fn classify_minute(m: i64, now: NaiveDateTime, s: &Sessions) -> ClassifiedCandle {
    let step = Duration::minutes(m);

    if now < s.morning_start {
        return ClassifiedCandle {
            start: s.morning_start,
            end: s.morning_start + step,
            sealed: false,
        };
    }

    if now <= s.morning_end {
        return bar_within(now, s.morning_start, s.morning_end, step);
    }

    if now < s.afternoon_start {
        return ClassifiedCandle {
            start: s.morning_end - step,
            end: s.morning_end,
            sealed: true,
        };
    }

    if now <= s.afternoon_end {
        return bar_within(now, s.afternoon_start, s.afternoon_end, step);
    }

    ClassifiedCandle {
        start: s.afternoon_end - step,
        end: s.afternoon_end,
        sealed: true,
    }
}

fn bar_within(
    now: NaiveDateTime,
    session_start: NaiveDateTime,
    session_end: NaiveDateTime,
    step: Duration,
) -> ClassifiedCandle {
    let elapsed = (now - session_start).num_minutes();
    let step_minutes = step.num_minutes().max(1);
    let idx = elapsed / step_minutes;
    let mut start = session_start + Duration::minutes(idx * step_minutes);
    let mut end = start + step;
    if end > session_end {
        end = session_end;
        start = end - step;
    }
    ClassifiedCandle {
        start,
        end,
        sealed: now >= end,
    }
}

/// Number of sealed candles of `resolution` expected to exist by `now`.
/// Used by the intraday router's freshness check so it can skip a
/// vendor call when the store already has everything that should have
/// sealed so far.
pub fn expected_finished_count(resolution: Resolution, now: NaiveDateTime) -> u32 {
    let s = sessions_for(now.date());
    match resolution.minutes() {
        None => {
            if now >= s.afternoon_end {
                1
            } else {
                0
            }
        }
        Some(m) => {
            let morning_elapsed = clamp_elapsed(now, s.morning_start, s.morning_end);
            let afternoon_elapsed = clamp_elapsed(now, s.afternoon_start, s.afternoon_end);
            ((morning_elapsed / m) + (afternoon_elapsed / m)) as u32
        }
    }
}

fn clamp_elapsed(now: NaiveDateTime, start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    if now <= start {
        0
    } else if now >= end {
        (end - start).num_minutes()
    } else {
        (now - start).num_minutes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn pre_open_returns_first_candle_unsealed() {
        let c = classify(Resolution::Min5, dt(9, 0));
        assert_eq!(c.start, dt(9, 30));
        assert_eq!(c.end, dt(9, 35));
        assert!(!c.sealed);
    }

    #[test]
    fn mid_candle_returns_forming_bar() {
        let c = classify(Resolution::Min5, dt(9, 42));
        assert_eq!(c.start, dt(9, 40));
        assert_eq!(c.end, dt(9, 45));
        assert!(!c.sealed);
    }

    #[test]
    fn midday_break_returns_last_morning_candle_sealed() {
        let c = classify(Resolution::Min5, dt(12, 0));
        assert_eq!(c.end, dt(11, 30));
        assert!(c.sealed);
    }

    #[test]
    fn post_close_returns_last_candle_sealed() {
        let c = classify(Resolution::Min30, dt(16, 0));
        assert_eq!(c.end, dt(15, 0));
        assert!(c.sealed);
    }

    #[test]
    fn day_resolution_seals_only_after_close() {
        let forming = classify(Resolution::Day, dt(10, 0));
        assert!(!forming.sealed);
        let sealed = classify(Resolution::Day, dt(15, 0));
        assert!(sealed.sealed);
    }

    #[test]
    fn expected_finished_count_matches_five_minute_grid() {
        // 11:00 is 90 minutes into the morning session -> 18 finished 5-min bars.
        assert_eq!(expected_finished_count(Resolution::Min5, dt(11, 0)), 18);
    }

    #[test]
    fn expected_finished_count_full_day_for_sixty_minute() {
        assert_eq!(expected_finished_count(Resolution::Min60, dt(16, 0)), 4);
    }
}
