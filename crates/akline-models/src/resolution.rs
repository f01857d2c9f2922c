use serde::{Deserialize, Serialize};

/// A candlestick timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Min1,
    Min5,
    Min15,
    Min30,
    Min60,
    Day,
    Week,
    Month,
}

impl Resolution {
    pub fn is_minute(&self) -> bool {
        matches!(
            self,
            Resolution::Min1
                | Resolution::Min5
                | Resolution::Min15
                | Resolution::Min30
                | Resolution::Min60
        )
    }

    /// Minutes per bar for minute resolutions. `None` for day/week/month,
    /// which are not evenly spaced in wall-clock time.
    pub fn minutes(&self) -> Option<i64> {
        match self {
            Resolution::Min1 => Some(1),
            Resolution::Min5 => Some(5),
            Resolution::Min15 => Some(15),
            Resolution::Min30 => Some(30),
            Resolution::Min60 => Some(60),
            Resolution::Day | Resolution::Week | Resolution::Month => None,
        }
    }

    /// Storage table suffix, matching the schema's per-resolution tables.
    pub fn table_suffix(&self) -> &'static str {
        match self {
            Resolution::Min1 => "1min",
            Resolution::Min5 => "5min",
            Resolution::Min15 => "15min",
            Resolution::Min30 => "30min",
            Resolution::Min60 => "60min",
            Resolution::Day => "daily",
            Resolution::Week => "weekly",
            Resolution::Month => "monthly",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minute_resolutions_report_minutes() {
        assert_eq!(Resolution::Min5.minutes(), Some(5));
        assert_eq!(Resolution::Min60.minutes(), Some(60));
        assert!(Resolution::Min1.is_minute());
    }

    #[test]
    fn calendar_resolutions_have_no_minute_count() {
        assert_eq!(Resolution::Day.minutes(), None);
        assert_eq!(Resolution::Week.minutes(), None);
        assert!(!Resolution::Day.is_minute());
    }

    #[test]
    fn table_suffix_is_stable() {
        assert_eq!(Resolution::Day.table_suffix(), "daily");
        assert_eq!(Resolution::Min60.table_suffix(), "60min");
    }

    #[test]
    fn json_uses_snake_case() {
        assert_eq!(
            serde_json::to_string(&Resolution::Min15).unwrap(),
            "\"min15\""
        );
        assert_eq!(serde_json::to_string(&Resolution::Day).unwrap(), "\"day\"");
    }
}
