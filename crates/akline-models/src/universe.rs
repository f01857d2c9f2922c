use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::symbol::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Stock,
    Index,
    Etf,
}

/// A row in the universe registry: everything known about a symbol that
/// isn't an OHLCV observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseEntry {
    pub symbol: Symbol,
    pub name: String,
    pub kind: SymbolKind,
    pub list_date: Option<NaiveDate>,
    pub pinyin: String,
    pub pinyin_initials: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_universe_entry() {
        let entry = UniverseEntry {
            symbol: "sh.600519".parse().unwrap(),
            name: "贵州茅台".to_string(),
            kind: SymbolKind::Stock,
            list_date: NaiveDate::from_ymd_opt(2001, 8, 27),
            pinyin: "guizhoumaotai".to_string(),
            pinyin_initials: "gzmt".to_string(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: UniverseEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, back);
    }

    #[test]
    fn kind_uses_snake_case() {
        assert_eq!(
            serde_json::to_string(&SymbolKind::Etf).unwrap(),
            "\"etf\""
        );
    }
}
