use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Market a symbol trades on, taken from the `{market}.` code prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    Sh,
    Sz,
    Bj,
}

impl Market {
    fn as_str(&self) -> &'static str {
        match self {
            Market::Sh => "sh",
            Market::Sz => "sz",
            Market::Bj => "bj",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated `{market}.{digits}` instrument code, e.g. `sh.600519`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol {
    market: Market,
    code: String,
}

impl Symbol {
    pub fn market(&self) -> Market {
        self.market
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Structural index check used when the universe registry has no row
    /// for this symbol yet: `sh.000*` and `sz.399*` are index codes.
    pub fn is_index(&self) -> bool {
        match self.market {
            Market::Sh => self.code.starts_with("000"),
            Market::Sz => self.code.starts_with("399"),
            Market::Bj => false,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.market, self.code)
    }
}

impl FromStr for Symbol {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (market_str, code) = s
            .split_once('.')
            .ok_or_else(|| ModelError::InvalidSymbol(s.to_string()))?;

        let market = match market_str {
            "sh" => Market::Sh,
            "sz" => Market::Sz,
            "bj" => Market::Bj,
            _ => return Err(ModelError::InvalidSymbol(s.to_string())),
        };

        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(ModelError::InvalidSymbol(s.to_string()));
        }

        Ok(Symbol {
            market,
            code: code.to_string(),
        })
    }
}

impl TryFrom<String> for Symbol {
    type Error = ModelError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Symbol> for String {
    fn from(s: Symbol) -> String {
        s.to_string()
    }
}
