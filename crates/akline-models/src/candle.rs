use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::resolution::Resolution;
use crate::symbol::Symbol;

/// An immutable OHLCV bar. `end_ts` is the canonical instant the bar
/// closes at: for day/week/month bars this is pinned to 15:00 (session
/// close) of the session date, never midnight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: Symbol,
    pub resolution: Resolution,
    pub end_ts: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub amount: f64,
    /// Turnover rate, percent. Not reported by every vendor.
    pub turn: Option<f64>,
}

impl Candle {
    /// Checks the OHLC-ordering and non-negativity invariants. Vendor
    /// adapters call this on every row before it reaches the store so a
    /// malformed upstream row never gets written.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.high < self.low {
            return Err(ModelError::InvalidCandle(format!(
                "{} {:?}: high {} < low {}",
                self.symbol, self.resolution, self.high, self.low
            )));
        }
        if self.open > self.high || self.open < self.low {
            return Err(ModelError::InvalidCandle(format!(
                "{} {:?}: open {} outside [{}, {}]",
                self.symbol, self.resolution, self.open, self.low, self.high
            )));
        }
        if self.close > self.high || self.close < self.low {
            return Err(ModelError::InvalidCandle(format!(
                "{} {:?}: close {} outside [{}, {}]",
                self.symbol, self.resolution, self.close, self.low, self.high
            )));
        }
        if self.volume < 0.0 || self.amount < 0.0 {
            return Err(ModelError::InvalidCandle(format!(
                "{} {:?}: negative volume/amount",
                self.symbol, self.resolution
            )));
        }
        Ok(())
    }
}
