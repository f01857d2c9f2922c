//! Intraday vendor adapter. Stateless per call, no session. Two entry
//! points — stocks and indices — since the vendor serves day-resolution
//! and minute-resolution candles from distinct endpoints, and minute
//! bars report volume in lots rather than shares.

use async_trait::async_trait;
use std::time::Duration;

use akline_models::{Candle, Resolution, Symbol};

use crate::adjustment::Adjustment;
use crate::bulk::DEFAULT_CALL_TIMEOUT;
use crate::error::VendorError;

/// The intraday vendor reports lot counts, not share counts, for minute
/// bars; one lot is 100 shares on PRC exchanges.
pub const LOTS_TO_SHARES: f64 = 100.0;

#[async_trait]
pub trait IntradayAdapter: Send + Sync {
    /// Fetches today's candles for a stock. `resolution::Day` uses a
    /// distinct vendor endpoint from the minute resolutions.
    async fn fetch_stock(
        &self,
        symbol: &Symbol,
        resolution: Resolution,
        adjustment: Adjustment,
    ) -> Result<Vec<Candle>, VendorError>;

    /// Fetches today's candles for an index. Minute resolutions are
    /// unsupported for indices: logs and returns
    /// `Err(VendorError::Unsupported)`, which callers treat as an empty,
    /// non-fatal result.
    async fn fetch_index(
        &self,
        symbol: &Symbol,
        resolution: Resolution,
    ) -> Result<Vec<Candle>, VendorError>;
}

pub struct HttpIntradayAdapter {
    http: reqwest::Client,
    base_url: String,
    call_timeout: Duration,
}

impl HttpIntradayAdapter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    async fn fetch_rows(
        &self,
        symbol: &Symbol,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<RawRow>, VendorError> {
        #[derive(serde::Deserialize)]
        struct Response {
            rows: Vec<RawRow>,
        }

        let request = self
            .http
            .get(format!("{}/{endpoint}", self.base_url))
            .query(query)
            .send();

        let response = tokio::time::timeout(self.call_timeout, request)
            .await
            .map_err(|_| VendorError::Timeout(self.call_timeout.as_secs()))??;

        let body = response.error_for_status()?.json::<Response>().await?;
        if body.rows.is_empty() {
            tracing::warn!(symbol = %symbol, "intraday vendor returned no rows");
            return Ok(Vec::new());
        }
        Ok(body.rows)
    }
}

#[derive(serde::Deserialize)]
struct RawRow {
    end_ts: chrono::DateTime<chrono::Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    /// Volume in lots (100-share units) for minute bars, already in
    /// shares for the daily endpoint.
    volume: f64,
    amount: f64,
    turn: Option<f64>,
}

fn row_to_candle(symbol: &Symbol, resolution: Resolution, row: RawRow, volume_in_lots: bool) -> Candle {
    Candle {
        symbol: symbol.clone(),
        resolution,
        end_ts: row.end_ts,
        open: row.open,
        high: row.high,
        low: row.low,
        close: row.close,
        volume: if volume_in_lots {
            row.volume * LOTS_TO_SHARES
        } else {
            row.volume
        },
        amount: row.amount,
        turn: row.turn,
    }
}

#[async_trait]
impl IntradayAdapter for HttpIntradayAdapter {
    async fn fetch_stock(
        &self,
        symbol: &Symbol,
        resolution: Resolution,
        adjustment: Adjustment,
    ) -> Result<Vec<Candle>, VendorError> {
        if resolution.is_minute() {
            let rows = self
                .fetch_rows(
                    symbol,
                    "minute",
                    &[
                        ("code", symbol.code().to_string()),
                        ("period", resolution.minutes().unwrap().to_string()),
                        ("adjust", adjustment.vendor_flag().to_string()),
                    ],
                )
                .await?;
            Ok(rows
                .into_iter()
                .map(|r| row_to_candle(symbol, resolution, r, true))
                .collect())
        } else {
            let rows = self
                .fetch_rows(
                    symbol,
                    "daily",
                    &[
                        ("code", symbol.code().to_string()),
                        ("adjust", adjustment.vendor_flag().to_string()),
                    ],
                )
                .await?;
            Ok(rows
                .into_iter()
                .map(|r| row_to_candle(symbol, resolution, r, false))
                .collect())
        }
    }

    async fn fetch_index(
        &self,
        symbol: &Symbol,
        resolution: Resolution,
    ) -> Result<Vec<Candle>, VendorError> {
        if resolution.is_minute() {
            tracing::info!(symbol = %symbol, ?resolution, "intraday minute bars unsupported for indices");
            return Err(VendorError::Unsupported(format!(
                "index minute bars unsupported: {symbol} {resolution:?}"
            )));
        }
        let rows = self
            .fetch_rows(symbol, "index-daily", &[("code", symbol.code().to_string())])
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| row_to_candle(symbol, resolution, r, false))
            .collect())
    }
}

/// In-memory adapter used by router/reader tests.
pub struct MockIntradayAdapter {
    stock_rows: std::collections::HashMap<(Symbol, Resolution), Vec<Candle>>,
    index_rows: std::collections::HashMap<(Symbol, Resolution), Vec<Candle>>,
}

impl MockIntradayAdapter {
    pub fn new() -> Self {
        Self {
            stock_rows: std::collections::HashMap::new(),
            index_rows: std::collections::HashMap::new(),
        }
    }

    pub fn seed_stock(&mut self, symbol: Symbol, resolution: Resolution, candles: Vec<Candle>) {
        self.stock_rows.insert((symbol, resolution), candles);
    }

    pub fn seed_index(&mut self, symbol: Symbol, resolution: Resolution, candles: Vec<Candle>) {
        self.index_rows.insert((symbol, resolution), candles);
    }
}

impl Default for MockIntradayAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntradayAdapter for MockIntradayAdapter {
    async fn fetch_stock(
        &self,
        symbol: &Symbol,
        resolution: Resolution,
        _adjustment: Adjustment,
    ) -> Result<Vec<Candle>, VendorError> {
        Ok(self
            .stock_rows
            .get(&(symbol.clone(), resolution))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_index(
        &self,
        symbol: &Symbol,
        resolution: Resolution,
    ) -> Result<Vec<Candle>, VendorError> {
        if resolution.is_minute() {
            return Err(VendorError::Unsupported(format!(
                "index minute bars unsupported: {symbol} {resolution:?}"
            )));
        }
        Ok(self
            .index_rows
            .get(&(symbol.clone(), resolution))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn candle(symbol: &str, hour: u32, minute: u32) -> Candle {
        Candle {
            symbol: symbol.parse().unwrap(),
            resolution: Resolution::Min5,
            end_ts: Utc
                .with_ymd_and_hms(2025, 12, 22, hour, minute, 0)
                .unwrap(),
            open: 10.0,
            high: 10.2,
            low: 9.9,
            close: 10.1,
            volume: 500.0,
            amount: 5_050.0,
            turn: None,
        }
    }

    #[tokio::test]
    async fn mock_index_minute_is_unsupported() {
        let adapter = MockIntradayAdapter::new();
        let symbol: Symbol = "sh.000001".parse().unwrap();
        let result = adapter.fetch_index(&symbol, Resolution::Min5).await;
        assert!(matches!(result, Err(VendorError::Unsupported(_))));
    }

    #[tokio::test]
    async fn mock_stock_returns_seeded_rows() {
        let mut adapter = MockIntradayAdapter::new();
        let symbol: Symbol = "sh.600519".parse().unwrap();
        adapter.seed_stock(
            symbol.clone(),
            Resolution::Min5,
            vec![candle("sh.600519", 9, 35)],
        );
        let rows = adapter
            .fetch_stock(&symbol, Resolution::Min5, Adjustment::Forward)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }
}
