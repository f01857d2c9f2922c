//! Bulk-history vendor adapter. Session-authenticated, rate-limited,
//! single concurrent session per process — callers serialize access the
//! way the backfill driver and the reader both do.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;

use akline_models::{Candle, Resolution, Symbol};

use crate::adjustment::Adjustment;
use crate::error::VendorError;

/// Default per-call timeout.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Strings the vendor's own error messages use to report a dead session.
const SESSION_EXPIRED_MARKERS: [&str; 3] = ["登录", "login", "session"];

pub fn looks_like_session_expired(message: &str) -> bool {
    let lower = message.to_lowercase();
    SESSION_EXPIRED_MARKERS
        .iter()
        .any(|marker| lower.contains(&marker.to_lowercase()))
}

/// `login`/`logout`/`fetch` all take `&mut self`: the adapter is not
/// thread-safe, so a caller serializes access itself (a mutex-guarded
/// single instance, or a channel-fed worker).
#[async_trait]
pub trait BulkHistoryAdapter: Send {
    async fn login(&mut self) -> Result<(), VendorError>;
    async fn logout(&mut self) -> Result<(), VendorError>;
    fn is_authenticated(&self) -> bool;

    async fn fetch(
        &mut self,
        symbol: &Symbol,
        resolution: Resolution,
        begin: NaiveDate,
        end: NaiveDate,
        adjustment: Adjustment,
    ) -> Result<Vec<Candle>, VendorError>;
}

/// Credentials for the bulk vendor's session login. Read from env vars
/// by the binaries, not by this crate directly.
#[derive(Debug, Clone)]
pub struct BulkCredentials {
    pub username: String,
    pub password: String,
}

/// HTTP-backed bulk adapter: a plain `reqwest::Client` against the
/// vendor's login/history endpoints.
pub struct HttpBulkAdapter {
    http: reqwest::Client,
    base_url: String,
    credentials: BulkCredentials,
    session_token: Option<String>,
    call_timeout: Duration,
}

impl HttpBulkAdapter {
    pub fn new(base_url: impl Into<String>, credentials: BulkCredentials) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            credentials,
            session_token: None,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    fn session_header(&self) -> Result<&str, VendorError> {
        self.session_token
            .as_deref()
            .ok_or(VendorError::NotAuthenticated)
    }
}

#[async_trait]
impl BulkHistoryAdapter for HttpBulkAdapter {
    async fn login(&mut self) -> Result<(), VendorError> {
        #[derive(serde::Deserialize)]
        struct LoginResponse {
            session_token: String,
        }

        let request = self
            .http
            .post(format!("{}/login", self.base_url))
            .json(&serde_json::json!({
                "username": self.credentials.username,
                "password": self.credentials.password,
            }))
            .send();

        let response = tokio::time::timeout(self.call_timeout, request)
            .await
            .map_err(|_| VendorError::Timeout(self.call_timeout.as_secs()))??
            .error_for_status()?
            .json::<LoginResponse>()
            .await?;

        self.session_token = Some(response.session_token);
        tracing::info!("bulk vendor session established");
        Ok(())
    }

    async fn logout(&mut self) -> Result<(), VendorError> {
        if let Some(token) = self.session_token.take() {
            let request = self
                .http
                .post(format!("{}/logout", self.base_url))
                .bearer_auth(token)
                .send();
            let _ = tokio::time::timeout(self.call_timeout, request).await;
            tracing::info!("bulk vendor session closed");
        }
        Ok(())
    }

    fn is_authenticated(&self) -> bool {
        self.session_token.is_some()
    }

    async fn fetch(
        &mut self,
        symbol: &Symbol,
        resolution: Resolution,
        begin: NaiveDate,
        end: NaiveDate,
        adjustment: Adjustment,
    ) -> Result<Vec<Candle>, VendorError> {
        let token = self.session_header()?.to_string();

        #[derive(serde::Deserialize)]
        struct Row {
            end_ts: chrono::DateTime<chrono::Utc>,
            open: f64,
            high: f64,
            low: f64,
            close: f64,
            volume: f64,
            amount: f64,
            turn: Option<f64>,
        }
        #[derive(serde::Deserialize)]
        struct FetchResponse {
            rows: Vec<Row>,
        }

        let request = self
            .http
            .get(format!("{}/history", self.base_url))
            .bearer_auth(&token)
            .query(&[
                ("code", symbol.to_string()),
                ("frequency", resolution.table_suffix().to_string()),
                ("start_date", begin.to_string()),
                ("end_date", end.to_string()),
                ("adjustflag", adjustment.vendor_flag().to_string()),
            ])
            .send();

        let response = tokio::time::timeout(self.call_timeout, request)
            .await
            .map_err(|_| VendorError::Timeout(self.call_timeout.as_secs()))?;

        let response = match response {
            Ok(resp) => resp,
            Err(err) => return Err(VendorError::Http(err)),
        };

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.session_token = None;
            return Err(VendorError::SessionExpired);
        }

        // The vendor doesn't only signal a dead session with 401: it also
        // sometimes answers 200 with a login-prompt body. Check the raw
        // text for the same markers before trying to parse it as rows.
        let status = response.status();
        let text = response.text().await.map_err(VendorError::Http)?;
        if looks_like_session_expired(&text) {
            self.session_token = None;
            return Err(VendorError::SessionExpired);
        }
        if !status.is_success() {
            return Err(VendorError::Remote(text));
        }

        let body: FetchResponse = serde_json::from_str(&text)
            .map_err(|err| VendorError::Remote(format!("malformed response: {err}")))?;
        if body.rows.is_empty() {
            return Err(VendorError::Empty);
        }

        let candles = body
            .rows
            .into_iter()
            .map(|row| Candle {
                symbol: symbol.clone(),
                resolution,
                end_ts: row.end_ts,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
                amount: row.amount,
                turn: row.turn,
            })
            .collect();
        Ok(candles)
    }
}

/// In-memory adapter used by reader/backfill tests. Tracks login/logout
/// call counts so scenario S6 (session rotation) can assert on them.
pub struct MockBulkAdapter {
    authenticated: bool,
    pub login_calls: u32,
    pub logout_calls: u32,
    rows: std::collections::HashMap<(Symbol, Resolution), Vec<Candle>>,
    pub fail_symbols: std::collections::HashSet<Symbol>,
    /// Makes every `login()` call fail, simulating a vendor outage that
    /// a relogin can't recover from.
    pub fail_login: bool,
}

impl MockBulkAdapter {
    pub fn new() -> Self {
        Self {
            authenticated: false,
            login_calls: 0,
            logout_calls: 0,
            rows: std::collections::HashMap::new(),
            fail_symbols: std::collections::HashSet::new(),
            fail_login: false,
        }
    }

    pub fn seed(&mut self, symbol: Symbol, resolution: Resolution, candles: Vec<Candle>) {
        self.rows.insert((symbol, resolution), candles);
    }

    pub fn fail_for(&mut self, symbol: Symbol) {
        self.fail_symbols.insert(symbol);
    }
}

impl Default for MockBulkAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BulkHistoryAdapter for MockBulkAdapter {
    async fn login(&mut self) -> Result<(), VendorError> {
        self.login_calls += 1;
        if self.fail_login {
            return Err(VendorError::Timeout(1));
        }
        self.authenticated = true;
        Ok(())
    }

    async fn logout(&mut self) -> Result<(), VendorError> {
        self.logout_calls += 1;
        self.authenticated = false;
        Ok(())
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    async fn fetch(
        &mut self,
        symbol: &Symbol,
        resolution: Resolution,
        begin: NaiveDate,
        end: NaiveDate,
        _adjustment: Adjustment,
    ) -> Result<Vec<Candle>, VendorError> {
        if !self.authenticated {
            return Err(VendorError::NotAuthenticated);
        }
        if self.fail_symbols.contains(symbol) {
            return Err(VendorError::Empty);
        }
        let candles = self
            .rows
            .get(&(symbol.clone(), resolution))
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|c| {
                let d = c.end_ts.date_naive();
                d >= begin && d <= end
            })
            .collect::<Vec<_>>();
        if candles.is_empty() {
            return Err(VendorError::Empty);
        }
        Ok(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample(symbol: &str, date: NaiveDate) -> Candle {
        Candle {
            symbol: symbol.parse().unwrap(),
            resolution: Resolution::Day,
            end_ts: Utc.from_utc_datetime(&date.and_hms_opt(15, 0, 0).unwrap()),
            open: 10.0,
            high: 11.0,
            low: 9.5,
            close: 10.5,
            volume: 1_000.0,
            amount: 10_500.0,
            turn: Some(1.1),
        }
    }

    #[test]
    fn session_expired_markers_detect_chinese_and_english() {
        assert!(looks_like_session_expired("用户未登录"));
        assert!(looks_like_session_expired("Login required"));
        assert!(!looks_like_session_expired("unknown field"));
    }

    #[tokio::test]
    async fn mock_adapter_requires_login_before_fetch() {
        let mut adapter = MockBulkAdapter::new();
        let symbol: Symbol = "sh.600519".parse().unwrap();
        let result = adapter
            .fetch(
                &symbol,
                Resolution::Day,
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                Adjustment::Forward,
            )
            .await;
        assert!(matches!(result, Err(VendorError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn mock_adapter_filters_by_date_range() {
        let mut adapter = MockBulkAdapter::new();
        let symbol: Symbol = "sh.600519".parse().unwrap();
        adapter.seed(
            symbol.clone(),
            Resolution::Day,
            vec![
                sample("sh.600519", NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
                sample("sh.600519", NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()),
            ],
        );
        adapter.login().await.unwrap();

        let rows = adapter
            .fetch(
                &symbol,
                Resolution::Day,
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                Adjustment::Forward,
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }
}
