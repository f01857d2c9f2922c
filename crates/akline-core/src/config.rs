//! `akline` CLI configuration. Follows `akline_models::StoreConfig`'s
//! `#[serde(default = "fn")]` pattern, extended with the vendor base
//! URLs this binary needs to build its adapters.

use serde::{Deserialize, Serialize};

use akline_models::StoreConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReaderConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub bulk_vendor: BulkVendorConfig,
    #[serde(default)]
    pub intraday_vendor: IntradayVendorConfig,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            bulk_vendor: BulkVendorConfig::default(),
            intraday_vendor: IntradayVendorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkVendorConfig {
    #[serde(default = "default_bulk_base_url")]
    pub base_url: String,
}

impl Default for BulkVendorConfig {
    fn default() -> Self {
        Self {
            base_url: default_bulk_base_url(),
        }
    }
}

fn default_bulk_base_url() -> String {
    "http://localhost:8400/bulk".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntradayVendorConfig {
    #[serde(default = "default_intraday_base_url")]
    pub base_url: String,
}

impl Default for IntradayVendorConfig {
    fn default() -> Self {
        Self {
            base_url: default_intraday_base_url(),
        }
    }
}

fn default_intraday_base_url() -> String {
    "http://localhost:8400/intraday".to_string()
}

/// Bulk vendor credentials, read from env vars the way
/// `market_data.rs`'s Alpaca provider reads `ALPACA_API_KEY_ID`.
pub fn bulk_credentials_from_env() -> Option<akline_vendor::BulkCredentials> {
    let username = std::env::var("BULK_VENDOR_USERNAME").ok()?;
    let password = std::env::var("BULK_VENDOR_PASSWORD").ok()?;
    Some(akline_vendor::BulkCredentials { username, password })
}
