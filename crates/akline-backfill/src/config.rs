//! `akline-backfill` configuration. Follows `akline_core::config::ReaderConfig`'s
//! `#[serde(default = "fn")]` pattern, extended with the batch-walk
//! knobs the backfill CLI exposes.

use serde::{Deserialize, Serialize};

use akline_models::StoreConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackfillConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub bulk_vendor: BulkVendorConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            bulk_vendor: BulkVendorConfig::default(),
            registry: RegistryConfig::default(),
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
pub struct RegistryConfig {
    #[serde(default = "default_registry_base_url")]
    pub base_url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_registry_base_url(),
        }
    }
}

fn default_registry_base_url() -> String {
    "http://localhost:8400/registry".to_string()
}

/// Options for one `backfill` run, carried separately from
/// `BackfillConfig` since they vary per-invocation rather than per
/// deployment (the CLI flags of `batch_import_all_stocks.py`'s
/// `argparse` block).
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub delay_ms: u64,
    pub max_stocks: Option<usize>,
    pub relogin_interval: usize,
    pub start_index: usize,
}

impl BatchOptions {
    /// `--relogin-interval` and `--delay` defaults come from the
    /// original CLI (`argparse` default `relogin_interval=300`,
    /// `delay=0.5`), not the `BatchStockDataImporter` method's own
    /// defaults (`relogin_interval=50`).
    pub fn new(start_date: chrono::NaiveDate, end_date: chrono::NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            delay_ms: 500,
            max_stocks: None,
            relogin_interval: 300,
            start_index: 0,
        }
    }
}

/// Bulk vendor credentials, read from env vars the way
/// `akline_core::config::bulk_credentials_from_env` does.
pub fn bulk_credentials_from_env() -> Option<akline_vendor::BulkCredentials> {
    let username = std::env::var("BULK_VENDOR_USERNAME").ok()?;
    let password = std::env::var("BULK_VENDOR_PASSWORD").ok()?;
    Some(akline_vendor::BulkCredentials { username, password })
}
