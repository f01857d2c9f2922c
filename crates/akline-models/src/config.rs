use serde::{Deserialize, Serialize};

/// Storage connection parameters, shared by every crate that opens the
/// SQLite store. Every field has a named default function so a partial
/// TOML file is still valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Busy-wait timeout in milliseconds before a write gives up on a lock.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_db_path() -> String {
    "data/akline.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}
