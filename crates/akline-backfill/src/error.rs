use thiserror::Error;

use akline_store::error::StoreError;
use akline_vendor::VendorError;

#[derive(Error, Debug)]
pub enum BackfillError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("vendor error: {0}")]
    Vendor(#[from] VendorError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

