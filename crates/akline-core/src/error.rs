use thiserror::Error;

/// Contract-level error returned by [`crate::reader::read`]. Wraps the
/// per-crate error enums of the components the reader orchestrates;
/// lives here rather than in `akline-models` because it composes
/// `StoreError`/`VendorError`, which `akline-models` (a base leaf crate)
/// cannot depend on without a cycle.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("unsupported resolution: {0}")]
    UnsupportedResolution(String),

    #[error("vendor unavailable: {0}")]
    VendorUnavailable(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] akline_store::StoreError),

    /// Carried as a warning by the calendar layer, not raised as a hard
    /// error from `read()`; kept here so the error taxonomy is complete
    /// for callers that want to match on it.
    #[error("calendar out of range: {0}")]
    CalendarOutOfRange(String),
}
