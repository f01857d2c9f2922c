use thiserror::Error;

/// Errors surfaced by the bulk and intraday adapters. The reader and the
/// backfill driver both match on `SessionExpired` to decide whether to
/// retry after a relogin.
#[derive(Debug, Error)]
pub enum VendorError {
    #[error("vendor session expired")]
    SessionExpired,
    #[error("unsupported vendor combination: {0}")]
    Unsupported(String),
    #[error("vendor call timed out after {0}s")]
    Timeout(u64),
    #[error("vendor returned no data")]
    Empty,
    #[error("vendor not authenticated; call login() first")]
    NotAuthenticated,
    #[error("vendor reported an error: {0}")]
    Remote(String),
    #[error("vendor HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Model(#[from] akline_models::ModelError),
}
