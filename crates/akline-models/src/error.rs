use thiserror::Error;

/// Errors raised while constructing or validating a domain value. Every
/// other crate's error enum wraps this one via `#[from]`.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),
    #[error("invalid candle: {0}")]
    InvalidCandle(String),
}
