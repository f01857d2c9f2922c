pub mod candle;
pub mod config;
pub mod error;
pub mod resolution;
pub mod schema;
pub mod symbol;
pub mod universe;

pub use candle::Candle;
pub use config::StoreConfig;
pub use error::ModelError;
pub use resolution::Resolution;
pub use symbol::{Market, Symbol};
pub use universe::{SymbolKind, UniverseEntry};
