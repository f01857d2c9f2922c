pub mod db;
pub mod error;
pub mod historical;
pub mod intraday;
pub mod universe;

pub use db::{historical_table_name, open, open_in_memory};
pub use error::StoreError;
