pub mod adjustment;
pub mod bulk;
pub mod error;
pub mod intraday;

pub use adjustment::Adjustment;
pub use bulk::{BulkCredentials, BulkHistoryAdapter, HttpBulkAdapter, MockBulkAdapter};
pub use error::VendorError;
pub use intraday::{HttpIntradayAdapter, IntradayAdapter, MockIntradayAdapter};
