pub mod calendar;
pub mod clock;

pub use calendar::{is_trading_day, snap, SnapDirection, SUPPORTED_YEAR_RANGE};
pub use clock::{classify, expected_finished_count, ClassifiedCandle};
