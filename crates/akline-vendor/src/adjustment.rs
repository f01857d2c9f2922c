use serde::{Deserialize, Serialize};

/// Price-adjustment mode requested from the bulk vendor. Maps onto the
/// vendor's `adjustflag` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    /// Forward-adjusted (前复权). Default for reads.
    Forward,
    /// Back-adjusted (后复权).
    Back,
    /// Unadjusted raw prices.
    None,
}

impl Adjustment {
    pub fn vendor_flag(&self) -> &'static str {
        match self {
            Adjustment::Forward => "2",
            Adjustment::Back => "1",
            Adjustment::None => "3",
        }
    }
}

impl Default for Adjustment {
    fn default() -> Self {
        Adjustment::Forward
    }
}
