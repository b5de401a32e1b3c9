//! Trade log access port trait.

use crate::domain::error::EtfProfitError;
use crate::domain::trade::RawTradeRow;
use std::path::Path;

pub trait TradeLogPort {
    /// Rows in file order. Fails when the file is unreadable or required
    /// columns are missing; row contents are not validated.
    fn load_trades(&self, path: &Path) -> Result<Vec<RawTradeRow>, EtfProfitError>;
}
