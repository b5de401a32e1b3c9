//! Trade log rows, instrument keys and the typed trade replayed by a ledger.

use chrono::NaiveDateTime;
use std::fmt;

/// Header columns every trade log must carry.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "date",
    "etf_name",
    "symbol",
    "price",
    "qty",
    "side",
    "reason",
    "zone",
    "pos_after",
];

/// Reason/zone label used when the log leaves the field empty.
pub const UNKNOWN_LABEL: &str = "UNKNOWN";

/// One trade log row, fields exactly as read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTradeRow {
    /// 1-based line number in the source file (header is line 1).
    pub line: u64,
    pub date: String,
    pub etf_name: String,
    pub symbol: String,
    pub price: String,
    pub qty: String,
    pub side: String,
    pub reason: String,
    pub zone: String,
    pub pos_after: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Case-insensitive, whitespace-tolerant parse of `BUY` / `SELL`.
    pub fn parse(raw: &str) -> Option<Side> {
        match raw.trim().to_uppercase().as_str() {
            "BUY" => Some(Side::Buy),
            "SELL" => Some(Side::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Identifies one ledger. Trimmed, original casing kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrumentKey {
    pub name: String,
    pub symbol: String,
}

impl InstrumentKey {
    pub fn new(name: &str, symbol: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            symbol: symbol.trim().to_string(),
        }
    }

    pub fn from_row(row: &RawTradeRow) -> Self {
        Self::new(&row.etf_name, &row.symbol)
    }
}

impl fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.symbol)
    }
}

/// Why a row could not be turned into a [`Trade`].
#[derive(Debug, Clone, PartialEq)]
pub enum RowIssue {
    UnknownSide(String),
    BadQuantity(String),
    NegativeQuantity(i64),
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowIssue::UnknownSide(side) => write!(f, "unrecognized side {side:?}"),
            RowIssue::BadQuantity(qty) => write!(f, "unparsable qty {qty:?}"),
            RowIssue::NegativeQuantity(qty) => write!(f, "negative qty {qty}"),
        }
    }
}

/// A coerced trade ready for ledger replay.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub key: InstrumentKey,
    pub line: u64,
    pub timestamp: Option<NaiveDateTime>,
    pub side: Side,
    pub price: f64,
    pub qty: i64,
    pub reason: String,
    pub zone: String,
    pub pos_after: Option<i64>,
    /// The price cell did not parse and was replaced by `0.0`.
    pub price_defaulted: bool,
}

impl Trade {
    /// Coerce a raw row. A bad price degrades to `0.0`; a bad side or
    /// quantity rejects the row.
    pub fn from_row(
        row: &RawTradeRow,
        timestamp: Option<NaiveDateTime>,
    ) -> Result<Trade, RowIssue> {
        let side = Side::parse(&row.side).ok_or_else(|| RowIssue::UnknownSide(row.side.clone()))?;
        let qty = parse_quantity(&row.qty).ok_or_else(|| RowIssue::BadQuantity(row.qty.clone()))?;
        if qty < 0 {
            return Err(RowIssue::NegativeQuantity(qty));
        }

        let (price, price_defaulted) = match parse_price(&row.price) {
            Some(p) => (p, false),
            None => (0.0, true),
        };

        Ok(Trade {
            key: InstrumentKey::from_row(row),
            line: row.line,
            timestamp,
            side,
            price,
            qty,
            reason: row.reason.trim().to_uppercase(),
            zone: row.zone.trim().to_string(),
            pos_after: parse_quantity(&row.pos_after),
            price_defaulted,
        })
    }

    pub fn amount(&self) -> f64 {
        self.price * self.qty as f64
    }

    pub fn reason_label(&self) -> &str {
        if self.reason.is_empty() {
            UNKNOWN_LABEL
        } else {
            &self.reason
        }
    }

    pub fn zone_label(&self) -> &str {
        if self.zone.is_empty() {
            UNKNOWN_LABEL
        } else {
            &self.zone
        }
    }
}

fn parse_price(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|p| p.is_finite())
}

/// `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
const QUANTITY_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// Parse as a float, then truncate toward zero (`"100.7"` is 100 units).
/// Values outside the `i64` range are rejected rather than saturated.
pub fn parse_quantity(raw: &str) -> Option<i64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .map(f64::trunc)
        .filter(|q| q.is_finite() && *q < QUANTITY_LIMIT && *q >= -QUANTITY_LIMIT)
        .map(|q| q as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(side: &str, price: &str, qty: &str) -> RawTradeRow {
        RawTradeRow {
            line: 2,
            date: "2024-01-02 10:00:00".into(),
            etf_name: " 红利ETF ".into(),
            symbol: "SH510880".into(),
            price: price.into(),
            qty: qty.into(),
            side: side.into(),
            reason: " box_grid_buy ".into(),
            zone: " 150_120 ".into(),
            pos_after: "100".into(),
        }
    }

    #[test]
    fn side_parse_is_case_insensitive() {
        assert_eq!(Side::parse("buy"), Some(Side::Buy));
        assert_eq!(Side::parse(" Sell "), Some(Side::Sell));
        assert_eq!(Side::parse("HOLD"), None);
        assert_eq!(Side::parse(""), None);
    }

    #[test]
    fn instrument_key_trims_but_keeps_case() {
        let key = InstrumentKey::new("  Dividend ETF ", " sh510880");
        assert_eq!(key.name, "Dividend ETF");
        assert_eq!(key.symbol, "sh510880");
        assert_eq!(key.to_string(), "Dividend ETF (sh510880)");
    }

    #[test]
    fn from_row_normalizes_fields() {
        let trade = Trade::from_row(&row("buy", "3.125", "100"), None).unwrap();
        assert_eq!(trade.side, Side::Buy);
        assert_eq!(trade.key.name, "红利ETF");
        assert_eq!(trade.reason, "BOX_GRID_BUY");
        assert_eq!(trade.zone, "150_120");
        assert_eq!(trade.qty, 100);
        assert_eq!(trade.pos_after, Some(100));
        assert!((trade.price - 3.125).abs() < f64::EPSILON);
        assert!(!trade.price_defaulted);
    }

    #[test]
    fn from_row_truncates_fractional_quantity() {
        let trade = Trade::from_row(&row("BUY", "1.0", "100.9"), None).unwrap();
        assert_eq!(trade.qty, 100);
    }

    #[test]
    fn from_row_defaults_bad_price_to_zero() {
        let trade = Trade::from_row(&row("SELL", "n/a", "10"), None).unwrap();
        assert_eq!(trade.price, 0.0);
        assert!(trade.price_defaulted);
    }

    #[test]
    fn from_row_rejects_unknown_side() {
        let err = Trade::from_row(&row("HOLD", "1.0", "10"), None).unwrap_err();
        assert_eq!(err, RowIssue::UnknownSide("HOLD".into()));
    }

    #[test]
    fn from_row_rejects_bad_and_negative_quantity() {
        assert_eq!(
            Trade::from_row(&row("BUY", "1.0", "ten"), None).unwrap_err(),
            RowIssue::BadQuantity("ten".into())
        );
        assert_eq!(
            Trade::from_row(&row("BUY", "1.0", "-5"), None).unwrap_err(),
            RowIssue::NegativeQuantity(-5)
        );
    }

    #[test]
    fn empty_reason_and_zone_map_to_unknown() {
        let mut r = row("SELL", "1.0", "10");
        r.reason = "  ".into();
        r.zone = String::new();
        let trade = Trade::from_row(&r, None).unwrap();
        assert_eq!(trade.reason_label(), UNKNOWN_LABEL);
        assert_eq!(trade.zone_label(), UNKNOWN_LABEL);
    }

    #[test]
    fn out_of_range_quantity_is_rejected() {
        assert_eq!(
            Trade::from_row(&row("BUY", "1.0", "1e30"), None).unwrap_err(),
            RowIssue::BadQuantity("1e30".into())
        );
        assert_eq!(parse_quantity("-1e19"), None);
        assert_eq!(parse_quantity("inf"), None);
        assert_eq!(parse_quantity("NaN"), None);
        assert_eq!(parse_quantity("9000000000000000000"), Some(9_000_000_000_000_000_000));
    }

    #[test]
    fn empty_pos_after_is_none() {
        let mut r = row("BUY", "1.0", "10");
        r.pos_after = String::new();
        let trade = Trade::from_row(&r, None).unwrap();
        assert_eq!(trade.pos_after, None);
    }
}
