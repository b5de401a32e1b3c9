//! Chronological ordering of trade log rows.
//!
//! Timestamps are tried against a fixed list of formats, first match wins.
//! Rows whose date matches none of them are "undated" and are placed ahead
//! of the dated rows, in file order, so nothing is dropped.

use crate::domain::trade::RawTradeRow;
use chrono::{NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, Copy)]
enum TimestampFormat {
    DateTime(&'static str),
    DateOnly(&'static str),
}

const TIMESTAMP_FORMATS: [TimestampFormat; 5] = [
    TimestampFormat::DateTime("%Y-%m-%d %H:%M:%S"),
    TimestampFormat::DateTime("%Y.%m.%d.%H:%M"),
    TimestampFormat::DateOnly("%Y-%m-%d"),
    TimestampFormat::DateTime("%Y/%m/%d %H:%M:%S"),
    TimestampFormat::DateTime("%Y-%m-%d %H:%M"),
];

/// A raw row paired with its parsed timestamp, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedRow {
    pub row: RawTradeRow,
    pub timestamp: Option<NaiveDateTime>,
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    TIMESTAMP_FORMATS.iter().find_map(|format| match *format {
        TimestampFormat::DateTime(fmt) => NaiveDateTime::parse_from_str(s, fmt).ok(),
        TimestampFormat::DateOnly(fmt) => NaiveDate::parse_from_str(s, fmt)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0)),
    })
}

/// Undated rows in file order, then dated rows ascending. The sort is
/// stable, so equal timestamps keep their file order.
pub fn chronological_order(rows: Vec<RawTradeRow>) -> Vec<OrderedRow> {
    let (mut undated, mut dated): (Vec<OrderedRow>, Vec<OrderedRow>) = rows
        .into_iter()
        .map(|row| {
            let timestamp = parse_timestamp(&row.date);
            OrderedRow { row, timestamp }
        })
        .partition(|r| r.timestamp.is_none());

    dated.sort_by_key(|r| r.timestamp);
    undated.extend(dated);
    undated
}
