//! CSV trade log adapter.
//!
//! Only the header must be valid UTF-8. Body cells with invalid bytes are
//! decoded lossily so one damaged row never discards the rest of the log.

use crate::domain::error::EtfProfitError;
use crate::domain::trade::{RawTradeRow, REQUIRED_COLUMNS};
use crate::ports::trade_log_port::TradeLogPort;
use csv::{ByteRecord, StringRecord};
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvTradeLogAdapter;

impl CsvTradeLogAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, content: &[u8], source: &str) -> Result<Vec<RawTradeRow>, EtfProfitError> {
        let format_error = |e: csv::Error| EtfProfitError::TradeLogFormat {
            file: source.to_string(),
            reason: e.to_string(),
        };

        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(content);

        let headers = rdr.headers().map_err(format_error)?.clone();
        let columns = ColumnIndex::resolve(&headers).map_err(|missing| {
            EtfProfitError::MissingColumns {
                file: source.to_string(),
                missing,
            }
        })?;

        let mut rows = Vec::new();
        for result in rdr.byte_records() {
            let record = result.map_err(format_error)?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            if std::str::from_utf8(record.as_slice()).is_err() {
                warn!(file = source, line, "invalid UTF-8 in row, decoding lossily");
            }
            rows.push(columns.row(&record, line));
        }
        Ok(rows)
    }
}

impl TradeLogPort for CsvTradeLogAdapter {
    fn load_trades(&self, path: &Path) -> Result<Vec<RawTradeRow>, EtfProfitError> {
        let content = fs::read(path).map_err(|e| EtfProfitError::TradeLogRead {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;
        self.parse(&content, &path.display().to_string())
    }
}

/// Positions of the required columns within the header.
struct ColumnIndex([usize; REQUIRED_COLUMNS.len()]);

impl ColumnIndex {
    fn resolve(headers: &StringRecord) -> Result<Self, Vec<String>> {
        let names: Vec<&str> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim())
            .collect();

        let mut index = [0usize; REQUIRED_COLUMNS.len()];
        let mut missing = Vec::new();
        for (slot, column) in REQUIRED_COLUMNS.iter().enumerate() {
            match names.iter().position(|n| n == column) {
                Some(pos) => index[slot] = pos,
                None => missing.push(column.to_string()),
            }
        }

        if missing.is_empty() {
            Ok(ColumnIndex(index))
        } else {
            Err(missing)
        }
    }

    fn row(&self, record: &ByteRecord, line: u64) -> RawTradeRow {
        let field = |slot: usize| {
            record
                .get(self.0[slot])
                .map(|cell| String::from_utf8_lossy(cell).into_owned())
                .unwrap_or_default()
        };
        RawTradeRow {
            line,
            date: field(0),
            etf_name: field(1),
            symbol: field(2),
            price: field(3),
            qty: field(4),
            side: field(5),
            reason: field(6),
            zone: field(7),
            pos_after: field(8),
        }
    }
}
