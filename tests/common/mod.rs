#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use etfprofit::domain::trade::RawTradeRow;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const HEADER: &str = "date,etf_name,symbol,price,qty,side,reason,zone,pos_after";

/// One log line in header order.
#[allow(clippy::too_many_arguments)]
pub fn line(
    date: &str,
    name: &str,
    symbol: &str,
    price: &str,
    qty: &str,
    side: &str,
    reason: &str,
    zone: &str,
    pos_after: &str,
) -> String {
    [date, name, symbol, price, qty, side, reason, zone, pos_after].join(",")
}

pub fn csv(lines: &[String]) -> String {
    let mut content = String::from(HEADER);
    content.push('\n');
    for l in lines {
        content.push_str(l);
        content.push('\n');
    }
    content
}

/// A scratch directory holding the monitor's files.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn log(&self, lines: &[String]) -> PathBuf {
        self.write("etf_trades.csv", &csv(lines))
    }
}

#[allow(clippy::too_many_arguments)]
pub fn raw_row(
    line: u64,
    date: &str,
    name: &str,
    symbol: &str,
    price: &str,
    qty: &str,
    side: &str,
    reason: &str,
) -> RawTradeRow {
    RawTradeRow {
        line,
        date: date.into(),
        etf_name: name.into(),
        symbol: symbol.into(),
        price: price.into(),
        qty: qty.into(),
        side: side.into(),
        reason: reason.into(),
        zone: "150_120".into(),
        pos_after: String::new(),
    }
}

pub fn fixed_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(15, 0, 0)
        .unwrap()
}

/// Scenario A: two buys then a grid sell.
pub fn scenario_a_lines() -> Vec<String> {
    let (name, symbol, zone) = ("红利ETF", "SH510880", "150_120");
    vec![
        line("2024-01-02 10:00:00", name, symbol, "10", "100", "BUY", "BOX_GRID_BUY", zone, "100"),
        line("2024-01-03 10:00:00", name, symbol, "12", "100", "BUY", "BOX_GRID_BUY", zone, "200"),
        line(
            "2024-01-04 10:00:00",
            name,
            symbol,
            "13",
            "100",
            "SELL",
            "BOX_GRID_SELL",
            zone,
            "100",
        ),
    ]
}
