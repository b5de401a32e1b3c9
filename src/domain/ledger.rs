//! Per-instrument ledger replaying trades with weighted-average cost.
//!
//! Realized P&L on a SELL is measured against the current weighted-average
//! cost of the whole position, not against individual lots.

use crate::domain::trade::{InstrumentKey, Side, Trade};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use tracing::warn;

/// State of the ledger right after one trade.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeSnapshot {
    pub side: Side,
    pub timestamp: Option<NaiveDateTime>,
    pub price: f64,
    pub qty: i64,
    pub amount: f64,
    pub position_after: i64,
    pub avg_cost_after: f64,
    /// Set for SELLs only.
    pub realized: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EtfStat {
    pub key: InstrumentKey,
    pub position: i64,
    pub avg_cost: f64,
    pub total_cost: f64,
    pub realized_pnl: f64,
    pub realized_by_reason: BTreeMap<String, f64>,
    pub realized_by_zone: BTreeMap<String, f64>,
    pub trade_count: usize,
    pub buy_count: usize,
    pub sell_count: usize,
    pub buy_qty: i64,
    pub sell_qty: i64,
    pub buy_amount: f64,
    pub sell_amount: f64,
    pub first_trade_date: Option<NaiveDateTime>,
    pub last_trade_date: Option<NaiveDateTime>,
    pub trades: Vec<TradeSnapshot>,
    /// SELLs that exceeded the held position and were clamped at zero.
    pub oversold_events: usize,
    /// Rows whose `pos_after` disagreed with the replayed position.
    pub position_mismatches: usize,
}

impl EtfStat {
    pub fn new(key: InstrumentKey) -> Self {
        EtfStat {
            key,
            position: 0,
            avg_cost: 0.0,
            total_cost: 0.0,
            realized_pnl: 0.0,
            realized_by_reason: BTreeMap::new(),
            realized_by_zone: BTreeMap::new(),
            trade_count: 0,
            buy_count: 0,
            sell_count: 0,
            buy_qty: 0,
            sell_qty: 0,
            buy_amount: 0.0,
            sell_amount: 0.0,
            first_trade_date: None,
            last_trade_date: None,
            trades: Vec::new(),
            oversold_events: 0,
            position_mismatches: 0,
        }
    }

    pub fn apply(&mut self, trade: &Trade) {
        let snapshot = match trade.side {
            Side::Buy => self.apply_buy(trade),
            Side::Sell => self.apply_sell(trade),
        };
        self.trade_count += 1;
        self.trades.push(snapshot);

        if let Some(ts) = trade.timestamp {
            self.first_trade_date = Some(self.first_trade_date.map_or(ts, |d| d.min(ts)));
            self.last_trade_date = Some(self.last_trade_date.map_or(ts, |d| d.max(ts)));
        }

        if let Some(logged) = trade.pos_after {
            if logged != self.position {
                self.position_mismatches += 1;
                warn!(
                    instrument = %self.key,
                    line = trade.line,
                    logged,
                    replayed = self.position,
                    "pos_after disagrees with replayed position"
                );
            }
        }
    }

    fn apply_buy(&mut self, trade: &Trade) -> TradeSnapshot {
        let amount = trade.amount();
        let total_cost_before = self.avg_cost * self.position as f64;
        self.total_cost = total_cost_before + amount;
        self.position = self.position.saturating_add(trade.qty);
        if self.position > 0 {
            self.avg_cost = self.total_cost / self.position as f64;
        } else {
            self.avg_cost = 0.0;
            self.total_cost = 0.0;
        }

        self.buy_count += 1;
        self.buy_qty = self.buy_qty.saturating_add(trade.qty);
        self.buy_amount += amount;

        TradeSnapshot {
            side: Side::Buy,
            timestamp: trade.timestamp,
            price: trade.price,
            qty: trade.qty,
            amount,
            position_after: self.position,
            avg_cost_after: self.avg_cost,
            realized: None,
        }
    }

    fn apply_sell(&mut self, trade: &Trade) -> TradeSnapshot {
        let amount = trade.amount();
        let realized = (trade.price - self.avg_cost) * trade.qty as f64;

        self.realized_pnl += realized;
        *self
            .realized_by_reason
            .entry(trade.reason_label().to_string())
            .or_insert(0.0) += realized;
        *self
            .realized_by_zone
            .entry(trade.zone_label().to_string())
            .or_insert(0.0) += realized;

        let held = self.position;
        self.position = self.position.saturating_sub(trade.qty);
        if self.position <= 0 {
            if self.position < 0 {
                self.oversold_events += 1;
                warn!(
                    instrument = %self.key,
                    line = trade.line,
                    held,
                    sold = trade.qty,
                    "SELL exceeds held position, clamping position to zero"
                );
            }
            self.position = 0;
            self.avg_cost = 0.0;
            self.total_cost = 0.0;
        } else {
            self.total_cost = self.avg_cost * self.position as f64;
        }

        self.sell_count += 1;
        self.sell_qty = self.sell_qty.saturating_add(trade.qty);
        self.sell_amount += amount;

        TradeSnapshot {
            side: Side::Sell,
            timestamp: trade.timestamp,
            price: trade.price,
            qty: trade.qty,
            amount,
            position_after: self.position,
            avg_cost_after: self.avg_cost,
            realized: Some(realized),
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn trade(side: Side, price: f64, qty: i64, reason: &str, zone: &str) -> Trade {
        Trade {
            key: InstrumentKey::new("红利ETF", "SH510880"),
            line: 2,
            timestamp: None,
            side,
            price,
            qty,
            reason: reason.to_string(),
            zone: zone.to_string(),
            pos_after: None,
            price_defaulted: false,
        }
    }

    fn buy(price: f64, qty: i64) -> Trade {
        trade(Side::Buy, price, qty, "BOX_GRID_BUY", "150_120")
    }

    fn sell(price: f64, qty: i64, reason: &str) -> Trade {
        trade(Side::Sell, price, qty, reason, "150_120")
    }

    fn new_stat() -> EtfStat {
        EtfStat::new(InstrumentKey::new("红利ETF", "SH510880"))
    }

    #[test]
    fn two_buys_then_partial_sell() {
        let mut stat = new_stat();
        stat.apply(&buy(10.0, 100));
        stat.apply(&buy(12.0, 100));
        assert_abs_diff_eq!(stat.avg_cost, 11.0, epsilon = 1e-9);

        stat.apply(&sell(13.0, 100, "BOX_GRID_SELL"));
        assert_abs_diff_eq!(stat.realized_pnl, 200.0, epsilon = 1e-9);
        assert_eq!(stat.position, 100);
        assert_abs_diff_eq!(stat.avg_cost, 11.0, epsilon = 1e-9);
        assert_abs_diff_eq!(stat.total_cost, 1100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(stat.realized_by_reason["BOX_GRID_SELL"], 200.0, epsilon = 1e-9);
        assert_abs_diff_eq!(stat.realized_by_zone["150_120"], 200.0, epsilon = 1e-9);
    }

    #[test]
    fn counters_accumulate() {
        let mut stat = new_stat();
        stat.apply(&buy(10.0, 100));
        stat.apply(&buy(12.0, 50));
        stat.apply(&sell(13.0, 30, "BOX_GRID_SELL"));

        assert_eq!(stat.trade_count, 3);
        assert_eq!(stat.buy_count, 2);
        assert_eq!(stat.sell_count, 1);
        assert_eq!(stat.buy_qty, 150);
        assert_eq!(stat.sell_qty, 30);
        assert_abs_diff_eq!(stat.buy_amount, 1600.0, epsilon = 1e-9);
        assert_abs_diff_eq!(stat.sell_amount, 390.0, epsilon = 1e-9);
        assert_eq!(stat.trades.len(), 3);
    }

    #[test]
    fn oversell_clamps_and_resets_cost() {
        let mut stat = new_stat();
        stat.apply(&buy(10.0, 100));
        stat.apply(&sell(11.0, 150, "BOX_GRID_SELL"));

        assert_eq!(stat.position, 0);
        assert_eq!(stat.avg_cost, 0.0);
        assert_eq!(stat.total_cost, 0.0);
        assert_eq!(stat.oversold_events, 1);
        // realized uses the full sold quantity against the prior average
        assert_abs_diff_eq!(stat.realized_pnl, 150.0, epsilon = 1e-9);
    }

    #[test]
    fn exact_close_resets_without_oversold_flag() {
        let mut stat = new_stat();
        stat.apply(&buy(10.0, 100));
        stat.apply(&sell(9.0, 100, "STOP"));

        assert_eq!(stat.position, 0);
        assert_eq!(stat.avg_cost, 0.0);
        assert_eq!(stat.oversold_events, 0);
        assert_abs_diff_eq!(stat.realized_pnl, -100.0, epsilon = 1e-9);
    }

    #[test]
    fn sell_with_no_position_counts_full_proceeds() {
        let mut stat = new_stat();
        stat.apply(&sell(5.0, 10, ""));
        assert_eq!(stat.position, 0);
        assert_abs_diff_eq!(stat.realized_pnl, 50.0, epsilon = 1e-9);
        assert_eq!(stat.oversold_events, 1);
    }

    #[test]
    fn huge_quantities_saturate_instead_of_overflowing() {
        let mut stat = new_stat();
        stat.apply(&buy(1.0, i64::MAX));
        stat.apply(&buy(1.0, 1));
        assert_eq!(stat.position, i64::MAX);
        assert_eq!(stat.buy_qty, i64::MAX);

        stat.apply(&sell(1.0, i64::MAX, "X"));
        stat.apply(&sell(1.0, i64::MAX, "X"));
        assert_eq!(stat.position, 0);
        assert_eq!(stat.sell_qty, i64::MAX);
        assert_eq!(stat.oversold_events, 1);
    }

    #[test]
    fn buy_after_flat_starts_fresh_average() {
        let mut stat = new_stat();
        stat.apply(&buy(10.0, 100));
        stat.apply(&sell(12.0, 100, "BOX_GRID_SELL"));
        stat.apply(&buy(8.0, 50));
        assert_abs_diff_eq!(stat.avg_cost, 8.0, epsilon = 1e-9);
        assert_eq!(stat.position, 50);
    }

    #[test]
    fn zero_quantity_buy_keeps_empty_position_at_zero_cost() {
        let mut stat = new_stat();
        stat.apply(&buy(10.0, 0));
        assert_eq!(stat.position, 0);
        assert_eq!(stat.avg_cost, 0.0);
    }

    #[test]
    fn trade_dates_track_min_and_max() {
        let mut stat = new_stat();
        let mut t1 = buy(10.0, 10);
        t1.timestamp = Some(
            NaiveDateTime::parse_from_str("2024-01-05 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap(),
        );
        let mut t2 = buy(10.0, 10);
        t2.timestamp = Some(
            NaiveDateTime::parse_from_str("2024-02-01 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap(),
        );
        stat.apply(&buy(10.0, 10));
        assert!(stat.first_trade_date.is_none());
        stat.apply(&t1);
        stat.apply(&t2);
        assert_eq!(stat.first_trade_date, t1.timestamp);
        assert_eq!(stat.last_trade_date, t2.timestamp);
    }

    #[test]
    fn pos_after_mismatch_is_counted_not_applied() {
        let mut stat = new_stat();
        let mut t = buy(10.0, 100);
        t.pos_after = Some(200);
        stat.apply(&t);
        assert_eq!(stat.position, 100);
        assert_eq!(stat.position_mismatches, 1);

        let mut t = buy(10.0, 100);
        t.pos_after = Some(200);
        stat.apply(&t);
        assert_eq!(stat.position_mismatches, 1);
    }

    #[test]
    fn empty_reason_and_zone_bucket_as_unknown() {
        let mut stat = new_stat();
        stat.apply(&buy(10.0, 100));
        stat.apply(&trade(Side::Sell, 11.0, 10, "", ""));
        assert!(stat.realized_by_reason.contains_key("UNKNOWN"));
        assert!(stat.realized_by_zone.contains_key("UNKNOWN"));
    }

    fn arb_trade() -> impl Strategy<Value = Trade> {
        (
            prop::bool::ANY,
            1u32..5000,
            0i64..1000,
            prop::sample::select(vec!["BOX_GRID_SELL", "ABOVE_120_SELL", "", "MANUAL"]),
            prop::sample::select(vec!["150_120", "ABOVE_120", ""]),
        )
            .prop_map(|(is_buy, cents, qty, reason, zone)| {
                let side = if is_buy { Side::Buy } else { Side::Sell };
                trade(side, cents as f64 / 100.0, qty, reason, zone)
            })
    }

    proptest! {
        #[test]
        fn buys_only_average_is_weighted_mean(
            lots in prop::collection::vec((1u32..10_000, 1i64..1000), 1..20)
        ) {
            let mut stat = new_stat();
            let mut notional = 0.0;
            let mut units = 0i64;
            for (cents, qty) in &lots {
                let price = *cents as f64 / 100.0;
                stat.apply(&buy(price, *qty));
                notional += price * *qty as f64;
                units += qty;
            }
            let expected = notional / units as f64;
            prop_assert!((stat.avg_cost - expected).abs() < 1e-6);
            prop_assert_eq!(stat.position, units);
        }

        #[test]
        fn realized_is_additive_across_reason_and_zone(
            trades in prop::collection::vec(arb_trade(), 0..40)
        ) {
            let mut stat = new_stat();
            for t in &trades {
                stat.apply(t);
            }
            let by_reason: f64 = stat.realized_by_reason.values().sum();
            let by_zone: f64 = stat.realized_by_zone.values().sum();
            prop_assert!((stat.realized_pnl - by_reason).abs() < 1e-6);
            prop_assert!((stat.realized_pnl - by_zone).abs() < 1e-6);
        }

        #[test]
        fn position_never_negative_and_flat_means_zero_cost(
            trades in prop::collection::vec(arb_trade(), 0..40)
        ) {
            let mut stat = new_stat();
            for t in &trades {
                stat.apply(t);
                prop_assert!(stat.position >= 0);
                if stat.position == 0 {
                    prop_assert_eq!(stat.avg_cost, 0.0);
                    prop_assert_eq!(stat.total_cost, 0.0);
                }
            }
        }
    }
}
