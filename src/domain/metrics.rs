//! Performance metrics derived from a completed ledger.
//!
//! Everything here is read-only over an [`EtfStat`].

use super::ledger::{EtfStat, TradeSnapshot};
use super::profit::ProfitBreakdown;
use super::trade::Side;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const CALENDAR_DAYS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub trading_days: i64,
    /// Percent.
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    /// Percent.
    pub max_drawdown: f64,
    /// Percent of SELLs with positive realized P&L.
    pub win_rate: f64,
    pub breakdown: ProfitBreakdown,
}

impl Metrics {
    pub fn compute(stat: &EtfStat, initial_capital: f64, risk_free_rate: f64) -> Self {
        Metrics {
            trading_days: trading_days(stat),
            annualized_return: annualized_return(stat, initial_capital),
            sharpe_ratio: sharpe_ratio(&stat.trades, risk_free_rate),
            max_drawdown: max_drawdown(&stat.trades),
            win_rate: win_rate(&stat.trades),
            breakdown: ProfitBreakdown::from_reasons(&stat.realized_by_reason),
        }
    }
}

/// Whole days elapsed between the first and last dated trade, plus one.
pub fn trading_days(stat: &EtfStat) -> i64 {
    match (stat.first_trade_date, stat.last_trade_date) {
        (Some(first), Some(last)) => (last - first).num_days() + 1,
        _ => 0,
    }
}

pub fn annualized_return(stat: &EtfStat, initial_capital: f64) -> f64 {
    if initial_capital <= 0.0 {
        return 0.0;
    }
    let total_return = stat.realized_pnl / initial_capital;
    let years = trading_days(stat) as f64 / CALENDAR_DAYS_PER_YEAR;
    if years > 0.0 && total_return > -1.0 {
        ((1.0 + total_return).powf(1.0 / years) - 1.0) * 100.0
    } else {
        0.0
    }
}

/// Samples `realized / |cash_flow|` after each SELL that leaves the running
/// cash flow positive, then annualizes with population standard deviation.
pub fn sharpe_ratio(trades: &[TradeSnapshot], risk_free_rate: f64) -> f64 {
    let mut cash_flow = 0.0_f64;
    let mut returns = Vec::new();

    for trade in trades {
        match trade.side {
            Side::Buy => cash_flow -= trade.amount,
            Side::Sell => {
                cash_flow += trade.amount;
                if cash_flow > 0.0 {
                    let realized = trade.realized.unwrap_or(0.0);
                    returns.push(realized / cash_flow.abs());
                }
            }
        }
    }

    if returns.len() < 2 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    if stddev == 0.0 {
        return 0.0;
    }

    (mean * TRADING_DAYS_PER_YEAR - risk_free_rate) / (stddev * TRADING_DAYS_PER_YEAR.sqrt())
}

/// Position value is marked at the post-trade average cost, falling back to
/// the trade price when the position is flat.
pub fn max_drawdown(trades: &[TradeSnapshot]) -> f64 {
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;

    for trade in trades {
        let market_price = if trade.avg_cost_after > 0.0 {
            trade.avg_cost_after
        } else {
            trade.price
        };
        let value = trade.position_after as f64 * market_price;

        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            let dd = (peak - value) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd * 100.0
}

pub fn win_rate(trades: &[TradeSnapshot]) -> f64 {
    let (sells, wins) = trades
        .iter()
        .filter(|t| t.side == Side::Sell)
        .fold((0usize, 0usize), |(sells, wins), t| {
            let won = t.realized.is_some_and(|r| r > 0.0);
            (sells + 1, wins + usize::from(won))
        });
    if sells == 0 {
        0.0
    } else {
        wins as f64 / sells as f64 * 100.0
    }
}

/// Unrealized P&L of the open position at `price`.
pub fn floating_pnl(stat: &EtfStat, price: f64) -> f64 {
    (price - stat.avg_cost) * stat.position as f64
}

pub fn market_value(stat: &EtfStat, price: f64) -> f64 {
    stat.position as f64 * price
}
