//! Plain-text report renderer.
//!
//! Money is printed to 2 decimals, prices and costs to 4, percentages to 2.

use crate::domain::analysis::{AggregateSummary, Analysis, InstrumentReport, RowStats};
use crate::domain::profit::ProfitBucket;
use crate::ports::report_port::{ReportContext, ReportPort};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Default, Clone, Copy)]
pub struct TextReportAdapter;

impl TextReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportPort for TextReportAdapter {
    fn render(&self, analysis: &Analysis, ctx: &ReportContext<'_>) -> String {
        let mut output = String::new();
        output.push_str(&format_header(ctx, &analysis.stats));

        if analysis.instruments.is_empty() {
            output.push_str("\nNo trades to analyze.\n");
        }
        for report in &analysis.instruments {
            output.push('\n');
            output.push_str(&format_instrument(report));
        }

        output.push('\n');
        output.push_str(&format_aggregate(&analysis.aggregate));
        output
    }
}

fn format_header(ctx: &ReportContext<'_>, stats: &RowStats) -> String {
    let mut output = String::new();
    output.push_str("ETF trade profitability report\n");
    output.push_str(&format!(
        "Analysis time: {}\n",
        ctx.generated_at.format(TIMESTAMP_FORMAT)
    ));
    output.push_str(&format!("Trade log: {}\n", ctx.log_path));
    output.push_str(&format!(
        "Rows read: {}  undated: {}  skipped: {}  price defaulted: {}\n",
        stats.rows_read, stats.undated_rows, stats.skipped_rows, stats.defaulted_prices
    ));
    output.push_str(&format!(
        "Risk-free rate: {:.2}%\n",
        ctx.risk_free_rate * 100.0
    ));
    output
}

fn format_date(date: Option<NaiveDateTime>) -> String {
    date.map(|d| d.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| "n/a".to_string())
}

fn format_amounts(title: &str, amounts: &BTreeMap<String, f64>) -> String {
    let mut output = format!("{title}:\n");
    if amounts.is_empty() {
        output.push_str("  (none)\n");
    }
    for (label, amount) in amounts {
        output.push_str(&format!("  {label}: {amount:.2}\n"));
    }
    output
}

fn format_instrument(report: &InstrumentReport) -> String {
    let stat = &report.stat;
    let metrics = &report.metrics;
    let mut output = String::new();

    output.push_str(&format!("==== {} ====\n", stat.key));
    output.push_str(&format!(
        "Trades: {} (BUY {}, SELL {})\n",
        stat.trade_count, stat.buy_count, stat.sell_count
    ));
    output.push_str(&format!(
        "Bought: {} units for {:.2}\n",
        stat.buy_qty, stat.buy_amount
    ));
    output.push_str(&format!(
        "Sold: {} units for {:.2}\n",
        stat.sell_qty, stat.sell_amount
    ));
    output.push_str(&format!(
        "First trade: {}\n",
        format_date(stat.first_trade_date)
    ));
    output.push_str(&format!("Last trade: {}\n", format_date(stat.last_trade_date)));
    output.push_str(&format!("Trading days: {}\n", metrics.trading_days));
    output.push_str(&format!(
        "Position: {} units, avg cost {:.4}, cost basis {:.2}\n",
        stat.position, stat.avg_cost, stat.total_cost
    ));
    if let Some(symbol) = &report.configured_symbol {
        output.push_str(&format!(
            "Configured symbol {symbol} differs from logged symbol {}\n",
            stat.key.symbol
        ));
    }
    if let Some(base_units) = report.base_units {
        output.push_str(&format!("Configured base units: {base_units}\n"));
    }

    if let Some(market) = &report.market {
        output.push_str(&format!("Last price: {:.4}\n", market.last_price));
        output.push_str(&format!("Market value: {:.2}\n", market.market_value));
        output.push_str(&format!("Floating P&L: {:.2}\n", market.floating_pnl));
        if let Some(combined) = market.combined_return {
            output.push_str(&format!(
                "Combined return (realized + floating): {combined:.2}%\n"
            ));
        }
        if let Some(units) = market.snapshot_units {
            if units == stat.position {
                output.push_str(&format!("Monitor units: {units}\n"));
            } else {
                output.push_str(&format!(
                    "Monitor units: {units} (differs from replayed position {})\n",
                    stat.position
                ));
            }
        }
    }

    output.push_str(&format!("Realized P&L: {:.2}\n", stat.realized_pnl));
    for bucket in ProfitBucket::ALL {
        output.push_str(&format!(
            "  {}: {:.2}\n",
            bucket,
            metrics.breakdown.get(bucket)
        ));
    }
    output.push_str(&format_amounts("Realized by reason", &stat.realized_by_reason));
    output.push_str(&format_amounts("Realized by zone", &stat.realized_by_zone));

    output.push_str(&format!(
        "Annualized return: {:.2}% (capital base {:.2})\n",
        metrics.annualized_return, report.capital_base
    ));
    output.push_str(&format!("Sharpe ratio: {:.2}\n", metrics.sharpe_ratio));
    output.push_str(&format!("Max drawdown: {:.2}%\n", metrics.max_drawdown));
    output.push_str(&format!("Win rate: {:.2}%\n", metrics.win_rate));

    if stat.oversold_events > 0 || stat.position_mismatches > 0 {
        output.push_str(&format!(
            "Warnings: {} oversold SELL(s) clamped to zero, {} pos_after mismatch(es)\n",
            stat.oversold_events, stat.position_mismatches
        ));
    }
    output
}

fn format_aggregate(aggregate: &AggregateSummary) -> String {
    let mut output = String::new();
    output.push_str("==== Aggregate ====\n");
    output.push_str(&format!(
        "Total realized P&L: {:.2}\n",
        aggregate.total_realized
    ));

    match aggregate.breakdown.shares(aggregate.total_realized) {
        Some(shares) => {
            for (bucket, pct) in shares {
                output.push_str(&format!(
                    "  {}: {:.2} ({:.2}%)\n",
                    bucket,
                    aggregate.breakdown.get(bucket),
                    pct
                ));
            }
        }
        None => {
            for bucket in ProfitBucket::ALL {
                output.push_str(&format!(
                    "  {}: {:.2}\n",
                    bucket,
                    aggregate.breakdown.get(bucket)
                ));
            }
            output.push_str("  Total realized P&L is 0, cannot compute percentage\n");
        }
    }

    output.push_str(&format!(
        "Total investment: {:.2}\n",
        aggregate.total_investment
    ));
    if let Some(market) = &aggregate.market {
        output.push_str(&format!(
            "Total floating P&L: {:.2}\n",
            market.total_floating
        ));
        output.push_str(&format!("Market value: {:.2}\n", market.market_value));
        output.push_str(&format!(
            "Combined return: {:.2}%\n",
            market.combined_return
        ));
    }
    output
}
