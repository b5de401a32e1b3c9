//! Full analysis pass: order rows, replay ledgers, derive metrics and merge
//! live prices.

use crate::domain::config::AnalysisConfig;
use crate::domain::ledger::EtfStat;
use crate::domain::metrics::{self, Metrics};
use crate::domain::ordering::chronological_order;
use crate::domain::profit::ProfitBreakdown;
use crate::domain::snapshot::StateSnapshot;
use crate::domain::trade::{InstrumentKey, RawTradeRow, Trade};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Row-level bookkeeping for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowStats {
    pub rows_read: usize,
    pub undated_rows: usize,
    pub skipped_rows: usize,
    pub defaulted_prices: usize,
}

/// Floating figures for an instrument with a merged market price.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketView {
    pub last_price: f64,
    pub market_value: f64,
    pub floating_pnl: f64,
    /// `(realized + floating) / buy amount`, percent.
    pub combined_return: Option<f64>,
    pub snapshot_units: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentReport {
    pub stat: EtfStat,
    pub metrics: Metrics,
    pub capital_base: f64,
    pub base_units: Option<i64>,
    /// Symbol from the instrument's config section, kept only when it differs
    /// from the symbol in the log.
    pub configured_symbol: Option<String>,
    pub market: Option<MarketView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateMarket {
    pub total_floating: f64,
    pub market_value: f64,
    /// Percent of total investment.
    pub combined_return: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSummary {
    pub total_realized: f64,
    pub breakdown: ProfitBreakdown,
    /// Sum of BUY amounts across instruments.
    pub total_investment: f64,
    pub market: Option<AggregateMarket>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub instruments: Vec<InstrumentReport>,
    pub aggregate: AggregateSummary,
    pub stats: RowStats,
}

/// Replay rows into one ledger per instrument, in first-seen order.
pub fn replay(rows: Vec<RawTradeRow>) -> (Vec<EtfStat>, RowStats) {
    let mut stats = RowStats {
        rows_read: rows.len(),
        ..Default::default()
    };

    let ordered = chronological_order(rows);
    let mut ledgers: Vec<EtfStat> = Vec::new();
    let mut index: HashMap<InstrumentKey, usize> = HashMap::new();

    for entry in &ordered {
        if entry.timestamp.is_none() {
            stats.undated_rows += 1;
            debug!(line = entry.row.line, date = %entry.row.date, "undated row");
        }

        let trade = match Trade::from_row(&entry.row, entry.timestamp) {
            Ok(t) => t,
            Err(issue) => {
                stats.skipped_rows += 1;
                warn!(line = entry.row.line, "skipping row: {issue}");
                continue;
            }
        };

        if trade.price_defaulted {
            stats.defaulted_prices += 1;
            warn!(
                line = trade.line,
                price = %entry.row.price,
                "unparsable price, using 0.0"
            );
        }

        let slot = *index.entry(trade.key.clone()).or_insert_with(|| {
            ledgers.push(EtfStat::new(trade.key.clone()));
            ledgers.len() - 1
        });
        ledgers[slot].apply(&trade);
    }

    (ledgers, stats)
}

pub fn analyze(
    rows: Vec<RawTradeRow>,
    config: &AnalysisConfig,
    snapshot: Option<&StateSnapshot>,
) -> Analysis {
    let (ledgers, stats) = replay(rows);

    let instruments: Vec<InstrumentReport> = ledgers
        .into_iter()
        .map(|stat| instrument_report(stat, config, snapshot))
        .collect();

    let aggregate = aggregate(&instruments);

    Analysis {
        instruments,
        aggregate,
        stats,
    }
}

fn instrument_report(
    stat: EtfStat,
    config: &AnalysisConfig,
    snapshot: Option<&StateSnapshot>,
) -> InstrumentReport {
    let capital_base = config.capital_for(&stat.key.name);
    let metrics = Metrics::compute(&stat, capital_base, config.risk_free_rate);
    let instrument = config.instrument(&stat.key.name);
    let base_units = instrument.and_then(|c| c.base_units);
    let configured_symbol = instrument
        .and_then(|c| c.symbol.as_deref())
        .map(str::trim)
        .filter(|symbol| !symbol.is_empty() && *symbol != stat.key.symbol)
        .map(str::to_string);
    if let Some(symbol) = &configured_symbol {
        warn!(
            instrument = %stat.key,
            configured = %symbol,
            "configured symbol differs from the symbol in the trade log"
        );
    }
    let market = snapshot.and_then(|s| market_view(&stat, s));

    InstrumentReport {
        stat,
        metrics,
        capital_base,
        base_units,
        configured_symbol,
        market,
    }
}

fn market_view(stat: &EtfStat, snapshot: &StateSnapshot) -> Option<MarketView> {
    let last_price = snapshot.last_price(&stat.key.name)?;
    let floating_pnl = metrics::floating_pnl(stat, last_price);
    let snapshot_units = snapshot.get(&stat.key.name).and_then(|s| s.current_units);

    if let Some(units) = snapshot_units {
        if units != stat.position {
            warn!(
                instrument = %stat.key,
                snapshot_units = units,
                replayed = stat.position,
                "state snapshot units differ from replayed position"
            );
        }
    }

    let combined_return = (stat.buy_amount > 0.0)
        .then(|| (stat.realized_pnl + floating_pnl) / stat.buy_amount * 100.0);

    Some(MarketView {
        last_price,
        market_value: metrics::market_value(stat, last_price),
        floating_pnl,
        combined_return,
        snapshot_units,
    })
}

fn aggregate(instruments: &[InstrumentReport]) -> AggregateSummary {
    let mut breakdown = ProfitBreakdown::default();
    let mut total_realized = 0.0;
    let mut total_investment = 0.0;
    let mut total_floating = 0.0;
    let mut market_value = 0.0;
    let mut priced = false;

    for report in instruments {
        total_realized += report.stat.realized_pnl;
        total_investment += report.stat.buy_amount;
        breakdown.merge(&report.metrics.breakdown);
        if let Some(market) = &report.market {
            priced = true;
            total_floating += market.floating_pnl;
            market_value += market.market_value;
        }
    }

    let market = (priced && total_investment > 0.0).then(|| AggregateMarket {
        total_floating,
        market_value,
        combined_return: (total_realized + total_floating) / total_investment * 100.0,
    });

    AggregateSummary {
        total_realized,
        breakdown,
        total_investment,
        market,
    }
}
