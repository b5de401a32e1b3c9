//! CLI definition and dispatch.

use chrono::{Local, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, warn};

use crate::adapters::csv_adapter::CsvTradeLogAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_config_adapter::JsonConfigAdapter;
use crate::adapters::json_snapshot_adapter::JsonSnapshotAdapter;
use crate::adapters::text_report::TextReportAdapter;
use crate::domain::analysis::{self, Analysis};
use crate::domain::config::AnalysisConfig;
use crate::domain::error::EtfProfitError;
use crate::domain::snapshot::StateSnapshot;
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::{ReportContext, ReportPort};
use crate::ports::snapshot_port::SnapshotPort;
use crate::ports::trade_log_port::TradeLogPort;

/// State file the monitor keeps next to its trade log.
pub const DEFAULT_STATE_FILE: &str = "etf_monitor.json";
/// Config file the monitor keeps next to its trade log.
pub const DEFAULT_CONFIG_FILE: &str = "etf.conf";

#[derive(Parser, Debug)]
#[command(name = "etfprofit", about = "ETF trade log profitability analyzer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a trade log and print the profitability report
    Report {
        /// Trade log CSV
        log: PathBuf,
        /// Monitor state snapshot (JSON)
        #[arg(short, long)]
        state: Option<PathBuf>,
        /// Analysis config (JSON, or INI with a .ini extension)
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        initial_capital: Option<f64>,
        #[arg(long)]
        risk_free_rate: Option<f64>,
    },
    /// Check a trade log's header and summarize its rows
    Validate { log: PathBuf },
}

/// Inputs of one `report` run.
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub log: PathBuf,
    pub state: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub initial_capital: Option<f64>,
    pub risk_free_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSummary {
    pub rows: usize,
    pub undated_rows: usize,
    pub skipped_rows: usize,
    pub instruments: usize,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Report {
            log,
            state,
            config,
            output,
            initial_capital,
            risk_free_rate,
        } => {
            let options = ReportOptions {
                log,
                state,
                config,
                initial_capital,
                risk_free_rate,
            };
            run_report(&options, output.as_deref())
        }
        Command::Validate { log } => run_validate(&log),
    }
}

fn run_report(options: &ReportOptions, output: Option<&Path>) -> ExitCode {
    let generated_at = Local::now().naive_local();
    let result = build_analysis(options).and_then(|(analysis, config)| {
        let log_path = options.log.display().to_string();
        let ctx = ReportContext {
            generated_at,
            log_path: &log_path,
            risk_free_rate: config.risk_free_rate,
        };
        let reporter = TextReportAdapter::new();
        match output {
            Some(path) => {
                reporter.write(&analysis, &ctx, path)?;
                info!("Report written to: {}", path.display());
            }
            None => print!("{}", reporter.render(&analysis, &ctx)),
        }
        Ok(())
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn run_validate(log: &Path) -> ExitCode {
    match summarize_log(log) {
        Ok(summary) => {
            println!("Trade log: {}", log.display());
            println!("Header: ok");
            println!("Rows: {}", summary.rows);
            println!("Undated rows: {}", summary.undated_rows);
            println!(
                "Skipped rows (unrecognized side or bad qty): {}",
                summary.skipped_rows
            );
            println!("Instruments: {}", summary.instruments);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

/// Load every input and run the analysis. Returns the effective config too.
pub fn build_analysis(
    options: &ReportOptions,
) -> Result<(Analysis, AnalysisConfig), EtfProfitError> {
    let config = load_analysis_config(options.config.as_deref(), &options.log)
        .with_overrides(options.initial_capital, options.risk_free_rate)?;

    info!("Loading trade log from {}", options.log.display());
    let rows = CsvTradeLogAdapter::new().load_trades(&options.log)?;
    info!("Read {} rows", rows.len());

    let snapshot = load_snapshot(options.state.as_deref(), &options.log);
    let analysis = analysis::analyze(rows, &config, snapshot.as_ref());
    info!(
        "Analyzed {} instruments ({} rows skipped)",
        analysis.instruments.len(),
        analysis.stats.skipped_rows
    );
    Ok((analysis, config))
}

/// Full report text for `options` at a fixed analysis time.
pub fn generate_report(
    options: &ReportOptions,
    generated_at: NaiveDateTime,
) -> Result<String, EtfProfitError> {
    let (analysis, config) = build_analysis(options)?;
    let log_path = options.log.display().to_string();
    let ctx = ReportContext {
        generated_at,
        log_path: &log_path,
        risk_free_rate: config.risk_free_rate,
    };
    Ok(TextReportAdapter::new().render(&analysis, &ctx))
}

pub fn summarize_log(log: &Path) -> Result<LogSummary, EtfProfitError> {
    let rows = CsvTradeLogAdapter::new().load_trades(log)?;
    let (ledgers, stats) = analysis::replay(rows);
    Ok(LogSummary {
        rows: stats.rows_read,
        undated_rows: stats.undated_rows,
        skipped_rows: stats.skipped_rows,
        instruments: ledgers.len(),
    })
}

/// Pick the explicit path, or a sibling of the log when one exists.
fn resolve_optional(explicit: Option<&Path>, log: &Path, file_name: &str) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let sibling = log
        .parent()
        .map(|dir| dir.join(file_name))
        .unwrap_or_else(|| PathBuf::from(file_name));
    if sibling.is_file() {
        debug!("Using {}", sibling.display());
        Some(sibling)
    } else {
        debug!("No {} next to the trade log", file_name);
        None
    }
}

/// Config is optional: a missing or unparsable file falls back to defaults.
pub fn load_analysis_config(explicit: Option<&Path>, log: &Path) -> AnalysisConfig {
    let Some(path) = resolve_optional(explicit, log, DEFAULT_CONFIG_FILE) else {
        return AnalysisConfig::default();
    };
    info!("Loading config from {}", path.display());
    match open_config(&path) {
        Ok(adapter) => AnalysisConfig::from_port(adapter.as_ref()),
        Err(e) => {
            warn!("{e}; using default analysis settings");
            AnalysisConfig::default()
        }
    }
}

/// INI by `.ini` extension, JSON otherwise.
pub fn open_config(path: &Path) -> Result<Box<dyn ConfigPort>, EtfProfitError> {
    let is_ini = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ini"));
    if is_ini {
        Ok(Box::new(FileConfigAdapter::from_file(path)?))
    } else {
        Ok(Box::new(JsonConfigAdapter::from_file(path)?))
    }
}

/// State is optional: a missing or unparsable file disables floating P&L.
pub fn load_snapshot(explicit: Option<&Path>, log: &Path) -> Option<StateSnapshot> {
    let path = resolve_optional(explicit, log, DEFAULT_STATE_FILE)?;
    info!("Loading state snapshot from {}", path.display());
    match JsonSnapshotAdapter::new().load_snapshot(&path) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!("{e}; floating P&L omitted");
            None
        }
    }
}
