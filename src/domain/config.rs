//! Typed analysis configuration.
//!
//! Built from any [`ConfigPort`]. Values that are present but invalid are
//! reported and replaced by their defaults; a config file never aborts a run.

use crate::domain::error::EtfProfitError;
use crate::ports::config_port::ConfigPort;
use std::collections::BTreeMap;
use tracing::warn;

pub const ANALYSIS_SECTION: &str = "analysis";
pub const INSTRUMENT_SECTION_PREFIX: &str = "instrument.";

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.03;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstrumentConfig {
    pub symbol: Option<String>,
    pub base_price: Option<f64>,
    pub base_units: Option<i64>,
    pub initial_capital: Option<f64>,
}

impl InstrumentConfig {
    /// Capital base implied by the instrument's own settings, if any.
    pub fn capital_base(&self) -> Option<f64> {
        if let Some(capital) = self.initial_capital.filter(|c| *c > 0.0) {
            return Some(capital);
        }
        match (self.base_price, self.base_units) {
            (Some(price), Some(units)) if price > 0.0 && units > 0 => Some(price * units as f64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub initial_capital: f64,
    pub risk_free_rate: f64,
    /// Keyed by lower-cased instrument name.
    pub instruments: BTreeMap<String, InstrumentConfig>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            instruments: BTreeMap::new(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_port(config: &dyn ConfigPort) -> Self {
        let mut initial_capital =
            config.get_double(ANALYSIS_SECTION, "initial_capital", DEFAULT_INITIAL_CAPITAL);
        if let Err(e) = validate_initial_capital(initial_capital) {
            warn!("{e}; using {DEFAULT_INITIAL_CAPITAL}");
            initial_capital = DEFAULT_INITIAL_CAPITAL;
        }

        let mut risk_free_rate =
            config.get_double(ANALYSIS_SECTION, "risk_free_rate", DEFAULT_RISK_FREE_RATE);
        if let Err(e) = validate_risk_free_rate(risk_free_rate) {
            warn!("{e}; using {DEFAULT_RISK_FREE_RATE}");
            risk_free_rate = DEFAULT_RISK_FREE_RATE;
        }

        let instruments = config
            .sections()
            .into_iter()
            .filter_map(|section| {
                let name = section.strip_prefix(INSTRUMENT_SECTION_PREFIX)?.to_string();
                Some((name, instrument_from_section(config, &section)))
            })
            .collect();

        AnalysisConfig {
            initial_capital,
            risk_free_rate,
            instruments,
        }
    }

    /// Apply command-line overrides, rejecting invalid values.
    pub fn with_overrides(
        mut self,
        initial_capital: Option<f64>,
        risk_free_rate: Option<f64>,
    ) -> Result<Self, EtfProfitError> {
        if let Some(capital) = initial_capital {
            validate_initial_capital(capital)?;
            self.initial_capital = capital;
        }
        if let Some(rate) = risk_free_rate {
            validate_risk_free_rate(rate)?;
            self.risk_free_rate = rate;
        }
        Ok(self)
    }

    pub fn instrument(&self, name: &str) -> Option<&InstrumentConfig> {
        self.instruments.get(&name.trim().to_lowercase())
    }

    /// Capital used to annualize an instrument's realized P&L.
    pub fn capital_for(&self, name: &str) -> f64 {
        self.instrument(name)
            .and_then(InstrumentConfig::capital_base)
            .unwrap_or(self.initial_capital)
    }
}

fn instrument_from_section(config: &dyn ConfigPort, section: &str) -> InstrumentConfig {
    let number = |key: &str| -> Option<f64> {
        config
            .get_string(section, key)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    };
    InstrumentConfig {
        symbol: config
            .get_string(section, "symbol")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        base_price: number("base_price"),
        base_units: number("base_units").map(|u| u.trunc() as i64),
        initial_capital: number("initial_capital"),
    }
}

fn validate_initial_capital(value: f64) -> Result<(), EtfProfitError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(EtfProfitError::ConfigInvalid {
            section: ANALYSIS_SECTION.to_string(),
            key: "initial_capital".to_string(),
            reason: "initial_capital must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_risk_free_rate(value: f64) -> Result<(), EtfProfitError> {
    if !value.is_finite() || value.abs() >= 1.0 {
        return Err(EtfProfitError::ConfigInvalid {
            section: ANALYSIS_SECTION.to_string(),
            key: "risk_free_rate".to_string(),
            reason: "risk_free_rate must be a fraction strictly between -1 and 1".to_string(),
        });
    }
    Ok(())
}
