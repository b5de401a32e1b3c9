//! Live state written by the monitor (`etf_monitor.json`).

use serde::Deserialize;
use std::collections::BTreeMap;

/// Reserved top-level key holding monitor metadata, not an instrument.
pub const META_KEY: &str = "_meta";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InstrumentState {
    #[serde(default)]
    pub current_units: Option<i64>,
    #[serde(default)]
    pub last_price: Option<f64>,
}

/// Per-instrument state keyed by instrument name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateSnapshot {
    pub instruments: BTreeMap<String, InstrumentState>,
}

impl StateSnapshot {
    pub fn get(&self, name: &str) -> Option<&InstrumentState> {
        self.instruments.get(name.trim())
    }

    /// Last known price, ignoring missing or non-positive values.
    pub fn last_price(&self, name: &str) -> Option<f64> {
        self.get(name)
            .and_then(|s| s.last_price)
            .filter(|p| p.is_finite() && *p > 0.0)
    }
}
