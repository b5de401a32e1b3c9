//! JSON configuration adapter for the monitor's `etf.conf`.
//!
//! Layout mapping onto `ConfigPort` sections:
//! - `ETF_CONFIG.<name>` objects become `instrument.<name>` sections
//! - any other top-level object `<KEY>` becomes section `<key>`
//! - top-level scalars land in the `analysis` section unless that section
//!   already sets the same key
//!
//! Section and key names are lower-cased, matching the INI adapter.

use crate::domain::config::{ANALYSIS_SECTION, INSTRUMENT_SECTION_PREFIX};
use crate::domain::error::EtfProfitError;
use crate::ports::config_port::ConfigPort;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const INSTRUMENTS_KEY: &str = "etf_config";

type Section = BTreeMap<String, Value>;

pub struct JsonConfigAdapter {
    sections: BTreeMap<String, Section>,
}

impl JsonConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EtfProfitError> {
        let path = path.as_ref();
        let parse_error = |reason: String| EtfProfitError::ConfigParse {
            file: path.display().to_string(),
            reason,
        };
        let content = fs::read_to_string(path).map_err(|e| parse_error(e.to_string()))?;
        Self::from_string(&content).map_err(parse_error)
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let root: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
        let Value::Object(root) = root else {
            return Err("top-level JSON value must be an object".to_string());
        };

        let mut sections: BTreeMap<String, Section> = BTreeMap::new();
        let mut scalars: Section = BTreeMap::new();

        for (key, value) in root {
            let key = key.to_lowercase();
            match value {
                Value::Object(children) if key == INSTRUMENTS_KEY => {
                    for (name, settings) in children {
                        if let Value::Object(settings) = settings {
                            let section = format!(
                                "{INSTRUMENT_SECTION_PREFIX}{}",
                                name.trim().to_lowercase()
                            );
                            sections.insert(section, lower_keys(settings));
                        }
                    }
                }
                Value::Object(entries) => {
                    sections.entry(key).or_default().extend(lower_keys(entries));
                }
                scalar => {
                    scalars.insert(key, scalar);
                }
            }
        }

        let analysis = sections.entry(ANALYSIS_SECTION.to_string()).or_default();
        for (key, value) in scalars {
            analysis.entry(key).or_insert(value);
        }

        Ok(Self { sections })
    }

    fn value(&self, section: &str, key: &str) -> Option<&Value> {
        self.sections
            .get(&section.to_lowercase())?
            .get(&key.to_lowercase())
            .filter(|v| !v.is_null())
    }
}

fn lower_keys(map: serde_json::Map<String, Value>) -> Section {
    map.into_iter()
        .map(|(k, v)| (k.to_lowercase(), v))
        .collect()
}

impl ConfigPort for JsonConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.value(section, key).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        match self.value(section, key) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    fn sections(&self) -> Vec<String> {
        self.sections.keys().cloned().collect()
    }
}
