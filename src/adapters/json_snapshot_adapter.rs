//! Reads the monitor's `etf_monitor.json` state file.

use crate::domain::error::EtfProfitError;
use crate::domain::snapshot::{InstrumentState, StateSnapshot, META_KEY};
use crate::ports::snapshot_port::SnapshotPort;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSnapshotAdapter;

impl JsonSnapshotAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Entries that are not objects or have mistyped fields are skipped with
    /// a warning; only a malformed document is an error.
    pub fn parse(content: &str) -> Result<StateSnapshot, String> {
        let root: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
        let Value::Object(root) = root else {
            return Err("top-level JSON value must be an object".to_string());
        };

        let mut snapshot = StateSnapshot::default();
        for (name, value) in root {
            if name == META_KEY {
                continue;
            }
            match serde_json::from_value::<InstrumentState>(value) {
                Ok(state) => {
                    snapshot.instruments.insert(name.trim().to_string(), state);
                }
                Err(e) => warn!(instrument = %name, "skipping state entry: {e}"),
            }
        }
        Ok(snapshot)
    }
}

impl SnapshotPort for JsonSnapshotAdapter {
    fn load_snapshot(&self, path: &Path) -> Result<StateSnapshot, EtfProfitError> {
        let parse_error = |reason: String| EtfProfitError::SnapshotParse {
            file: path.display().to_string(),
            reason,
        };
        let content = fs::read_to_string(path).map_err(|e| parse_error(e.to_string()))?;
        Self::parse(&content).map_err(parse_error)
    }
}
