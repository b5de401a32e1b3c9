//! State snapshot port trait.

use crate::domain::error::EtfProfitError;
use crate::domain::snapshot::StateSnapshot;
use std::path::Path;

pub trait SnapshotPort {
    fn load_snapshot(&self, path: &Path) -> Result<StateSnapshot, EtfProfitError>;
}
