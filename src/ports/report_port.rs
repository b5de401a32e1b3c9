//! Report generation port trait.

use crate::domain::analysis::Analysis;
use crate::domain::error::EtfProfitError;
use chrono::NaiveDateTime;
use std::fs;
use std::path::Path;

/// Run-level facts printed alongside the analysis.
pub struct ReportContext<'a> {
    /// Injected so that identical input renders identical text.
    pub generated_at: NaiveDateTime,
    pub log_path: &'a str,
    pub risk_free_rate: f64,
}

/// Port for rendering a completed analysis.
pub trait ReportPort {
    fn render(&self, analysis: &Analysis, ctx: &ReportContext<'_>) -> String;

    /// Default implementation: renders and writes the text to `output_path`.
    fn write(
        &self,
        analysis: &Analysis,
        ctx: &ReportContext<'_>,
        output_path: &Path,
    ) -> Result<(), EtfProfitError> {
        fs::write(output_path, self.render(analysis, ctx))?;
        Ok(())
    }
}
