//! Report output port trait.

use crate::domain::error::WalkforwardError;
use crate::domain::metrics::RunSummary;
use crate::domain::walkforward::WalkForwardReport;
use std::path::Path;

/// Port for persisting a completed run.
pub trait ReportPort {
    fn write(
        &self,
        report: &WalkForwardReport,
        summary: &RunSummary,
        output_dir: &Path,
    ) -> Result<(), WalkforwardError>;
}
