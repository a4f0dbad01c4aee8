//! JSON reporter
//!
//! Outputs the DiagnosisReport as pretty-printed JSON for piping to jq.

use super::DiagnosisReport;
use anyhow::Result;

pub fn render(report: &DiagnosisReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
