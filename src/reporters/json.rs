//! JSON reporter
//!
//! Flat, stable records for machine consumption. Field order is fixed and no
//! timestamps or hash-ordered maps are emitted, so two runs over the same
//! input produce byte-identical output.

use crate::models::{AnalysisReport, Finding, FindingsSummary};
use anyhow::Result;
use serde::Serialize;

#[derive(Serialize)]
struct JsonReport<'a> {
    findings: Vec<JsonFinding<'a>>,
    summary: &'a FindingsSummary,
    files_analyzed: usize,
    files_failed: usize,
}

#[derive(Serialize)]
struct JsonFinding<'a> {
    id: &'a str,
    file: String,
    line: u32,
    line_end: u32,
    column_start: u32,
    column_end: u32,
    rule: &'static str,
    severity: &'static str,
    internal: bool,
    message: &'a str,
    suggested_fix: Option<&'a str>,
    related: Vec<JsonRelated<'a>>,
}

#[derive(Serialize)]
struct JsonRelated<'a> {
    file: String,
    line: u32,
    column: u32,
    note: &'a str,
}

impl<'a> From<&'a Finding> for JsonFinding<'a> {
    fn from(f: &'a Finding) -> Self {
        Self {
            id: &f.id,
            file: f.location.file.display().to_string(),
            line: f.location.line_start,
            line_end: f.location.line_end,
            column_start: f.location.column_start,
            column_end: f.location.column_end,
            rule: f.rule.as_str(),
            severity: f.severity.as_str(),
            internal: f.rule.is_internal(),
            message: &f.message,
            suggested_fix: f.suggested_fix.as_deref(),
            related: f
                .related
                .iter()
                .map(|r| JsonRelated {
                    file: r.location.file.display().to_string(),
                    line: r.location.line_start,
                    column: r.location.column_start,
                    note: &r.note,
                })
                .collect(),
        }
    }
}

/// Render report as pretty-printed JSON
pub fn render(report: &AnalysisReport) -> Result<String> {
    let doc = JsonReport {
        findings: report.findings.iter().map(JsonFinding::from).collect(),
        summary: &report.summary,
        files_analyzed: report.files_analyzed,
        files_failed: report.files_failed,
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}
