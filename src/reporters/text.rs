//! Text (terminal) reporter
//!
//! One line per finding, `file:line: [severity] rule-id: message`, followed
//! by a summary line. Severity tags are coloured with `console` when enabled.

use crate::models::{AnalysisReport, Finding, Severity};
use anyhow::Result;
use console::Style;

fn severity_style(severity: Severity, colors: bool) -> Style {
    let style = match severity {
        Severity::Error => Style::new().red().bold(),
        Severity::Warning => Style::new().yellow(),
        Severity::Info => Style::new().cyan(),
    };
    style.force_styling(colors)
}

fn format_finding(finding: &Finding, colors: bool) -> String {
    let tag = format!("[{}]", finding.severity);
    format!(
        "{}:{}: {} {}: {}",
        finding.location.file.display(),
        finding.location.line_start,
        severity_style(finding.severity, colors).apply_to(tag),
        finding.rule,
        finding.message
    )
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

/// Render report as terminal output
pub fn render(report: &AnalysisReport, colors: bool) -> Result<String> {
    let mut out = String::new();
    for finding in &report.findings {
        out.push_str(&format_finding(finding, colors));
        out.push('\n');
    }

    let s = &report.summary;
    let dim = Style::new().dim().force_styling(colors);
    out.push_str(&format!(
        "{}\n",
        dim.apply_to(format!(
            "{} ({} error, {} warning, {} info) in {}",
            plural(s.total, "finding"),
            s.error,
            s.warning,
            s.info,
            plural(report.files_analyzed, "file")
        ))
    ));
    Ok(out)
}
