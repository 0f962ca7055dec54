//! Core data models for smellscan
//!
//! These models are the shared vocabulary between detectors, the pipeline
//! and the reporters: rule identifiers, severities, locations and findings.

use crate::ast::Span;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Generate a deterministic finding ID based on content hash.
///
/// Stable across runs and machines so that two analyses of the same input
/// produce byte-identical structured output.
pub fn deterministic_finding_id(rule: RuleId, file: &Path, line: u32, message: &str) -> String {
    let input = format!("{}\n{}\n{}\n{}", rule, file.display(), line, message);
    let digest = Sha256::digest(input.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..16].to_string()
}

/// Severity levels for findings
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Info, Severity::Warning, Severity::Error];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            _ => Err(format!(
                "Unknown severity '{}'. Valid severities: info, warning, error",
                s
            )),
        }
    }
}

/// Identifier of the rule that produced a finding.
///
/// `parse-failure` and the `internal/*` namespace are reserved for
/// recoverable analysis errors and can never be disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RuleId {
    #[serde(rename = "nullable-return")]
    NullableReturn,
    #[serde(rename = "null-collection-return")]
    NullCollectionReturn,
    #[serde(rename = "flag-parameter")]
    FlagParameter,
    #[serde(rename = "loop-invariant-reevaluation")]
    LoopInvariantReevaluation,
    #[serde(rename = "incomplete-construction")]
    IncompleteConstruction,
    #[serde(rename = "advisory/ambiguous-verb")]
    AmbiguousVerb,
    #[serde(rename = "advisory/conjunction-name")]
    ConjunctionName,
    #[serde(rename = "parse-failure")]
    ParseFailure,
    #[serde(rename = "internal/io-failure")]
    IoFailure,
    #[serde(rename = "internal/detector-failure")]
    DetectorFailure,
}

impl RuleId {
    pub const ALL: [RuleId; 10] = [
        RuleId::NullableReturn,
        RuleId::NullCollectionReturn,
        RuleId::FlagParameter,
        RuleId::LoopInvariantReevaluation,
        RuleId::IncompleteConstruction,
        RuleId::AmbiguousVerb,
        RuleId::ConjunctionName,
        RuleId::ParseFailure,
        RuleId::IoFailure,
        RuleId::DetectorFailure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::NullableReturn => "nullable-return",
            RuleId::NullCollectionReturn => "null-collection-return",
            RuleId::FlagParameter => "flag-parameter",
            RuleId::LoopInvariantReevaluation => "loop-invariant-reevaluation",
            RuleId::IncompleteConstruction => "incomplete-construction",
            RuleId::AmbiguousVerb => "advisory/ambiguous-verb",
            RuleId::ConjunctionName => "advisory/conjunction-name",
            RuleId::ParseFailure => "parse-failure",
            RuleId::IoFailure => "internal/io-failure",
            RuleId::DetectorFailure => "internal/detector-failure",
        }
    }

    /// Reserved ids used to surface recoverable analysis errors
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            RuleId::ParseFailure | RuleId::IoFailure | RuleId::DetectorFailure
        )
    }

    /// Best-effort naming heuristics, off unless explicitly enabled
    pub fn is_advisory(&self) -> bool {
        matches!(self, RuleId::AmbiguousVerb | RuleId::ConjunctionName)
    }

    /// Whether the rule runs when the configuration does not mention it
    pub fn enabled_by_default(&self) -> bool {
        !self.is_advisory()
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            RuleId::NullCollectionReturn
            | RuleId::ParseFailure
            | RuleId::IoFailure
            | RuleId::DetectorFailure => Severity::Error,
            RuleId::NullableReturn
            | RuleId::FlagParameter
            | RuleId::LoopInvariantReevaluation
            | RuleId::IncompleteConstruction => Severity::Warning,
            RuleId::AmbiguousVerb | RuleId::ConjunctionName => Severity::Info,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RuleId::NullableReturn => {
                "Undocumented `return null` from a method returning an object"
            }
            RuleId::NullCollectionReturn => "`return null` from a method returning a collection",
            RuleId::FlagParameter => "Boolean parameter that selects between different behaviours",
            RuleId::LoopInvariantReevaluation => {
                "Loop-invariant call chain evaluated repeatedly inside a loop body \
                 (calls whose result is discarded, like `metrics.flush();`, are not counted)"
            }
            RuleId::IncompleteConstruction => {
                "Object built via setters that skips setters called at other construction sites"
            }
            RuleId::AmbiguousVerb => "Method name starts with a vague verb (advisory)",
            RuleId::ConjunctionName => "Method name joins two actions with `And` (advisory)",
            RuleId::ParseFailure => "Source file could not be parsed",
            RuleId::IoFailure => "Source file could not be read",
            RuleId::DetectorFailure => "A detector failed while analysing a file",
        }
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        RuleId::ALL
            .iter()
            .copied()
            .find(|rule| rule.as_str() == wanted)
            .ok_or_else(|| format!("Unknown rule '{}'", s))
    }
}

/// A source range inside one file (1-based lines and columns)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: PathBuf,
    pub line_start: u32,
    pub line_end: u32,
    pub column_start: u32,
    pub column_end: u32,
}

impl Location {
    pub fn new(file: impl Into<PathBuf>, span: Span) -> Self {
        Self {
            file: file.into(),
            line_start: span.line_start,
            line_end: span.line_end,
            column_start: span.column_start,
            column_end: span.column_end,
        }
    }

    /// Location of a whole file, used when no finer position is known
    pub fn file_start(file: impl Into<PathBuf>) -> Self {
        Self::new(file, Span::point(1, 1))
    }
}

/// Secondary location backing up a finding (evidence, other occurrences)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedLocation {
    pub location: Location,
    pub note: String,
}

/// A code smell or analysis failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub rule: RuleId,
    pub severity: Severity,
    pub location: Location,
    pub message: String,
    #[serde(default)]
    pub suggested_fix: Option<String>,
    #[serde(default)]
    pub related: Vec<RelatedLocation>,
}

impl Finding {
    /// Create a finding with the rule's default severity
    pub fn new(rule: RuleId, location: Location, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            id: deterministic_finding_id(rule, &location.file, location.line_start, &message),
            rule,
            severity: rule.default_severity(),
            location,
            message,
            suggested_fix: None,
            related: Vec::new(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }

    pub fn with_related(mut self, location: Location, note: impl Into<String>) -> Self {
        self.related.push(RelatedLocation {
            location,
            note: note.into(),
        });
        self
    }

    /// Whether this finding meets or exceeds `threshold`
    pub fn meets(&self, threshold: Severity) -> bool {
        self.severity >= threshold
    }
}

/// Summary of findings by severity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingsSummary {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
    pub total: usize,
}

impl FindingsSummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = Self::default();
        for f in findings {
            match f.severity {
                Severity::Error => summary.error += 1,
                Severity::Warning => summary.warning += 1,
                Severity::Info => summary.info += 1,
            }
            summary.total += 1;
        }
        summary
    }
}

/// Result of one analysis run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub findings: Vec<Finding>,
    pub summary: FindingsSummary,
    pub files_analyzed: usize,
    pub files_failed: usize,
    pub functions_analyzed: usize,
}

impl AnalysisReport {
    pub fn new(
        findings: Vec<Finding>,
        files_analyzed: usize,
        files_failed: usize,
        functions_analyzed: usize,
    ) -> Self {
        Self {
            summary: FindingsSummary::from_findings(&findings),
            findings,
            files_analyzed,
            files_failed,
            functions_analyzed,
        }
    }

    /// Whether any finding meets or exceeds `threshold`
    pub fn has_findings_at(&self, threshold: Severity) -> bool {
        self.findings.iter().any(|f| f.meets(threshold))
    }

    /// Keep only findings at or above `threshold` (display filter)
    pub fn retain_at_least(&mut self, threshold: Severity) {
        self.findings.retain(|f| f.meets(threshold));
        self.summary = FindingsSummary::from_findings(&self.findings);
    }
}
