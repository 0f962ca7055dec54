//! SARIF 2.1.0 reporter for GitHub Code Scanning and VS Code integration
//!
//! Generates SARIF (Static Analysis Results Interchange Format) output
//! compliant with OASIS SARIF 2.1.0 specification.
//!
//! Reference: https://docs.oasis-open.org/sarif/sarif/v2.1.0/sarif-v2.1.0.html

use crate::models::{AnalysisReport, Finding, RuleId, Severity};
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

/// SARIF schema URI
const SARIF_SCHEMA: &str =
    "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";
const SARIF_VERSION: &str = "2.1.0";

/// Map smellscan severity to SARIF level
fn severity_to_sarif_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "note",
    }
}

// ============================================================================
// SARIF Data Structures
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifReport {
    #[serde(rename = "$schema")]
    schema: String,
    version: String,
    runs: Vec<SarifRun>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRun {
    tool: SarifTool,
    results: Vec<SarifResult>,
    invocations: Vec<SarifInvocation>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifDriver {
    name: String,
    version: String,
    rules: Vec<SarifRule>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRule {
    id: String,
    short_description: SarifMessage,
    default_configuration: SarifConfiguration,
    properties: SarifRuleProperties,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifConfiguration {
    level: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRuleProperties {
    tags: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifResult {
    rule_id: String,
    rule_index: usize,
    level: String,
    message: SarifMessage,
    locations: Vec<SarifLocation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    related_locations: Vec<SarifLocation>,
    fingerprints: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fixes: Vec<SarifFix>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<usize>,
    physical_location: SarifPhysicalLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<SarifMessage>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifPhysicalLocation {
    artifact_location: SarifArtifactLocation,
    region: SarifRegion,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifArtifactLocation {
    uri: String,
    uri_base_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRegion {
    start_line: u32,
    start_column: u32,
    end_line: u32,
    end_column: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifMessage {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifInvocation {
    execution_successful: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifFix {
    description: SarifMessage,
}

// ============================================================================
// Implementation
// ============================================================================

/// Render report as SARIF 2.1.0 JSON
pub fn render(report: &AnalysisReport) -> Result<String> {
    let sarif = build_sarif(report);
    Ok(serde_json::to_string_pretty(&sarif)?)
}

/// Build the complete SARIF document
fn build_sarif(report: &AnalysisReport) -> SarifReport {
    // Only rules that produced results, in declaration order
    let used: Vec<RuleId> = RuleId::ALL
        .iter()
        .copied()
        .filter(|rule| report.findings.iter().any(|f| f.rule == *rule))
        .collect();

    let rules = used.iter().map(|rule| build_rule(*rule)).collect();
    let results = report
        .findings
        .iter()
        .map(|f| build_result(f, used.iter().position(|r| *r == f.rule).unwrap_or(0)))
        .collect();

    SarifReport {
        schema: SARIF_SCHEMA.to_string(),
        version: SARIF_VERSION.to_string(),
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: "smellscan".to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    rules,
                },
            },
            results,
            invocations: vec![SarifInvocation {
                execution_successful: true,
            }],
        }],
    }
}

fn build_rule(rule: RuleId) -> SarifRule {
    let mut tags = vec!["code-smell".to_string()];
    if rule.is_internal() {
        tags = vec!["internal".to_string()];
    } else if rule.is_advisory() {
        tags.push("advisory".to_string());
    }
    SarifRule {
        id: rule.as_str().to_string(),
        short_description: SarifMessage {
            text: rule.description().to_string(),
        },
        default_configuration: SarifConfiguration {
            level: severity_to_sarif_level(rule.default_severity()).to_string(),
        },
        properties: SarifRuleProperties { tags },
    }
}

fn physical_location(location: &crate::models::Location) -> SarifPhysicalLocation {
    SarifPhysicalLocation {
        artifact_location: SarifArtifactLocation {
            uri: location.file.display().to_string().replace('\\', "/"),
            uri_base_id: "%SRCROOT%".to_string(),
        },
        region: SarifRegion {
            start_line: location.line_start,
            start_column: location.column_start,
            end_line: location.line_end,
            end_column: location.column_end,
        },
    }
}

/// Build a SARIF result from a finding
fn build_result(finding: &Finding, rule_index: usize) -> SarifResult {
    let mut fingerprints = BTreeMap::new();
    fingerprints.insert("smellscan/finding/v1".to_string(), finding.id.clone());

    let related_locations = finding
        .related
        .iter()
        .enumerate()
        .map(|(i, r)| SarifLocation {
            id: Some(i),
            physical_location: physical_location(&r.location),
            message: Some(SarifMessage {
                text: r.note.clone(),
            }),
        })
        .collect();

    let fixes = finding
        .suggested_fix
        .as_ref()
        .map(|fix| {
            vec![SarifFix {
                description: SarifMessage { text: fix.clone() },
            }]
        })
        .unwrap_or_default();

    SarifResult {
        rule_id: finding.rule.as_str().to_string(),
        rule_index,
        level: severity_to_sarif_level(finding.severity).to_string(),
        message: SarifMessage {
            text: finding.message.clone(),
        },
        locations: vec![SarifLocation {
            id: None,
            physical_location: physical_location(&finding.location),
            message: None,
        }],
        related_locations,
        fingerprints,
        fixes,
    }
}
