//! Advisory naming detector
//!
//! Best-effort method-name heuristics. Both rules are `info` severity and off
//! unless enabled in the project config or with `--rules`:
//! - `advisory/ambiguous-verb`: names led by a vague verb (`handleData`)
//! - `advisory/conjunction-name`: names joining two actions (`validateAndSave`)
//!
//! Methods annotated `@Override` are skipped since their name is inherited.

use crate::ast::{FunctionDecl, SourceUnit};
use crate::detectors::base::{Detector, DetectorConfig};
use crate::models::{Finding, Location, RuleId};
use regex::Regex;
use std::sync::OnceLock;

static CAMEL_SEGMENT: OnceLock<Regex> = OnceLock::new();

fn camel_segment() -> &'static Regex {
    CAMEL_SEGMENT.get_or_init(|| {
        Regex::new(r"[A-Z]+[a-z0-9]*|[a-z][a-z0-9]*").expect("valid regex")
    })
}

/// Leading verbs that say little about what a method does
pub const DEFAULT_AMBIGUOUS_VERBS: &[&str] =
    &["check", "process", "handle", "manage", "do", "perform", "deal"];

pub struct NamingDetector {
    config: DetectorConfig,
    ambiguous_verbs: Vec<String>,
}

impl NamingDetector {
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::default())
    }

    pub fn with_config(config: DetectorConfig) -> Self {
        let ambiguous_verbs = config.get_list_or("ambiguous_verbs", DEFAULT_AMBIGUOUS_VERBS);
        Self {
            config,
            ambiguous_verbs,
        }
    }

    fn check_function(&self, unit: &SourceUnit, function: &FunctionDecl) -> Vec<Finding> {
        let mut findings = Vec::new();
        let segments = split_camel(&function.name);
        let location = Location::new(&unit.path, function.name_span);

        if let Some(first) = segments.first() {
            if self.ambiguous_verbs.iter().any(|v| v == first) {
                findings.push(
                    Finding::new(
                        RuleId::AmbiguousVerb,
                        location.clone(),
                        format!(
                            "Method name `{}` starts with the vague verb `{}`",
                            function.name, first
                        ),
                    )
                    .with_fix("Name the method after the specific effect or result it produces"),
                );
            }
        }

        let inner = segments.len().saturating_sub(1);
        if segments.iter().take(inner).skip(1).any(|s| s == "And") {
            findings.push(
                Finding::new(
                    RuleId::ConjunctionName,
                    location,
                    format!("Method name `{}` joins two actions with `And`", function.name),
                )
                .with_fix("Split the method so each one does a single thing"),
            );
        }
        findings
    }
}

impl Default for NamingDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn split_camel(name: &str) -> Vec<String> {
    camel_segment()
        .find_iter(name)
        .map(|m| m.as_str().to_string())
        .collect()
}

impl Detector for NamingDetector {
    fn name(&self) -> &'static str {
        "advisory-naming"
    }

    fn description(&self) -> &'static str {
        "Advisory method-name heuristics (vague verbs, conjunctions)"
    }

    fn rules(&self) -> &'static [RuleId] {
        &[RuleId::AmbiguousVerb, RuleId::ConjunctionName]
    }

    fn detect(&self, unit: &SourceUnit) -> Vec<Finding> {
        unit.functions()
            .into_iter()
            .filter(|f| !f.is_constructor())
            .filter(|f| !f.annotations.iter().any(|a| a == "@Override"))
            .flat_map(|f| self.check_function(unit, f))
            .collect()
    }

    fn config(&self) -> Option<&DetectorConfig> {
        Some(&self.config)
    }
}
