//! Project-level configuration support
//!
//! Loads per-project configuration from `smellscan.toml` or
//! `.smellscanrc.json` in the first analysed directory, or from an explicit
//! `--config` file.
//!
//! # Configuration Format
//!
//! ```toml
//! # smellscan.toml
//!
//! [rules.flag-parameter]
//! severity = "error"
//! options = { side_effect_selectors = ["log", "audit"] }
//!
//! [rules.loop-invariant-reevaluation]
//! options = { min_chain_depth = 2 }
//!
//! [rules."advisory/ambiguous-verb"]
//! enabled = true
//!
//! [exclude]
//! paths = ["**/generated/**"]
//!
//! [defaults]
//! format = "text"
//! min_severity = "warning"
//! workers = 8
//! ```
//!
//! A configuration that names an unknown rule, severity, option, format or
//! glob is rejected before any file is analysed.

use crate::detectors::DetectorConfig;
use crate::error::ConfigError;
use crate::models::{RuleId, Severity};
use crate::reporters::OutputFormat;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tracing::debug;

/// Config file names looked up in the analysed directory, in order
pub const CONFIG_FILE_NAMES: &[&str] = &["smellscan.toml", ".smellscanrc.json"];

/// Built-in exclusion patterns for build output and generated sources.
/// These are applied automatically unless `skip_defaults = true` in config.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "**/target/**",
    "**/build/**",
    "**/.gradle/**",
    "**/node_modules/**",
    "**/generated-sources/**",
];

/// Options each rule understands, with the expected value shape
const RULE_OPTIONS: &[(RuleId, &str, OptionKind)] = &[
    (RuleId::FlagParameter, "side_effect_selectors", OptionKind::StringList),
    (RuleId::LoopInvariantReevaluation, "min_chain_depth", OptionKind::PositiveInteger),
    (RuleId::LoopInvariantReevaluation, "impure_selectors", OptionKind::StringList),
    (RuleId::IncompleteConstruction, "mutator_prefixes", OptionKind::StringList),
    (RuleId::AmbiguousVerb, "ambiguous_verbs", OptionKind::StringList),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OptionKind {
    StringList,
    PositiveInteger,
}

impl OptionKind {
    fn accepts(&self, value: &serde_json::Value) -> bool {
        match self {
            OptionKind::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(|v| v.is_string())),
            OptionKind::PositiveInteger => value.as_u64().is_some_and(|n| n >= 1),
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            OptionKind::StringList => "expected a list of strings",
            OptionKind::PositiveInteger => "expected a positive integer",
        }
    }
}

/// Project-level configuration loaded from smellscan.toml or similar
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProjectConfig {
    /// Per-rule configuration overrides, keyed by rule id
    #[serde(default)]
    pub rules: BTreeMap<String, RuleOverride>,

    /// Path exclusion patterns
    #[serde(default)]
    pub exclude: ExcludeConfig,

    /// Default CLI flags
    #[serde(default)]
    pub defaults: CliDefaults,
}

/// Configuration override for a specific rule
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RuleOverride {
    /// Whether the rule runs (default: on, except advisory rules)
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Override the default severity (info, warning, error)
    #[serde(default)]
    pub severity: Option<String>,

    /// Rule-specific options
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

/// Path exclusion configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ExcludeConfig {
    /// Paths/patterns to exclude from analysis
    #[serde(default)]
    pub paths: Vec<String>,

    /// If true, disable built-in default exclusion patterns
    #[serde(default)]
    pub skip_defaults: bool,
}

impl ExcludeConfig {
    /// Returns effective exclusion patterns (defaults + user patterns).
    /// If `skip_defaults` is true, only user patterns are returned.
    pub fn effective_patterns(&self) -> Vec<String> {
        let mut patterns = Vec::new();
        if !self.skip_defaults {
            patterns.extend(DEFAULT_EXCLUDE_PATTERNS.iter().map(|s| s.to_string()));
        }
        for p in &self.paths {
            if !patterns.contains(p) {
                patterns.push(p.clone());
            }
        }
        patterns
    }
}

/// Default CLI flags that can be set in project config
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CliDefaults {
    /// Default output format (text, json, sarif)
    #[serde(default)]
    pub format: Option<String>,

    /// Lowest severity that makes the run exit with status 1
    #[serde(default)]
    pub min_severity: Option<String>,

    /// Lowest severity shown in the report
    #[serde(default)]
    pub severity: Option<String>,

    /// Default number of workers
    #[serde(default)]
    pub workers: Option<usize>,
}

/// Load project configuration from the analysed directory.
///
/// Searches for `smellscan.toml`, then `.smellscanrc.json`. Returns the
/// default configuration when neither exists; a file that exists but does
/// not parse or validate is an error.
pub fn load_project_config(dir: &Path) -> Result<ProjectConfig, ConfigError> {
    for name in CONFIG_FILE_NAMES {
        let path = dir.join(name);
        if path.is_file() {
            let config = load_config_file(&path)?;
            debug!("Loaded project config from {}", path.display());
            return Ok(config);
        }
    }
    debug!("No project config found in {}, using defaults", dir.display());
    Ok(ProjectConfig::default())
}

/// Load and validate one config file; the format follows the extension
pub fn load_config_file(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let config = if path.extension().is_some_and(|e| e == "json") {
        serde_json::from_str::<ProjectConfig>(&content).map_err(|source| {
            ConfigError::JsonParse {
                path: path.to_path_buf(),
                source,
            }
        })?
    } else {
        toml::from_str::<ProjectConfig>(&content).map_err(|source| ConfigError::TomlParse {
            path: path.to_path_buf(),
            source,
        })?
    };
    config.validate()?;
    Ok(config)
}

/// Parse a severity name, naming `context` in the error
pub fn parse_severity(value: &str, context: &str) -> Result<Severity, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidSeverity {
        context: context.to_string(),
        value: value.to_string(),
    })
}

/// Reject worker counts outside 1..=64
pub fn validate_workers(workers: usize) -> Result<usize, ConfigError> {
    if (1..=64).contains(&workers) {
        Ok(workers)
    } else {
        Err(ConfigError::InvalidWorkers(workers))
    }
}

impl ProjectConfig {
    /// Check every rule id, severity, option, glob and default
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (id, rule_config) in &self.rules {
            let rule: RuleId = id
                .parse()
                .map_err(|_| ConfigError::UnknownRule(id.clone()))?;

            if rule.is_internal() && rule_config.enabled == Some(false) {
                return Err(ConfigError::ReservedRule(id.clone()));
            }
            if let Some(severity) = &rule_config.severity {
                parse_severity(severity, &format!("rules.{}", id))?;
            }
            for (option, value) in &rule_config.options {
                let kind = RULE_OPTIONS
                    .iter()
                    .find(|(r, name, _)| *r == rule && name == option)
                    .map(|(_, _, kind)| *kind)
                    .ok_or_else(|| ConfigError::InvalidOption {
                        rule: id.clone(),
                        option: option.clone(),
                        message: "unknown option".to_string(),
                    })?;
                if !kind.accepts(value) {
                    return Err(ConfigError::InvalidOption {
                        rule: id.clone(),
                        option: option.clone(),
                        message: kind.expected().to_string(),
                    });
                }
            }
        }

        for pattern in &self.exclude.paths {
            validate_glob(pattern)?;
        }

        if let Some(format) = &self.defaults.format {
            format
                .parse::<OutputFormat>()
                .map_err(|_| ConfigError::InvalidFormat(format.clone()))?;
        }
        if let Some(severity) = &self.defaults.min_severity {
            parse_severity(severity, "defaults.min_severity")?;
        }
        if let Some(severity) = &self.defaults.severity {
            parse_severity(severity, "defaults.severity")?;
        }
        if let Some(workers) = self.defaults.workers {
            validate_workers(workers)?;
        }
        Ok(())
    }

    fn rule_override(&self, rule: RuleId) -> Option<&RuleOverride> {
        self.rules.get(rule.as_str())
    }

    /// Check if a rule is enabled (advisory rules default to off)
    pub fn is_rule_enabled(&self, rule: RuleId) -> bool {
        if rule.is_internal() {
            return true;
        }
        self.rule_override(rule)
            .and_then(|c| c.enabled)
            .unwrap_or_else(|| rule.enabled_by_default())
    }

    /// Severity override for a rule (if any)
    pub fn severity_override(&self, rule: RuleId) -> Option<Severity> {
        self.rule_override(rule)
            .and_then(|c| c.severity.as_deref())
            .and_then(|s| s.parse().ok())
    }

    /// Options configured for a rule
    pub fn rule_options(&self, rule: RuleId) -> HashMap<String, serde_json::Value> {
        self.rule_override(rule)
            .map(|c| c.options.clone())
            .unwrap_or_default()
    }
}

/// An exclude glob must be accepted by the override matcher
pub fn validate_glob(pattern: &str) -> Result<(), ConfigError> {
    let mut builder = ignore::overrides::OverrideBuilder::new(".");
    builder
        .add(&format!("!{}", pattern))
        .map(|_| ())
        .map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Effective per-rule settings for one run: project config plus CLI overrides
#[derive(Debug, Clone)]
pub struct RuleSettings {
    enabled: BTreeSet<RuleId>,
    severities: BTreeMap<RuleId, Severity>,
    options: BTreeMap<RuleId, HashMap<String, serde_json::Value>>,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self::from_project(&ProjectConfig::default(), None)
    }
}

impl RuleSettings {
    /// Resolve settings; `only` (from `--rules`) replaces the enabled set
    pub fn from_project(config: &ProjectConfig, only: Option<&[RuleId]>) -> Self {
        let enabled = RuleId::ALL
            .iter()
            .copied()
            .filter(|rule| match only {
                Some(selected) => rule.is_internal() || selected.contains(rule),
                None => config.is_rule_enabled(*rule),
            })
            .collect();
        let severities = RuleId::ALL
            .iter()
            .map(|rule| {
                let severity = config
                    .severity_override(*rule)
                    .unwrap_or_else(|| rule.default_severity());
                (*rule, severity)
            })
            .collect();
        let options = RuleId::ALL
            .iter()
            .map(|rule| (*rule, config.rule_options(*rule)))
            .collect();
        Self {
            enabled,
            severities,
            options,
        }
    }

    pub fn is_enabled(&self, rule: RuleId) -> bool {
        rule.is_internal() || self.enabled.contains(&rule)
    }

    pub fn enabled_rules(&self) -> impl Iterator<Item = RuleId> + '_ {
        self.enabled.iter().copied()
    }

    pub fn severity(&self, rule: RuleId) -> Severity {
        self.severities
            .get(&rule)
            .copied()
            .unwrap_or_else(|| rule.default_severity())
    }

    /// Detector options for the given rules, merged in order
    pub fn detector_config(&self, rules: &[RuleId]) -> DetectorConfig {
        let mut config = DetectorConfig::new();
        for rule in rules {
            if let Some(options) = self.options.get(rule) {
                for (key, value) in options {
                    config = config.with_option(key.clone(), value.clone());
                }
            }
        }
        config
    }
}

#[cfg(test)]
mod tests;
