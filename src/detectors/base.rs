//! Base detector trait and types
//!
//! This module defines the core abstractions for smell detection:
//! - `Detector` trait that every per-file rule implements
//! - `DetectorConfig` carrying rule-specific options from the project config

use crate::ast::SourceUnit;
use crate::models::{Finding, RuleId};
use std::collections::HashMap;

/// Configuration options for detectors
#[derive(Debug, Clone, Default)]
pub struct DetectorConfig {
    /// Detector-specific thresholds and options
    pub options: HashMap<String, serde_json::Value>,
}

impl DetectorConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom option
    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Get a typed option value
    pub fn get_option<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.options
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Get an option with a default value
    pub fn get_option_or<T: serde::de::DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_option(key).unwrap_or(default)
    }

    /// Get a list-of-strings option, falling back to `default` when absent
    pub fn get_list_or(&self, key: &str, default: &[&str]) -> Vec<String> {
        self.get_option::<Vec<String>>(key)
            .unwrap_or_else(|| default.iter().map(|s| s.to_string()).collect())
    }
}

/// Trait for per-file smell detectors
///
/// A detector inspects one [`SourceUnit`] at a time and returns its findings.
/// Detectors are pure: they never fail, never do I/O and never share state
/// between files, so the pipeline can run them on any worker thread.
///
/// # Example Implementation
///
/// ```ignore
/// pub struct MyDetector {
///     config: DetectorConfig,
/// }
///
/// impl Detector for MyDetector {
///     fn name(&self) -> &'static str { "my-detector" }
///     fn description(&self) -> &'static str { "Finds my smell" }
///     fn rules(&self) -> &'static [RuleId] { &[RuleId::FlagParameter] }
///     fn detect(&self, unit: &SourceUnit) -> Vec<Finding> { vec![] }
/// }
/// ```
pub trait Detector: Send + Sync {
    /// Unique identifier for this detector
    fn name(&self) -> &'static str;

    /// Human-readable description of what this detector finds
    fn description(&self) -> &'static str;

    /// Rule ids this detector may emit
    fn rules(&self) -> &'static [RuleId];

    /// Run detection over one parsed file
    fn detect(&self, unit: &SourceUnit) -> Vec<Finding>;

    /// Get the configuration for this detector
    fn config(&self) -> Option<&DetectorConfig> {
        None
    }
}
