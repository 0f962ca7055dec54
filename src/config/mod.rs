//! Configuration module for smellscan
//!
//! This module handles:
//! - Project-level configuration (smellscan.toml / .smellscanrc.json)
//! - Per-rule enablement, severity and option overrides
//! - CLI defaults

mod project_config;

pub use project_config::{
    load_config_file, load_project_config, parse_severity, validate_glob, validate_workers,
    CliDefaults, ExcludeConfig, ProjectConfig, RuleOverride, RuleSettings, CONFIG_FILE_NAMES,
    DEFAULT_EXCLUDE_PATTERNS,
};
