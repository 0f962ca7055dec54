use super::*;
use tempfile::TempDir;

fn parse(toml_src: &str) -> ProjectConfig {
    toml::from_str(toml_src).expect("valid TOML")
}

#[test]
fn test_default_config_enables_core_rules_only() {
    let config = ProjectConfig::default();
    assert!(config.validate().is_ok());
    assert!(config.is_rule_enabled(RuleId::NullableReturn));
    assert!(config.is_rule_enabled(RuleId::IncompleteConstruction));
    assert!(!config.is_rule_enabled(RuleId::AmbiguousVerb));
    assert!(config.is_rule_enabled(RuleId::ParseFailure));
}

#[test]
fn test_full_config_parses_and_validates() {
    let config = parse(
        r#"
[rules.flag-parameter]
severity = "error"
options = { side_effect_selectors = ["log", "audit"] }

[rules.loop-invariant-reevaluation]
options = { min_chain_depth = 2 }

[rules."advisory/ambiguous-verb"]
enabled = true

[rules.nullable-return]
enabled = false

[exclude]
paths = ["**/generated/**"]

[defaults]
format = "json"
min_severity = "warning"
workers = 8
"#,
    );
    config.validate().expect("config should validate");

    assert!(config.is_rule_enabled(RuleId::AmbiguousVerb));
    assert!(!config.is_rule_enabled(RuleId::NullableReturn));
    assert_eq!(config.severity_override(RuleId::FlagParameter), Some(Severity::Error));
    assert_eq!(config.defaults.workers, Some(8));
    assert!(config
        .exclude
        .effective_patterns()
        .contains(&"**/generated/**".to_string()));
}

#[test]
fn test_unknown_rule_is_rejected() {
    let config = parse("[rules.god-class]\nenabled = false\n");
    assert!(matches!(config.validate(), Err(ConfigError::UnknownRule(id)) if id == "god-class"));
}

#[test]
fn test_unknown_severity_is_rejected() {
    let config = parse("[rules.flag-parameter]\nseverity = \"critical\"\n");
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidSeverity { .. })
    ));

    let config = parse("[defaults]\nmin_severity = \"high\"\n");
    assert!(config.validate().is_err());
}

#[test]
fn test_reserved_rules_cannot_be_disabled() {
    let config = parse("[rules.parse-failure]\nenabled = false\n");
    assert!(matches!(config.validate(), Err(ConfigError::ReservedRule(_))));
}

#[test]
fn test_options_are_checked() {
    let config = parse("[rules.loop-invariant-reevaluation]\noptions = { min_chain_depth = 0 }\n");
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidOption { .. })
    ));

    let config = parse("[rules.flag-parameter]\noptions = { depth = 3 }\n");
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidOption { message, .. }) if message == "unknown option"
    ));
}

#[test]
fn test_zero_workers_and_bad_format_are_rejected() {
    assert!(matches!(
        parse("[defaults]\nworkers = 0\n").validate(),
        Err(ConfigError::InvalidWorkers(0))
    ));
    assert!(matches!(
        parse("[defaults]\nformat = \"html\"\n").validate(),
        Err(ConfigError::InvalidFormat(_))
    ));
}

#[test]
fn test_bad_glob_is_rejected() {
    let config = parse("[exclude]\npaths = [\"src/[unclosed\"]\n");
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidPattern { .. })
    ));
}

#[test]
fn test_skip_defaults_drops_builtin_excludes() {
    let config = parse("[exclude]\npaths = [\"legacy/**\"]\nskip_defaults = true\n");
    assert_eq!(config.exclude.effective_patterns(), vec!["legacy/**".to_string()]);
}

#[test]
fn test_load_prefers_toml_and_falls_back_to_defaults() {
    let dir = TempDir::new().expect("temp dir");
    let config = load_project_config(dir.path()).expect("no config is fine");
    assert!(config.rules.is_empty());

    std::fs::write(
        dir.path().join(".smellscanrc.json"),
        r#"{"rules": {"flag-parameter": {"enabled": false}}}"#,
    )
    .expect("write json");
    let config = load_project_config(dir.path()).expect("json config");
    assert!(!config.is_rule_enabled(RuleId::FlagParameter));

    std::fs::write(dir.path().join("smellscan.toml"), "[defaults]\nworkers = 2\n")
        .expect("write toml");
    let config = load_project_config(dir.path()).expect("toml config");
    assert_eq!(config.defaults.workers, Some(2));
    assert!(config.is_rule_enabled(RuleId::FlagParameter));
}

#[test]
fn test_invalid_file_is_an_error() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("smellscan.toml"), "[rules\n").expect("write");
    assert!(matches!(
        load_project_config(dir.path()),
        Err(ConfigError::TomlParse { .. })
    ));
}

#[test]
fn test_rule_settings_resolution() {
    let config = parse(
        r#"
[rules.flag-parameter]
severity = "info"
options = { side_effect_selectors = ["audit"] }
"#,
    );
    let settings = RuleSettings::from_project(&config, None);
    assert_eq!(settings.severity(RuleId::FlagParameter), Severity::Info);
    assert_eq!(settings.severity(RuleId::NullCollectionReturn), Severity::Error);
    assert!(!settings.is_enabled(RuleId::ConjunctionName));

    let detector_config = settings.detector_config(&[RuleId::FlagParameter]);
    assert_eq!(
        detector_config.get_option::<Vec<String>>("side_effect_selectors"),
        Some(vec!["audit".to_string()])
    );

    let only = RuleSettings::from_project(&config, Some(&[RuleId::ConjunctionName]));
    assert!(only.is_enabled(RuleId::ConjunctionName));
    assert!(!only.is_enabled(RuleId::FlagParameter));
    assert!(only.is_enabled(RuleId::IoFailure));
}
