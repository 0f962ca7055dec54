use super::*;
use crate::config::ProjectConfig;
use crate::models::Severity;
use std::fs;
use tempfile::TempDir;

const INTAKE: &str = r#"class Intake {
    Feedback open(String id) {
        Feedback fb = new Feedback();
        fb.setCorrelationId(id);
        fb.setPhase(Phase.OPEN);
        return fb;
    }
}
"#;

const RETRY: &str = r#"class Retry {
    Feedback retry(String id) {
        Feedback fb = new Feedback();
        fb.setCorrelationId(id);
        return fb;
    }
}
"#;

const REPO: &str = r#"class Repo {
    User find(String id) {
        if (id.isEmpty()) {
            return null;
        }
        return lookup(id);
    }

    List<User> all() {
        return null;
    }
}
"#;

fn workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create dirs");
        }
        fs::write(path, content).expect("write fixture");
    }
    dir
}

fn analyzer() -> Analyzer {
    Analyzer::new(RuleSettings::default()).with_workers(2)
}

fn rules_and_lines(report: &AnalysisReport) -> Vec<(RuleId, String, u32)> {
    report
        .findings
        .iter()
        .map(|f| {
            let name = f
                .location
                .file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            (f.rule, name, f.location.line_start)
        })
        .collect()
}

#[test]
fn test_per_file_and_global_findings_are_ordered() {
    let dir = workspace(&[
        ("src/Intake.java", INTAKE),
        ("src/Retry.java", RETRY),
        ("src/Repo.java", REPO),
    ]);
    let report = analyzer()
        .run(&[dir.path().to_path_buf()])
        .expect("analysis should run");

    assert_eq!(report.files_analyzed, 3);
    assert_eq!(report.files_failed, 0);
    assert_eq!(report.functions_analyzed, 4);
    assert_eq!(
        rules_and_lines(&report),
        vec![
            (RuleId::NullableReturn, "Repo.java".to_string(), 4),
            (RuleId::NullCollectionReturn, "Repo.java".to_string(), 10),
            (RuleId::IncompleteConstruction, "Retry.java".to_string(), 3),
        ]
    );
    assert_eq!(report.summary.error, 1);
    assert_eq!(report.summary.warning, 2);
}

#[test]
fn test_two_runs_are_identical() {
    let dir = workspace(&[
        ("Intake.java", INTAKE),
        ("Retry.java", RETRY),
        ("Repo.java", REPO),
    ]);
    let first = analyzer().run(&[dir.path().to_path_buf()]).expect("first run");
    let second = Analyzer::new(RuleSettings::default())
        .with_workers(4)
        .run(&[dir.path().to_path_buf()])
        .expect("second run");
    assert_eq!(
        serde_json::to_string(&first.findings).expect("serialize"),
        serde_json::to_string(&second.findings).expect("serialize")
    );
}

#[test]
fn test_parse_failure_does_not_abort_the_run() {
    let dir = workspace(&[
        ("Broken.java", "class Broken {\n    void f( {\n}\n"),
        ("Repo.java", REPO),
    ]);
    let report = analyzer()
        .run(&[dir.path().to_path_buf()])
        .expect("analysis should run");

    assert_eq!(report.files_failed, 1);
    let broken: Vec<&Finding> = report
        .findings
        .iter()
        .filter(|f| f.rule == RuleId::ParseFailure)
        .collect();
    assert_eq!(broken.len(), 1);
    assert_eq!(broken[0].severity, Severity::Error);
    assert!(broken[0].location.file.ends_with("Broken.java"));
    assert!(report
        .findings
        .iter()
        .any(|f| f.rule == RuleId::NullCollectionReturn));
}

#[test]
fn test_deeply_nested_expression_is_a_parse_failure() {
    let terms: Vec<String> = (0..10_000).map(|i| format!("\"s{}\"", i)).collect();
    let big = format!("class Big {{\n    String s() {{ return {}; }}\n}}\n", terms.join(" + "));
    let dir = workspace(&[("Big.java", big.as_str()), ("Repo.java", REPO)]);
    let report = analyzer()
        .run(&[dir.path().to_path_buf()])
        .expect("analysis should run");

    assert_eq!(report.files_analyzed, 2);
    assert_eq!(report.files_failed, 1);
    let failure = report
        .findings
        .iter()
        .find(|f| f.rule == RuleId::ParseFailure)
        .expect("parse failure finding");
    assert!(failure.location.file.ends_with("Big.java"));
    assert!(failure.message.contains("nesting"), "got {}", failure.message);
    assert!(report
        .findings
        .iter()
        .any(|f| f.rule == RuleId::NullCollectionReturn));
}

#[test]
fn test_unreadable_file_is_an_io_failure() {
    let dir = TempDir::new().expect("temp dir");
    let missing = dir.path().join("Gone.java");
    let report = analyzer()
        .run_files(&[missing])
        .expect("analysis should run");
    assert_eq!(report.files_failed, 1);
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].rule, RuleId::IoFailure);
    assert_eq!(report.findings[0].location.line_start, 1);
}

#[test]
fn test_cancelled_run_discards_results() {
    let dir = workspace(&[("Repo.java", REPO)]);
    let token = CancellationToken::new();
    token.cancel();
    let result = analyzer()
        .with_cancellation(token)
        .run(&[dir.path().to_path_buf()]);
    assert!(matches!(result, Err(AnalysisError::Cancelled)));
}

struct PanickingDetector;

impl Detector for PanickingDetector {
    fn name(&self) -> &'static str {
        "panicking"
    }

    fn description(&self) -> &'static str {
        "Always panics"
    }

    fn rules(&self) -> &'static [RuleId] {
        &[RuleId::FlagParameter]
    }

    fn detect(&self, _unit: &SourceUnit) -> Vec<Finding> {
        panic!("unexpected tree shape");
    }
}

#[test]
fn test_detector_panic_becomes_a_finding() {
    let dir = workspace(&[("Repo.java", REPO)]);
    let report = analyzer()
        .with_detectors(vec![Arc::new(PanickingDetector)])
        .run(&[dir.path().to_path_buf()])
        .expect("analysis should run");

    let failure = report
        .findings
        .iter()
        .find(|f| f.rule == RuleId::DetectorFailure)
        .expect("detector failure finding");
    assert!(failure.message.contains("panicking"));
    assert!(failure.message.contains("unexpected tree shape"));
}

#[test]
fn test_configured_severity_and_disabled_rules() {
    let config: ProjectConfig = toml::from_str(
        r#"
[rules.nullable-return]
severity = "error"

[rules.incomplete-construction]
enabled = false
"#,
    )
    .expect("valid config");
    let dir = workspace(&[
        ("Intake.java", INTAKE),
        ("Retry.java", RETRY),
        ("Repo.java", REPO),
    ]);
    let report = Analyzer::new(RuleSettings::from_project(&config, None))
        .with_workers(1)
        .run(&[dir.path().to_path_buf()])
        .expect("analysis should run");

    assert!(report
        .findings
        .iter()
        .all(|f| f.rule != RuleId::IncompleteConstruction));
    let nullable = report
        .findings
        .iter()
        .find(|f| f.rule == RuleId::NullableReturn)
        .expect("nullable-return finding");
    assert_eq!(nullable.severity, Severity::Error);
}

#[test]
fn test_progress_callback_sees_every_file() {
    let dir = workspace(&[("Intake.java", INTAKE), ("Retry.java", RETRY)]);
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    analyzer()
        .with_progress_callback(Arc::new(move |_path: &Path, _done: usize, total: usize| {
            assert_eq!(total, 2);
            counter.fetch_add(1, Ordering::SeqCst);
        }))
        .run(&[dir.path().to_path_buf()])
        .expect("analysis should run");
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}
