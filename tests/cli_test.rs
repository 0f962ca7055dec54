//! CLI contract tests
//!
//! Drive the compiled binary on temporary Java workspaces and check exit
//! codes, JSON output and the documented scenarios end to end.

use std::path::Path;
use std::process::Command;

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

const LOOKUP: &str = r#"class Lookup {
    User find(String id) {
        return null;
    }
}
"#;

const CLEAN: &str = r#"class Clean {
    int twice(int x) {
        return x * 2;
    }
}
"#;

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

const DOWNLOADER: &str = r#"class Downloader {
    void run(Config config, List<Item> items) {
        for (Item item : items) {
            String url = config.getEntities().getDownload().getUrl();
            int retries = config.getEntities().getDownload().getRetries();
            long timeout = config.getEntities().getDownload().getTimeout();
            fetch(item, url, retries, timeout);
        }
    }
}
"#;

const SHIPPING: &str = r#"class Shipping {
    void ship(Order order, boolean express) {
        if (express) {
            courier.send(order);
        } else {
            post.enqueue(order);
        }
    }

    void handleData(Order order) {
        audit(order);
    }
}
"#;

fn smellscan_bin() -> &'static str {
    env!("CARGO_BIN_EXE_smellscan")
}

fn workspace(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create dirs");
        }
        std::fs::write(path, content).expect("write fixture");
    }
    dir
}

/// Returns (exit code, stdout, stderr)
fn run(args: &[&str], dir: &Path) -> (i32, String, String) {
    let output = Command::new(smellscan_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run smellscan");
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

fn analyze_json(dir: &Path, extra_args: &[&str]) -> (i32, serde_json::Value) {
    let mut args = vec!["analyze", ".", "--format", "json", "--no-progress"];
    args.extend_from_slice(extra_args);
    let (code, stdout, stderr) = run(&args, dir);
    let value = serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("invalid JSON ({}): {}\nstderr: {}", e, stdout, stderr));
    (code, value)
}

fn findings(report: &serde_json::Value) -> Vec<serde_json::Value> {
    report["findings"]
        .as_array()
        .expect("findings array")
        .clone()
}

fn rules_of(report: &serde_json::Value) -> Vec<String> {
    findings(report)
        .iter()
        .map(|f| f["rule"].as_str().unwrap_or_default().to_string())
        .collect()
}

// ============================================================================
// Exit codes
// ============================================================================

#[test]
fn test_clean_code_exits_zero() {
    let dir = workspace(&[("Clean.java", CLEAN)]);
    let (code, stdout, _) = run(&["--no-progress"], dir.path());
    assert_eq!(code, 0);
    assert!(stdout.contains("0 findings"), "stdout: {}", stdout);
}

#[test]
fn test_findings_at_min_severity_exit_one() {
    let dir = workspace(&[("Repo.java", REPO)]);
    let (code, report) = analyze_json(dir.path(), &[]);
    assert_eq!(code, 1);
    assert_eq!(
        rules_of(&report),
        vec!["nullable-return", "null-collection-return"]
    );
}

#[test]
fn test_min_severity_above_every_finding_exits_zero() {
    let dir = workspace(&[("Lookup.java", LOOKUP)]);
    let (code, report) = analyze_json(dir.path(), &["--min-severity", "error"]);
    assert_eq!(code, 0);
    assert_eq!(rules_of(&report), vec!["nullable-return"]);
}

#[test]
fn test_display_filter_does_not_change_exit_code() {
    let dir = workspace(&[("Lookup.java", LOOKUP)]);
    let (code, report) = analyze_json(dir.path(), &["--severity", "error"]);
    assert_eq!(code, 1);
    assert!(findings(&report).is_empty());
}

#[test]
fn test_runs_that_cannot_start_exit_two() {
    let dir = workspace(&[("README.md", "# nothing to scan\n")]);
    let (code, _, stderr) = run(&["analyze", ".", "--no-progress"], dir.path());
    assert_eq!(code, 2);
    assert!(stderr.contains("No Java source files"), "stderr: {}", stderr);

    let (code, _, stderr) = run(&["analyze", "missing-dir", "--no-progress"], dir.path());
    assert_eq!(code, 2);
    assert!(stderr.contains("missing-dir"), "stderr: {}", stderr);

    let (code, _, _) = run(&["analyze", ".", "--workers", "0"], dir.path());
    assert_eq!(code, 2);
}

#[test]
fn test_invalid_config_exits_two_before_analysis() {
    let dir = workspace(&[
        ("Repo.java", REPO),
        ("smellscan.toml", "[rules.god-class]\nenabled = true\n"),
    ]);
    let (code, stdout, stderr) = run(&["--no-progress"], dir.path());
    assert_eq!(code, 2);
    assert!(stdout.is_empty());
    assert!(stderr.contains("god-class"), "stderr: {}", stderr);

    let (code, _, _) = run(&["analyze", ".", "--rules", "nope"], dir.path());
    assert_eq!(code, 2);
}

// ============================================================================
// Output
// ============================================================================

#[test]
fn test_json_output_is_byte_identical_across_runs() {
    let dir = workspace(&[
        ("src/Repo.java", REPO),
        ("src/Intake.java", INTAKE),
        ("src/Retry.java", RETRY),
        ("src/Downloader.java", DOWNLOADER),
    ]);
    let args = ["analyze", ".", "--format", "json", "--no-progress"];
    let (_, first, _) = run(&args, dir.path());
    let mut single_worker = args.to_vec();
    single_worker.extend(["--workers", "1"]);
    let (_, second, _) = run(&single_worker, dir.path());
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_text_output_line_format() {
    let dir = workspace(&[("Lookup.java", LOOKUP)]);
    let (code, stdout, _) = run(&["analyze", "Lookup.java", "--no-progress"], dir.path());
    assert_eq!(code, 1);
    let first = stdout.lines().next().expect("one finding line");
    assert!(
        first.starts_with("Lookup.java:3: [warning] nullable-return: "),
        "line: {}",
        first
    );
    assert!(stdout.contains("1 finding (0 error, 1 warning, 0 info) in 1 file"));
}

#[test]
fn test_output_file_and_sarif() {
    let dir = workspace(&[("Repo.java", REPO)]);
    let (code, stdout, _) = run(
        &["analyze", ".", "--format", "sarif", "-o", "report.sarif", "--no-progress"],
        dir.path(),
    );
    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    let sarif: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("report.sarif")).expect("report written"),
    )
    .expect("valid SARIF JSON");
    assert_eq!(sarif["version"], "2.1.0");
    assert_eq!(sarif["runs"][0]["results"].as_array().map(Vec::len), Some(2));
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_feedback_missing_set_phase() {
    let dir = workspace(&[("Intake.java", INTAKE), ("Retry.java", RETRY)]);
    let (code, report) = analyze_json(dir.path(), &[]);
    assert_eq!(code, 1);
    let all = findings(&report);
    assert_eq!(all.len(), 1, "findings: {:?}", all);
    let f = &all[0];
    assert_eq!(f["rule"], "incomplete-construction");
    assert!(f["file"].as_str().unwrap_or_default().ends_with("Retry.java"));
    assert_eq!(f["line"], 3);
    assert!(f["message"].as_str().unwrap_or_default().contains("setPhase"));
}

#[test]
fn test_shared_download_prefix_is_one_finding() {
    let dir = workspace(&[("Downloader.java", DOWNLOADER)]);
    let (_, report) = analyze_json(dir.path(), &[]);
    let all = findings(&report);
    assert_eq!(all.len(), 1, "findings: {:?}", all);
    assert_eq!(all[0]["rule"], "loop-invariant-reevaluation");
    let lines: Vec<u64> = all[0]["related"]
        .as_array()
        .expect("related array")
        .iter()
        .filter_map(|r| r["line"].as_u64())
        .collect();
    assert_eq!(lines, vec![4, 5, 6]);
}

#[test]
fn test_parse_failure_does_not_abort_the_run() {
    let dir = workspace(&[
        ("Broken.java", "class Broken {\n    void f( {\n}\n"),
        ("Repo.java", REPO),
    ]);
    let (code, report) = analyze_json(dir.path(), &[]);
    assert_eq!(code, 1);
    let all = findings(&report);
    let parse = all
        .iter()
        .find(|f| f["rule"] == "parse-failure")
        .expect("parse-failure finding");
    assert_eq!(parse["internal"], true);
    assert_eq!(parse["severity"], "error");
    assert!(all.iter().any(|f| f["rule"] == "null-collection-return"));
    assert_eq!(report["files_analyzed"], 2);
}

#[test]
fn test_rules_flag_selects_and_enables_advisory_rules() {
    let dir = workspace(&[("Shipping.java", SHIPPING)]);

    let (code, report) = analyze_json(dir.path(), &[]);
    assert_eq!(code, 1);
    assert_eq!(rules_of(&report), vec!["flag-parameter"]);

    let (code, report) = analyze_json(
        dir.path(),
        &["--rules", "advisory/ambiguous-verb", "--min-severity", "info"],
    );
    assert_eq!(code, 1);
    assert_eq!(rules_of(&report), vec!["advisory/ambiguous-verb"]);
}

#[test]
fn test_config_file_disables_rules_and_sets_defaults() {
    let dir = workspace(&[
        ("Repo.java", REPO),
        (
            "smellscan.toml",
            "[rules.null-collection-return]\nenabled = false\n\n[defaults]\nformat = \"json\"\n",
        ),
    ]);
    let (code, stdout, _) = run(&["--no-progress"], dir.path());
    assert_eq!(code, 1);
    let report: serde_json::Value = serde_json::from_str(&stdout).expect("JSON from config default");
    assert_eq!(rules_of(&report), vec!["nullable-return"]);
}

// ============================================================================
// Other commands
// ============================================================================

#[test]
fn test_rules_command_lists_every_rule() {
    let dir = workspace(&[]);
    let (code, stdout, _) = run(&["rules"], dir.path());
    assert_eq!(code, 0);
    for id in [
        "nullable-return",
        "null-collection-return",
        "flag-parameter",
        "loop-invariant-reevaluation",
        "incomplete-construction",
        "advisory/ambiguous-verb",
        "advisory/conjunction-name",
        "parse-failure",
        "internal/io-failure",
        "internal/detector-failure",
    ] {
        assert!(stdout.contains(id), "missing {} in:\n{}", id, stdout);
    }
}

#[test]
fn test_init_writes_a_config_that_analyze_accepts() {
    let dir = workspace(&[("Clean.java", CLEAN)]);
    let (code, _, _) = run(&["init"], dir.path());
    assert_eq!(code, 0);
    assert!(dir.path().join("smellscan.toml").is_file());

    let (code, _, _) = run(&["init"], dir.path());
    assert_eq!(code, 2);

    let (code, _, _) = run(&["--no-progress"], dir.path());
    assert_eq!(code, 0);
}

#[test]
fn test_version_command() {
    let dir = workspace(&[]);
    let (code, stdout, _) = run(&["version"], dir.path());
    assert_eq!(code, 0);
    assert!(stdout.starts_with("smellscan "));
}
