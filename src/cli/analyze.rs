//! Analyze command
//!
//! Merges the project config with CLI flags, runs the pipeline with a
//! spinner and Ctrl-C handling, renders the report and decides the exit code.

use super::AnalyzeArgs;
use crate::config::{
    load_config_file, load_project_config, parse_severity, validate_workers, ProjectConfig,
    RuleSettings,
};
use crate::error::ConfigError;
use crate::exit::SmellscanExit;
use crate::models::{RuleId, Severity};
use crate::pipeline::{default_workers, Analyzer, CancellationToken};
use crate::reporters::{report_with_format, OutputFormat};
use anyhow::{Context, Result};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Options after layering CLI flags over the project config
#[derive(Debug)]
struct EffectiveOptions {
    format: OutputFormat,
    min_severity: Severity,
    display_severity: Option<Severity>,
    workers: usize,
    rules: Option<Vec<RuleId>>,
}

impl EffectiveOptions {
    fn resolve(args: &AnalyzeArgs, config: &ProjectConfig) -> Result<Self, ConfigError> {
        let defaults = &config.defaults;

        let format = match args.format.as_ref().or(defaults.format.as_ref()) {
            Some(f) => f
                .parse()
                .map_err(|_| ConfigError::InvalidFormat(f.clone()))?,
            None => OutputFormat::Text,
        };
        let min_severity = match args.min_severity.as_ref().or(defaults.min_severity.as_ref()) {
            Some(s) => parse_severity(s, "--min-severity")?,
            None => Severity::Warning,
        };
        let display_severity = args
            .severity
            .as_ref()
            .or(defaults.severity.as_ref())
            .map(|s| parse_severity(s, "--severity"))
            .transpose()?;
        let workers = validate_workers(
            args.workers
                .or(defaults.workers)
                .unwrap_or_else(default_workers),
        )?;
        let rules = if args.rules.is_empty() {
            None
        } else {
            let parsed = args
                .rules
                .iter()
                .map(|id| {
                    id.parse::<RuleId>()
                        .map_err(|_| ConfigError::UnknownRule(id.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Some(parsed)
        };

        Ok(Self {
            format,
            min_severity,
            display_severity,
            workers,
            rules,
        })
    }
}

/// `--config` wins; otherwise look in the first path (or its parent for a file)
fn load_config(args: &AnalyzeArgs, paths: &[PathBuf]) -> Result<ProjectConfig, ConfigError> {
    if let Some(path) = &args.config {
        return load_config_file(path);
    }
    let first = paths.first().map(PathBuf::as_path).unwrap_or(Path::new("."));
    let dir = if first.is_file() {
        first.parent().unwrap_or(Path::new("."))
    } else {
        first
    };
    load_project_config(dir)
}

/// Listen for Ctrl-C on a background runtime and trip the token
fn spawn_interrupt_listener(token: CancellationToken) {
    let spawned = std::thread::Builder::new()
        .name("smellscan-signal".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!("Failed to start signal listener: {}", e);
                    return;
                }
            };
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        debug!("Received Ctrl+C, cancelling analysis");
                        token.cancel();
                    }
                    Err(e) => warn!("Failed to install Ctrl+C handler: {}", e),
                }
            });
        });
    if let Err(e) = spawned {
        warn!("Failed to spawn signal listener thread: {}", e);
    }
}

fn spinner_style() -> Result<ProgressStyle> {
    Ok(ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")?)
}

/// Run the analyze command
pub fn run(args: AnalyzeArgs) -> Result<SmellscanExit> {
    let paths = if args.paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        args.paths.clone()
    };

    let config = load_config(&args, &paths)?;
    let options = EffectiveOptions::resolve(&args, &config)?;
    debug!("Effective options: {:?}", options);

    let settings = RuleSettings::from_project(&config, options.rules.as_deref());
    let token = CancellationToken::new();
    spawn_interrupt_listener(token.clone());

    let mut analyzer = Analyzer::new(settings)
        .with_workers(options.workers)
        .with_exclude(config.exclude.effective_patterns())
        .with_cancellation(token.clone());

    let spinner = if !args.no_progress && Term::stderr().is_term() {
        let bar = ProgressBar::new_spinner();
        bar.set_style(spinner_style()?);
        bar.set_message("Analyzing...");
        bar.enable_steady_tick(Duration::from_millis(100));
        let handle = bar.clone();
        analyzer = analyzer.with_progress_callback(Arc::new(move |path: &Path, done: usize, total: usize| {
            handle.set_message(format!("[{}/{}] {}", done, total, path.display()));
        }));
        Some(bar)
    } else {
        None
    };

    let result = analyzer.run(&paths);
    if let Some(bar) = &spinner {
        bar.finish_and_clear();
    }
    let mut report = result?;

    let failing = report.has_findings_at(options.min_severity);
    if let Some(display) = options.display_severity {
        report.retain_at_least(display);
    }

    let colors = args.output.is_none()
        && !args.no_color
        && options.format == OutputFormat::Text
        && console::colors_enabled();
    let rendered = report_with_format(&report, options.format, colors)?;
    // an interrupt after the pipeline's last check still wins over the report
    token.check()?;

    match &args.output {
        Some(out_path) => {
            std::fs::write(out_path, &rendered)
                .with_context(|| format!("Failed to write report to {}", out_path.display()))?;
            eprintln!("Report written to: {}", style(out_path.display()).cyan());
        }
        None => print!("{}", rendered),
    }

    Ok(if failing {
        SmellscanExit::FindingsAtThreshold
    } else {
        SmellscanExit::Clean
    })
}
