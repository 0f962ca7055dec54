//! Analysis pipeline
//!
//! Orchestrates a full run:
//! 1. Discover source files (sorted, git-ignore aware)
//! 2. One rayon task per file: read, parse, run per-file detectors and
//!    collect construction facts
//! 3. Barrier: join every file task
//! 4. Run the whole-corpus construction check on the merged facts
//! 5. Order findings by file and line
//!
//! Read failures, syntax errors and detector panics never abort the run.
//! They are reported through the reserved `parse-failure` and `internal/*`
//! rules.

mod cancel;
mod discovery;

pub use cancel::CancellationToken;
pub use discovery::discover_files;

use crate::ast::{SourceUnit, Span};
use crate::config::RuleSettings;
use crate::detectors::{
    construction_detector, default_detectors, ConstructionFacts, ConstructionTable, Detector,
    IncompleteConstructionDetector,
};
use crate::error::AnalysisError;
use crate::models::{AnalysisReport, Finding, Location, RuleId};
use crate::parsers::{language_for_path, parse_source};
use rayon::prelude::*;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Worker stack size. Lowering and the detectors recurse once per nesting
/// level, up to the parser's nesting limit.
const WORKER_STACK_SIZE: usize = 16 * 1024 * 1024;

/// Called after each file with (file, done, total)
pub type ProgressCallback = Arc<dyn Fn(&Path, usize, usize) + Send + Sync>;

/// Default worker count: available parallelism, capped at 16
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
        .min(16)
}

/// Everything one file task produced
#[derive(Default)]
struct FileOutcome {
    findings: Vec<Finding>,
    facts: Option<ConstructionFacts>,
    failed: bool,
    functions: usize,
}

/// Drives discovery, the worker pool and the two-phase construction pass
pub struct Analyzer {
    settings: RuleSettings,
    detectors: Vec<Arc<dyn Detector>>,
    construction: Option<IncompleteConstructionDetector>,
    workers: usize,
    exclude: Vec<String>,
    cancel: CancellationToken,
    progress_callback: Option<ProgressCallback>,
}

impl Analyzer {
    /// Create an analyzer running the detectors enabled in `settings`
    pub fn new(settings: RuleSettings) -> Self {
        Self {
            detectors: default_detectors(&settings),
            construction: construction_detector(&settings),
            settings,
            workers: default_workers(),
            exclude: Vec::new(),
            cancel: CancellationToken::new(),
            progress_callback: None,
        }
    }

    /// Set the number of worker threads
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set exclusion globs applied while walking directories
    pub fn with_exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude = patterns;
        self
    }

    /// Share a cancellation token with the caller
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Set a progress callback
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Replace the per-file detector registry
    pub fn with_detectors(mut self, detectors: Vec<Arc<dyn Detector>>) -> Self {
        self.detectors = detectors;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Discover and analyse every source file under `paths`
    pub fn run(&self, paths: &[PathBuf]) -> Result<AnalysisReport, AnalysisError> {
        let files = discover_files(paths, &self.exclude)?;
        self.run_files(&files)
    }

    /// Analyse an already discovered, ordered list of files
    pub fn run_files(&self, files: &[PathBuf]) -> Result<AnalysisReport, AnalysisError> {
        let start = Instant::now();
        info!(
            "Analysing {} files with {} detectors on {} workers",
            files.len(),
            self.detectors.len() + usize::from(self.construction.is_some()),
            self.workers
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .stack_size(WORKER_STACK_SIZE)
            .build()?;

        let completed = AtomicUsize::new(0);
        let total = files.len();
        let outcomes: Vec<Option<FileOutcome>> = pool.install(|| {
            files
                .par_iter()
                .map(|path| {
                    let outcome = self.analyze_file(path);
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(ref callback) = self.progress_callback {
                        callback(path, done, total);
                    }
                    outcome
                })
                .collect()
        });

        // Barrier: every file task has joined here.
        if self.cancel.is_cancelled() {
            warn!("Analysis cancelled, discarding partial results");
            return Err(AnalysisError::Cancelled);
        }

        let mut findings = Vec::new();
        let mut facts = Vec::new();
        let mut files_failed = 0;
        let mut functions_analyzed = 0;
        for outcome in outcomes.into_iter().flatten() {
            findings.extend(outcome.findings);
            facts.extend(outcome.facts);
            files_failed += usize::from(outcome.failed);
            functions_analyzed += outcome.functions;
        }

        if self.construction.is_some() {
            let table = ConstructionTable::build(facts);
            debug!(
                "Construction table holds {} call sites",
                table.site_count()
            );
            findings.extend(self.apply_settings(table.check()));
            self.cancel.check()?;
        }

        findings.sort_by(|a, b| {
            (&a.location.file, a.location.line_start).cmp(&(&b.location.file, b.location.line_start))
        });

        info!(
            "Analysis complete: {} findings in {:?}",
            findings.len(),
            start.elapsed()
        );
        Ok(AnalysisReport::new(
            findings,
            files.len(),
            files_failed,
            functions_analyzed,
        ))
    }

    /// One file task. `None` means the run was cancelled mid-file.
    fn analyze_file(&self, path: &Path) -> Option<FileOutcome> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let mut outcome = FileOutcome::default();

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                outcome.failed = true;
                outcome.findings.push(self.internal_finding(
                    RuleId::IoFailure,
                    Location::file_start(path),
                    format!("Failed to read file: {}", e),
                ));
                return Some(outcome);
            }
        };
        let text = String::from_utf8_lossy(&bytes);

        let Some(language) = language_for_path(path) else {
            debug!("Skipping {}: unsupported file type", path.display());
            return Some(outcome);
        };
        let unit = match parse_source(&text, language, path) {
            Ok(unit) => unit,
            Err(e) => {
                debug!("Parse failure: {}", e);
                outcome.failed = true;
                outcome.findings.push(self.internal_finding(
                    RuleId::ParseFailure,
                    Location::new(path, Span::point(e.line, e.column)),
                    format!("Could not parse file: {}", e.message),
                ));
                return Some(outcome);
            }
        };
        outcome.functions = unit.functions().len();

        for detector in &self.detectors {
            if self.cancel.is_cancelled() {
                return None;
            }
            match catch_unwind(AssertUnwindSafe(|| detector.detect(&unit))) {
                Ok(found) => outcome.findings.extend(self.apply_settings(found)),
                Err(panic) => outcome
                    .findings
                    .push(self.detector_failure(detector.name(), &unit, panic)),
            }
        }

        if let Some(construction) = &self.construction {
            if self.cancel.is_cancelled() {
                return None;
            }
            match catch_unwind(AssertUnwindSafe(|| construction.collect(&unit))) {
                Ok(facts) => outcome.facts = Some(facts),
                Err(panic) => outcome
                    .findings
                    .push(self.detector_failure(construction.name(), &unit, panic)),
            }
        }

        Some(outcome)
    }

    /// Drop findings of disabled rules and apply configured severities
    fn apply_settings(&self, findings: Vec<Finding>) -> Vec<Finding> {
        findings
            .into_iter()
            .filter(|f| self.settings.is_enabled(f.rule))
            .map(|f| {
                let severity = self.settings.severity(f.rule);
                f.with_severity(severity)
            })
            .collect()
    }

    fn internal_finding(&self, rule: RuleId, location: Location, message: String) -> Finding {
        Finding::new(rule, location, message).with_severity(self.settings.severity(rule))
    }

    fn detector_failure(
        &self,
        name: &str,
        unit: &SourceUnit,
        panic: Box<dyn Any + Send>,
    ) -> Finding {
        let panic_msg = if let Some(s) = panic.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        error!(
            "Detector {} panicked on {}: {}",
            name,
            unit.path.display(),
            panic_msg
        );
        self.internal_finding(
            RuleId::DetectorFailure,
            Location::file_start(&unit.path),
            format!("Detector `{}` failed: {}", name, panic_msg),
        )
    }
}

#[cfg(test)]
mod tests;
