//! Source file discovery
//!
//! Directories are walked with `ignore` so `.gitignore`, `.ignore` and
//! `.smellscanignore` files are honoured; exclude globs are applied as
//! overrides relative to each root. Explicitly named files are always taken
//! when their extension is supported.

use crate::config::validate_glob;
use crate::error::{AnalysisError, ConfigError};
use crate::parsers::language_for_path;
use ignore::overrides::{Override, OverrideBuilder};
use ignore::WalkBuilder;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Expand `paths` into a sorted, de-duplicated list of source files
pub fn discover_files(
    paths: &[PathBuf],
    exclude: &[String],
) -> Result<Vec<PathBuf>, AnalysisError> {
    for pattern in exclude {
        validate_glob(pattern)?;
    }

    let mut files = BTreeSet::new();
    for root in paths {
        if root.is_file() {
            if language_for_path(root).is_some() {
                files.insert(root.clone());
            } else {
                warn!("Skipping {}: unsupported file type", root.display());
            }
        } else if root.is_dir() {
            files.extend(walk_source_files(root, exclude)?);
        } else {
            return Err(AnalysisError::PathNotFound(root.clone()));
        }
    }

    if files.is_empty() {
        return Err(AnalysisError::NoInputFiles);
    }
    debug!("Discovered {} source files", files.len());
    Ok(files.into_iter().collect())
}

fn build_overrides(root: &Path, exclude: &[String]) -> Result<Override, ConfigError> {
    let mut builder = OverrideBuilder::new(root);
    for pattern in exclude {
        builder
            .add(&format!("!{}", pattern))
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
    }
    builder.build().map_err(|source| ConfigError::InvalidPattern {
        pattern: exclude.join(", "),
        source,
    })
}

fn walk_source_files(root: &Path, exclude: &[String]) -> Result<Vec<PathBuf>, ConfigError> {
    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(true)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(true)
        .require_git(false)
        .add_custom_ignore_filename(".smellscanignore")
        .overrides(build_overrides(root, exclude)?);

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.into_path();
        if language_for_path(&path).is_some() {
            files.push(path);
        }
    }
    Ok(files)
}
