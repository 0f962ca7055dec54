//! Source model builder
//!
//! Turns source text into the language-neutral [`SourceUnit`] tree using
//! tree-sitter. Lowering is a pure transformation: no I/O, no global state.

mod java;

use crate::ast::{Language, SourceUnit};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Malformed input: the first syntax error found in the file
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}:{}:{}: {}", .file.display(), .line, .column, .message)]
pub struct ParseError {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl ParseError {
    pub fn new(file: &Path, line: u32, column: u32, message: impl Into<String>) -> Self {
        Self {
            file: file.to_path_buf(),
            line,
            column,
            message: message.into(),
        }
    }
}

/// Build the structural model of `text`, read from `path`
pub fn parse_source(text: &str, language: Language, path: &Path) -> Result<SourceUnit, ParseError> {
    match language {
        Language::Java => java::parse_source(text, path),
    }
}

/// Language for a file path, by extension
pub fn language_for_path(path: &Path) -> Option<Language> {
    let ext = path.extension().and_then(|e| e.to_str())?;
    Language::from_extension(ext)
}

/// Get all supported file extensions
pub fn supported_extensions() -> &'static [&'static str] {
    &["java"]
}
