//! smellscan - structural code-smell detection for Java
//!
//! Parses Java sources with tree-sitter into a small language-neutral tree
//! and runs independent detectors over it: nullable returns, boolean flag
//! parameters, loop-invariant call chains and incomplete setter-based
//! construction (a whole-corpus, two-phase check).

pub mod ast;
pub mod cli;
pub mod config;
pub mod detectors;
pub mod error;
pub mod exit;
pub mod models;
pub mod parsers;
pub mod pipeline;
pub mod reporters;
