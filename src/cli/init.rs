//! Init command - write an example project config

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

/// Example `smellscan.toml`; every value shown is the built-in default
pub const EXAMPLE_CONFIG: &str = r#"# smellscan configuration
#
# Rule ids: run `smellscan rules` for the full list.

[rules.nullable-return]
# enabled = true
# severity = "warning"

[rules.flag-parameter]
# Calls ignored when comparing the two branches of a flag conditional
options = { side_effect_selectors = ["log", "trace", "debug", "info", "warn", "warning", "error", "fine", "finer", "finest", "print", "println", "printf", "assert"] }

[rules.loop-invariant-reevaluation]
# Minimum number of links (`a.b().c()` has two) before a chain is reported
options = { min_chain_depth = 1 }

[rules.incomplete-construction]
# Method-name prefixes that count as mutators
options = { mutator_prefixes = ["set"] }

# Advisory naming heuristics are off by default
[rules."advisory/ambiguous-verb"]
enabled = false

[rules."advisory/conjunction-name"]
enabled = false

[exclude]
# Globs relative to each analysed directory
paths = []
# skip_defaults = false

[defaults]
# format = "text"          # text, json, sarif
# min_severity = "warning" # exit 1 when a finding at this level or above exists
# workers = 8
"#;

/// Run the init command
pub fn run(dir: &Path, force: bool) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("Path is not a directory: {}", dir.display());
    }

    let config_path = dir.join("smellscan.toml");
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    std::fs::write(&config_path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    eprintln!(
        "{} Created {}",
        style("✓").green(),
        style(config_path.display()).cyan()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_project_config;
    use tempfile::TempDir;

    #[test]
    fn test_example_config_is_valid() {
        let dir = TempDir::new().expect("temp dir");
        run(dir.path(), false).expect("init should succeed");
        let config = load_project_config(dir.path()).expect("example config should validate");
        assert_eq!(config.rules.len(), 6);
    }

    #[test]
    fn test_existing_config_needs_force() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join("smellscan.toml"), "# mine\n").expect("write");
        assert!(run(dir.path(), false).is_err());
        run(dir.path(), true).expect("force overwrite");
        let content =
            std::fs::read_to_string(dir.path().join("smellscan.toml")).expect("read config");
        assert_eq!(content, EXAMPLE_CONFIG);
    }
}
