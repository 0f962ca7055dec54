//! CLI command definitions and handlers

mod analyze;
mod init;
mod rules;

use crate::exit::SmellscanExit;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// smellscan - structural code-smell detection for Java
#[derive(Parser, Debug)]
#[command(name = "smellscan")]
#[command(
    version,
    about = "Find nullable returns, flag parameters, loop-invariant call chains and incomplete construction in Java code",
    after_help = "\
Examples:
  smellscan                                 Analyze the current directory
  smellscan src/ --format json              JSON output for scripting
  smellscan analyze . --min-severity error  Exit 1 only on error findings
  smellscan analyze . --rules flag-parameter,nullable-return
  smellscan init                            Write an example smellscan.toml
  smellscan rules                           List every rule id"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(flatten)]
    pub analyze: AnalyzeArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze Java sources (the default command)
    Analyze(AnalyzeArgs),

    /// Write an example smellscan.toml
    Init {
        /// Directory to write the config into
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// List rule ids, default severities and whether they run by default
    Rules,

    /// Print version information
    Version,
}

#[derive(Args, Debug, Clone, Default)]
pub struct AnalyzeArgs {
    /// Files or directories to analyze (default: current directory)
    pub paths: Vec<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', value_parser = ["text", "json", "sarif"])]
    pub format: Option<String>,

    /// Write the report to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Exit with code 1 if findings at this severity or higher exist
    #[arg(long, value_parser = ["info", "warning", "error"])]
    pub min_severity: Option<String>,

    /// Only show findings at this severity or higher (does not change the exit code)
    #[arg(long, value_parser = ["info", "warning", "error"])]
    pub severity: Option<String>,

    /// Comma-separated rule ids to run instead of the configured set
    #[arg(long, value_delimiter = ',')]
    pub rules: Vec<String>,

    /// Number of parallel workers (1-64)
    #[arg(long, value_parser = parse_workers)]
    pub workers: Option<usize>,

    /// Config file (default: smellscan.toml or .smellscanrc.json in the first path)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Disable the progress spinner
    #[arg(long)]
    pub no_progress: bool,

    /// Disable coloured output
    #[arg(long)]
    pub no_color: bool,
}

/// Run the CLI command
pub fn run(cli: Cli) -> SmellscanExit {
    match cli.command {
        Some(Commands::Analyze(args)) => analyze::run(args).into(),
        Some(Commands::Init { dir, force }) => init::run(&dir, force)
            .map(|()| SmellscanExit::Clean)
            .into(),
        Some(Commands::Rules) => {
            print!("{}", rules::render());
            SmellscanExit::Clean
        }
        Some(Commands::Version) => {
            println!("smellscan {}", env!("CARGO_PKG_VERSION"));
            SmellscanExit::Clean
        }
        None => analyze::run(cli.analyze).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_workers() {
        assert_eq!(parse_workers("8"), Ok(8));
        assert!(parse_workers("0").is_err());
        assert!(parse_workers("65").is_err());
        assert!(parse_workers("many").is_err());
    }

    #[test]
    fn test_bare_paths_run_analyze() {
        let cli = Cli::parse_from(["smellscan", "src", "--format", "json", "--rules", "flag-parameter,nullable-return"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.analyze.paths, vec![PathBuf::from("src")]);
        assert_eq!(cli.analyze.format.as_deref(), Some("json"));
        assert_eq!(cli.analyze.rules, vec!["flag-parameter", "nullable-return"]);
    }

    #[test]
    fn test_subcommands_parse() {
        let cli = Cli::parse_from(["smellscan", "analyze", ".", "--workers", "2", "--log-level", "debug"]);
        match cli.command {
            Some(Commands::Analyze(args)) => assert_eq!(args.workers, Some(2)),
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.log_level, "debug");

        let cli = Cli::parse_from(["smellscan", "init", "proj", "--force"]);
        assert!(matches!(cli.command, Some(Commands::Init { force: true, .. })));
        assert!(Cli::try_parse_from(["smellscan", "--workers", "0"]).is_err());
    }
}
