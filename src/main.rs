//! smellscan - structural code-smell detection for Java

use clap::Parser;
use smellscan::cli::{self, Cli};
use smellscan::exit::SmellscanExit;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> SmellscanExit {
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level; logs go to stderr so stdout stays clean
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("smellscan={}", cli.log_level)));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();

    cli::run(cli)
}
