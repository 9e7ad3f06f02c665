//! Autograde Tests CLI
//!
//! Discovers declarative test modules and runs them.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use autograde_tests::{HarnessConfig, Logger, Runner, Suite};

/// Run autograding integration tests.
#[derive(Debug, Parser)]
#[command(name = "autograde-tests", version, about)]
struct Cli {
    /// Harness configuration file (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding one subdirectory per test module.
    #[arg(short, long)]
    tests_dir: Option<PathBuf>,

    /// List discovered modules and exit.
    #[arg(long)]
    list: bool,

    /// Modules to run, in order. Runs every module when omitted.
    modules: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::WARN.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("autograde-tests: {}", e);
            std::process::exit(2);
        }
    }
}

fn run(cli: Cli) -> autograde_tests::Result<i32> {
    let config = match &cli.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::from_env(),
    };
    for warning in config.validate()? {
        tracing::warn!("{}", warning);
    }

    let tests_dir = cli.tests_dir.clone().unwrap_or_else(|| {
        config
            .install_dir
            .join("test_suite")
            .join("integrationTests")
            .join("tests")
    });
    let suite = Suite::discover(&tests_dir)?;

    if cli.list {
        for name in suite.names() {
            println!("{}", name);
        }
        return Ok(0);
    }

    let config = Arc::new(config);
    let logger = Logger::from_config(&config);
    let registry = suite.into_registry(config);
    let runner = Runner::new(&registry, &logger);

    tracing::info!(log_file = %logger.log_file().display(), "starting test run");
    let summary = if cli.modules.is_empty() {
        runner.run_all()?
    } else {
        runner.run_tests(&cli.modules)?
    };

    Ok(summary.exit_code())
}
