//! Process entry point shared by the `go2ts` and `py2ts` binaries.

use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Mode};
use crate::config::ToolConfig;
use crate::generator::Generator;
use crate::language::Language;
use crate::runner::TokioRunner;
use crate::session::WatchSession;

/// Parse arguments, run the requested mode and map the outcome to an exit code.
pub fn main(language: Language) -> ExitCode {
    let cli = Cli::parse_for(language);
    init_logging(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("error: failed to start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(language, cli)) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout carries only generation status.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub async fn run(language: Language, cli: Cli) -> Result<ExitCode> {
    match cli.mode() {
        Mode::Usage => {
            Cli::command_for(language)
                .print_help()
                .context("failed to print usage")?;
            Ok(ExitCode::SUCCESS)
        }
        Mode::Watch => {
            println!("Starting in watch mode...");
            WatchSession::new(project_generator(language)?)
                .run()
                .await
                .context("failed to start watch mode")?;
            Ok(ExitCode::SUCCESS)
        }
        Mode::Generate(path) => {
            let summary = project_generator(language)?.generate_path(&path).await?;
            Ok(if summary.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

/// Generator rooted at the current directory, configured from its `2ts.toml`.
fn project_generator(language: Language) -> Result<Generator<TokioRunner>> {
    let root = std::env::current_dir()
        .and_then(|d| d.canonicalize())
        .context("failed to determine the project root")?;
    let config = ToolConfig::load(&root);
    Ok(Generator::new(language, root, config, TokioRunner))
}
