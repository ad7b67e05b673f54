//! followctl - manage Twitch follows across several accounts.
//!
//! This is the main entry point for the followctl CLI tool.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use followctl::bootstrap;
use followctl::cli::commands::{check, follow, Session};
use followctl::cli::{handle_result, Cli, CliResult, ExitCode, Workflow};
use followctl::config::AppConfig;
use log::debug;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let workflow = match cli.workflow() {
        Ok(w) => w,
        Err(e) => return handle_result(Err(e)),
    };

    let (config, tokens) = match prepare(&cli) {
        Ok(prepared) => prepared,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {e:#}");
            return ExitCode::FAILURE.into();
        }
    };

    handle_result(run(&workflow, &config, tokens))
}

/// Load config, create the data layout and read the tokens file.
fn prepare(cli: &Cli) -> anyhow::Result<(AppConfig, Vec<String>)> {
    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    let tokens_path: PathBuf = cli.tokens.clone().unwrap_or_else(|| config.tokens_path());

    let scaffold = bootstrap::ensure_layout(&tokens_path)
        .with_context(|| format!("Failed to prepare {}", tokens_path.display()))?;
    if scaffold.created_tokens_file {
        println!(
            "\x1b[36mCreated {}\x1b[0m - add one OAuth token per line.",
            tokens_path.display()
        );
    }

    let tokens = bootstrap::load_tokens(&tokens_path).context("Failed to load tokens")?;
    debug!("{} token(s) loaded", tokens.len());
    Ok((config, tokens))
}

fn run(workflow: &Workflow, config: &AppConfig, tokens: Vec<String>) -> CliResult {
    debug!("Running workflow: {workflow}");
    let session = Session::connect(config, tokens)?;
    match workflow {
        Workflow::Follow { channel } => follow::follow(&session, channel),
        Workflow::Check => check::check(&session),
    }
}
