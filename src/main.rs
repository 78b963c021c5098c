// ABOUTME: Entry point for the stagehand CLI application.
// ABOUTME: Parses arguments, sets up logging and Ctrl-C handling, and dispatches commands.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::RunOptions;
use stagehand::config;
use stagehand::error::Result;
use stagehand::output::{Output, OutputMode};
use stagehand::pipeline::AbortSignal;
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise the verbose flag picks the level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };

    let abort = AbortSignal::new();
    watch_for_interrupt(abort.clone(), Output::new(mode));

    if let Err(e) = run(cli, Output::new(mode), abort).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

/// First Ctrl-C stops the run at the next stage boundary; a second exits immediately.
fn watch_for_interrupt(abort: AbortSignal, output: Output) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        abort.abort();
        output.warning("abort requested; stopping at the next stage boundary (Ctrl-C again to exit now)");

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}

async fn run(cli: Cli, output: Output, abort: AbortSignal) -> Result<()> {
    match cli.command {
        Commands::Init { job, force } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, job.as_deref(), force)?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(())
        }
        Commands::Check => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::check(&config, &output)
        }
        Commands::Run {
            build,
            job,
            approve,
            force,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            let options = RunOptions {
                job: commands::resolve_job(job, &config)?,
                build: commands::resolve_build(build)?,
                approve,
                force,
            };
            commands::run(config, options, abort, output).await
        }
        Commands::Deploy {
            environment,
            build,
            job,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            let job = commands::resolve_job(job, &config)?;
            let build = commands::resolve_build(build)?;
            commands::deploy(config, environment, job, build, output).await
        }
        Commands::Verify { environment } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::verify(config, environment, output).await
        }
    }
}
