mod cli;
mod config;
mod error;

use std::path::Path;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let (agent, log_file) = config::build_agent_config(&cli)?;

    // The guard keeps the non-blocking file writer alive until exit.
    let _guard = if cli.daemon {
        Some(init_file_tracing(cli.verbose, &log_file))
    } else {
        init_console_tracing(cli.verbose);
        None
    };

    let backend = sie_netif::detect()?;
    let fetcher = sie_core::Fetcher::new(agent.http_timeout, agent.cache_max_age)?;

    if cli.daemon {
        sie_core::poll::run_daemon(backend.as_ref(), &agent, &fetcher).await;
    } else {
        sie_core::poll::run_once(backend.as_ref(), &agent, &fetcher).await?;
    }
    Ok(())
}

fn filter_for(verbosity: u8) -> EnvFilter {
    let filter = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter))
}

fn init_console_tracing(verbosity: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbosity))
        .with_target(false)
        .init();
}

/// Daemon-mode tracing: daily-rotated file next to the configured log
/// path, without ANSI escapes.
fn init_file_tracing(
    verbosity: u8,
    path: &Path,
) -> tracing_appender::non_blocking::WorkerGuard {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new("sie-update.log"));

    let appender = tracing_appender::rolling::daily(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbosity))
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .init();
    guard
}
