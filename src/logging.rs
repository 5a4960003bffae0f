use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "taskgrid.log";

/// Sends tracing output to a log file in the data directory, since the
/// terminal belongs to the TUI. Keep the guard alive until exit.
pub fn init() -> Result<WorkerGuard> {
    let dirs = ProjectDirs::from("", "", "taskgrid").context("locating data directory")?;
    let log_dir = dirs.data_dir().join("logs");
    fs::create_dir_all(&log_dir).with_context(|| format!("creating {:?}", log_dir))?;

    let appender = tracing_appender::rolling::never(&log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("taskgrid=info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))?;
    tracing::info!(dir = %log_dir.display(), "taskgrid starting");
    Ok(guard)
}

/// File logging is optional: on failure the problem goes to stderr and the
/// command runs without a log file.
pub fn init_or_warn(result: Result<WorkerGuard>) -> Option<WorkerGuard> {
    match result {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("taskgrid: file logging disabled: {:#}", err);
            None
        }
    }
}
