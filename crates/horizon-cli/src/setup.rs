use anyhow::Result;
use horizon_storage::{Storage, paths};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Install the file logger. Logs never go to the terminal so they cannot
/// interleave with streamed output. Keep the returned guard alive until exit.
pub fn init_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = paths::ensure_data_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "horizon.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .init();

    Ok(guard)
}

pub fn open_storage() -> Result<Storage> {
    Storage::new(paths::database_path()?)
}
