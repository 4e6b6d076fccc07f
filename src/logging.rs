use crate::errors::AppError;

use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use std::path::Path;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{filter, prelude::*};

/// Sends all `tracing` output to a rolling log file, keeping stdout for readings.
///
/// The returned guard must be held until shutdown or buffered lines are lost.
pub fn init_file_logging(log_path: &Path, level: LevelFilter) -> Result<WorkerGuard, AppError> {
    let file_appender = BasicRollingFileAppender::new(
        log_path,
        RollingConditionBasic::new().max_size(1024 * 1024 * 5),
        2,
    )
    .map_err(|e| AppError::CreateFile {
        path: log_path.to_owned(),
        source: e,
    })?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let time_fmt = ChronoLocal::new("%Y-%m-%d %H:%M:%S%.6f".to_owned());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_file(false)
        .with_ansi(false)
        .with_target(true)
        .with_timer(time_fmt)
        .with_line_number(true)
        .with_filter(level);
    // BlueZ's D-Bus plumbing is very chatty below info
    let env_filter = filter::EnvFilter::new("trace,bluez_async=info,dbus=info");
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))?;

    Ok(guard)
}
