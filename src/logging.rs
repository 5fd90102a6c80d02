//! Logging bootstrap.
//!
//! Logs go to stderr unless a directory is configured, in which case they
//! rotate on disk. Events are single `key=value` lines.

use std::path::Path;

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::info;

use crate::error::AppError;

const LOG_FILE_BASENAME: &str = "proposal-pdf";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;
const MAX_LOG_FILES: usize = 3;

/// Starts the logger. Keep the returned handle alive for the whole run.
pub fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<LoggerHandle, AppError> {
    let logger = Logger::try_with_str(level)
        .map_err(|e| AppError::LoggingError(format!("invalid log level `{}`: {}", level, e)))?;

    let logger = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                AppError::LoggingError(format!("cannot create `{}`: {}", dir.display(), e))
            })?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
        }
        None => logger
            .log_to_stderr()
            .format_for_stderr(flexi_logger::default_format),
    };

    let handle = logger
        .start()
        .map_err(|e| AppError::LoggingError(format!("failed to start logger: {}", e)))?;

    info!(
        "event=app_start status=ok version={} level={}",
        env!("CARGO_PKG_VERSION"),
        level
    );
    Ok(handle)
}
