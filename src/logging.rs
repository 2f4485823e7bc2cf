//! File logging with rotation; warnings and errors are also echoed to
//! stderr so they show next to the command output.

use std::path::Path;

use flexi_logger::{
    Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming, WriteMode,
};
use log::info;

const LOG_FILE_BASENAME: &str = "studyflow";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;
const MAX_LOG_FILES: usize = 3;

/// Environment variable overriding the configured level.
pub const LOG_LEVEL_ENV: &str = "STUDYFLOW_LOG";

/// Start logging to `log_dir`. The returned handle must be kept alive for
/// the duration of the program.
pub fn init_logging(level: &str, log_dir: &Path) -> Result<LoggerHandle, String> {
    let requested = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| level.to_string());
    let level = normalize_level(&requested)?;

    std::fs::create_dir_all(log_dir).map_err(|err| {
        format!(
            "failed to create log directory `{}`: {err}",
            log_dir.display()
        )
    })?;

    let logger = Logger::try_with_str(level)
        .map_err(|err| format!("invalid log level `{level}`: {err}"))?
        .log_to_file(
            FileSpec::default()
                .directory(log_dir)
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .duplicate_to_stderr(Duplicate::Warn)
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))?;

    info!(
        "event=app_start level={} log_dir={} version={}",
        level,
        log_dir.display(),
        env!("CARGO_PKG_VERSION")
    );
    Ok(logger)
}

/// Like [`init_logging`], but a logger that cannot start only costs the
/// log file: the reason is printed to stderr and the command goes on.
pub fn try_init_logging(level: &str, log_dir: Option<&Path>) -> Option<LoggerHandle> {
    let started = match log_dir {
        Some(log_dir) => init_logging(level, log_dir),
        None => Err("no log directory could be determined".to_string()),
    };
    match started {
        Ok(handle) => Some(handle),
        Err(err) => {
            eprintln!("warning: file logging disabled: {}", err);
            None
        }
    }
}

fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        "off" => Ok("off"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error|off"
        )),
    }
}
