//! Process-wide diagnostics bootstrap.
//!
//! # Responsibility
//! - Start rolling file logs for the host process exactly once.
//! - Capture panics as sanitized, single-line log events.
//!
//! # Invariants
//! - Kernel buffers and metakernel text are never written to logs; events
//!   carry keys, generated paths and sizes only.
//! - A second init with identical settings is a no-op; any other second
//!   init is rejected.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const LOG_BASENAME: &str = "kernelkit";
const ROTATE_AT_BYTES: u64 = 8 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 4;
const PANIC_MESSAGE_LIMIT: usize = 200;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

#[derive(Debug, Clone, PartialEq, Eq)]
struct LogSettings {
    level: &'static str,
    dir: PathBuf,
}

struct ActiveLogger {
    settings: LogSettings,
    _handle: LoggerHandle,
}

/// Starts file logging at `level` under the absolute directory `log_dir`.
///
/// # Errors
/// - `level` is not one of `trace|debug|info|warn|error`.
/// - `log_dir` is blank or relative, or cannot be created.
/// - Logging is already active with different settings.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    let requested = LogSettings {
        level: parse_level(level)?,
        dir: parse_log_dir(log_dir)?,
    };

    let active = ACTIVE.get_or_try_init(|| start_logger(&requested))?;
    check_same_settings(&active.settings, &requested)
}

/// Active `(level, directory)` pair, or `None` before [`init_logging`].
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    ACTIVE
        .get()
        .map(|active| (active.settings.level, active.settings.dir.clone()))
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_logger(settings: &LogSettings) -> Result<ActiveLogger, String> {
    std::fs::create_dir_all(&settings.dir).map_err(|err| {
        format!(
            "cannot create log directory `{}`: {err}",
            settings.dir.display()
        )
    })?;

    let handle = Logger::try_with_str(settings.level)
        .map_err(|err| format!("invalid log level `{}`: {err}", settings.level))?
        .log_to_file(
            FileSpec::default()
                .directory(settings.dir.as_path())
                .basename(LOG_BASENAME),
        )
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| format!("cannot start logger: {err}"))?;

    install_panic_hook();
    info!(
        "event=logging_start module=core status=ok version={} os={} level={} dir={}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        settings.level,
        settings.dir.display()
    );

    Ok(ActiveLogger {
        settings: settings.clone(),
        _handle: handle,
    })
}

fn check_same_settings(active: &LogSettings, requested: &LogSettings) -> Result<(), String> {
    if active.dir != requested.dir {
        return Err(format!(
            "logging already writes to `{}`; refusing to switch to `{}`",
            active.dir.display(),
            requested.dir.display()
        ));
    }
    if active.level != requested.level {
        return Err(format!(
            "logging already runs at `{}`; refusing to switch to `{}`",
            active.level, requested.level
        ));
    }
    Ok(())
}

fn parse_level(level: &str) -> Result<&'static str, String> {
    let level = level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        _ => Err(format!(
            "unsupported log level `{level}`; expected trace|debug|info|warn|error"
        )),
    }
}

fn parse_log_dir(log_dir: &str) -> Result<PathBuf, String> {
    let raw = log_dir.trim();
    if raw.is_empty() {
        return Err("log directory must not be empty".to_string());
    }
    let dir = Path::new(raw);
    if dir.is_relative() {
        return Err(format!("log directory must be absolute, got `{raw}`"));
    }
    Ok(dir.to_path_buf())
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }

    let chained = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic module=core status=error location={} payload={}",
            location,
            single_line(&payload, PANIC_MESSAGE_LIMIT)
        );
        chained(info);
    }));
}

fn single_line(value: &str, limit: usize) -> String {
    let flattened = value.replace(['\r', '\n'], " ");
    if flattened.chars().count() <= limit {
        return flattened;
    }
    let mut cut: String = flattened.chars().take(limit).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::{init_logging, logging_status, parse_level, parse_log_dir, single_line};
    use std::path::PathBuf;

    fn scratch_dir(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "kernelkit-logging-{label}-{}-{}",
            std::process::id(),
            uuid::Uuid::new_v4().simple()
        ))
    }

    #[test]
    fn parse_level_is_case_insensitive_and_maps_warning() {
        assert_eq!(parse_level(" DEBUG ").expect("debug is supported"), "debug");
        assert_eq!(parse_level("Warning").expect("warning is supported"), "warn");
        assert!(parse_level("verbose").is_err());
    }

    #[test]
    fn parse_log_dir_requires_absolute_path() {
        let err = parse_log_dir("logs").expect_err("relative dir must be rejected");
        assert!(err.contains("absolute"));
        assert!(parse_log_dir("   ").is_err());
    }

    #[test]
    fn single_line_flattens_and_caps() {
        assert_eq!(single_line("a\nb", 10), "a b");
        let capped = single_line("abcdefghij", 4);
        assert_eq!(capped, "abcd...");
    }

    #[test]
    fn init_logging_accepts_repeat_and_rejects_changes() {
        let dir = scratch_dir("primary");
        let dir_str = dir.to_str().expect("temp dir is UTF-8").to_string();
        let other = scratch_dir("other");
        let other_str = other.to_str().expect("temp dir is UTF-8").to_string();

        init_logging("info", &dir_str).expect("first init");
        init_logging("INFO", &dir_str).expect("identical init is a no-op");

        let err = init_logging("trace", &dir_str).expect_err("level change rejected");
        assert!(err.contains("refusing to switch"));
        let err = init_logging("info", &other_str).expect_err("dir change rejected");
        assert!(err.contains("refusing to switch"));

        let (level, active_dir) = logging_status().expect("logging is active");
        assert_eq!(level, "info");
        assert_eq!(active_dir, dir);
    }
}
