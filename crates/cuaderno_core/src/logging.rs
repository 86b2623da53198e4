//! Rolling file logs for the core crate.
//!
//! # Responsibility
//! - Start the process-wide logger once, with size-based rotation.
//! - Capture panic payloads as sanitized single-line events.
//!
//! # Invariants
//! - `init_logging` is idempotent for one (level, directory) pair and
//!   rejects any attempt to re-point an active logger.
//! - Nothing in this module panics; failures come back as strings.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::Once;

const LOG_BASENAME: &str = "cuaderno";
const LOG_ROTATE_BYTES: u64 = 8 * 1024 * 1024;
const LOG_KEEP_FILES: usize = 4;
const PANIC_TEXT_LIMIT: usize = 200;

static RUNTIME: OnceCell<LogRuntime> = OnceCell::new();
static PANIC_HOOK: Once = Once::new();

#[derive(Clone, PartialEq, Eq)]
struct LogConfig {
    level: &'static str,
    dir: PathBuf,
}

struct LogRuntime {
    config: LogConfig,
    _handle: LoggerHandle,
}

/// Starts file logging at `level` into `log_dir`.
///
/// The first successful call wins: later calls with the same level and
/// directory are no-ops, calls with a different pair fail. `log_dir` must
/// be an absolute path; it is created when missing.
///
/// # Errors
/// Unknown levels, relative or empty directories, and logger backend
/// failures all surface as a human-readable message.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    let request = LogConfig {
        level: parse_level(level)?,
        dir: resolve_dir(log_dir)?,
    };

    let active = RUNTIME.get_or_try_init(|| start_runtime(&request))?;
    if active.config != request {
        return Err(format!(
            "logging already runs at level `{}` in `{}`; refusing level `{}` in `{}`",
            active.config.level,
            active.config.dir.display(),
            request.level,
            request.dir.display()
        ));
    }
    Ok(())
}

/// Level and directory of the active logger, `None` before `init_logging`.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    RUNTIME
        .get()
        .map(|runtime| (runtime.config.level, runtime.config.dir.clone()))
}

/// Level used when the embedding app does not pick one: `debug` in debug
/// builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_runtime(config: &LogConfig) -> Result<LogRuntime, String> {
    std::fs::create_dir_all(&config.dir).map_err(|err| {
        format!(
            "cannot create log directory `{}`: {err}",
            config.dir.display()
        )
    })?;
    let handle = build_logger(config)?;
    install_panic_hook();

    info!(
        "event=logging_init module=logging status=ok level={} dir={} core_version={}",
        config.level,
        config.dir.display(),
        env!("CARGO_PKG_VERSION")
    );

    Ok(LogRuntime {
        config: config.clone(),
        _handle: handle,
    })
}

fn build_logger(config: &LogConfig) -> Result<LoggerHandle, String> {
    Logger::try_with_str(config.level)
        .map_err(|err| format!("invalid log level `{}`: {err}", config.level))?
        .log_to_file(
            FileSpec::default()
                .directory(&config.dir)
                .basename(LOG_BASENAME),
        )
        .rotate(
            Criterion::Size(LOG_ROTATE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(LOG_KEEP_FILES),
        )
        .append()
        .write_mode(WriteMode::BufferAndFlush)
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| format!("cannot start logger: {err}"))
}

fn parse_level(level: &str) -> Result<&'static str, String> {
    let wanted = level.trim().to_ascii_lowercase();
    for known in ["trace", "debug", "info", "warn", "error"] {
        if wanted == known {
            return Ok(known);
        }
    }
    if wanted == "warning" {
        return Ok("warn");
    }
    Err(format!(
        "unknown log level `{level}`; use trace, debug, info, warn or error"
    ))
}

fn resolve_dir(log_dir: &str) -> Result<PathBuf, String> {
    let trimmed = log_dir.trim();
    if trimmed.is_empty() {
        return Err("log directory cannot be empty".to_string());
    }
    let dir = PathBuf::from(trimmed);
    if dir.is_relative() {
        return Err(format!("log directory must be absolute, got `{trimmed}`"));
    }
    Ok(dir)
}

fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map(|loc| format!("{}:{}", loc.file(), loc.line()))
                .unwrap_or_else(|| "unknown".to_string());
            error!(
                "event=panic module=logging status=error location={location} message={}",
                redact(&payload_text(info))
            );
            previous(info);
        }));
    });
}

fn payload_text(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "opaque panic payload".to_string()
    }
}

/// Log lines must stay single-line; panic payloads carry arbitrary user
/// text, so control characters become spaces and long text is cut off.
fn redact(text: &str) -> String {
    let mut out = String::new();
    for (index, c) in text.chars().enumerate() {
        if index == PANIC_TEXT_LIMIT {
            out.push_str("...");
            break;
        }
        out.push(if c.is_control() { ' ' } else { c });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{default_log_level, init_logging, logging_status, parse_level, redact, resolve_dir};
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(suffix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be after unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "cuaderno-logs-{suffix}-{}-{nanos}",
            std::process::id()
        ))
    }

    #[test]
    fn parse_level_normalizes_case_and_whitespace() {
        assert_eq!(parse_level("INFO").expect("INFO is a level"), "info");
        assert_eq!(parse_level(" warning ").expect("warning maps"), "warn");
        assert!(parse_level("loud").is_err());
    }

    #[test]
    fn default_level_is_always_parseable() {
        assert!(parse_level(default_log_level()).is_ok());
    }

    #[test]
    fn resolve_dir_rejects_relative_and_empty_paths() {
        assert!(resolve_dir("logs/dev")
            .expect_err("relative paths are rejected")
            .contains("absolute"));
        assert!(resolve_dir("  ").is_err());
    }

    #[test]
    fn redact_flattens_control_characters_and_truncates() {
        let flattened = redact("line1\nline2\tline3");
        assert!(!flattened.contains('\n'));
        assert!(!flattened.contains('\t'));

        let long = "x".repeat(500);
        assert!(redact(&long).ends_with("..."));
    }

    #[test]
    fn init_logging_is_idempotent_and_rejects_conflicts() {
        let log_dir = unique_temp_dir("first");
        let log_dir_str = log_dir
            .to_str()
            .expect("temp dir is valid UTF-8")
            .to_string();
        let other_dir = unique_temp_dir("second");
        let other_dir_str = other_dir
            .to_str()
            .expect("temp dir is valid UTF-8")
            .to_string();

        init_logging("info", &log_dir_str).expect("first init succeeds");
        init_logging("info", &log_dir_str).expect("same config is a no-op");

        let level_conflict =
            init_logging("debug", &log_dir_str).expect_err("level conflict fails");
        assert!(level_conflict.contains("refusing"));

        let dir_conflict =
            init_logging("info", &other_dir_str).expect_err("directory conflict fails");
        assert!(dir_conflict.contains("refusing"));

        let (active_level, active_dir) = logging_status().expect("logging is active");
        assert_eq!(active_level, "info");
        assert_eq!(active_dir, log_dir);
    }
}
