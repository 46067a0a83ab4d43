//! Logging infrastructure.
//!
//! Structured logging with console output and an optional log file:
//! - Console output goes to stderr so command output on stdout stays clean
//! - The log file (if any) is cleared at session start
//! - Configurable via RUST_LOG environment variable, defaulting to `info`
//!   (`debug` with `verbose`)

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
    log_path: Option<PathBuf>,
}

impl LoggingGuard {
    /// Path of the log file, if file logging is enabled.
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }
}

/// Initialize the global subscriber.
///
/// With `log_dir` set, also writes to `log_dir/log_file` (created and
/// truncated first).
///
/// # Errors
///
/// Returns error if the log directory cannot be created or the log file
/// cannot be cleared.
pub fn init_logging(
    log_dir: Option<&Path>,
    log_file: &str,
    verbose: bool,
) -> Result<LoggingGuard, io::Error> {
    let (subscriber, guard) = build_subscriber(log_dir, log_file, verbose)?;
    subscriber.init();
    Ok(guard)
}

/// Assemble the layered subscriber without installing it.
fn build_subscriber(
    log_dir: Option<&Path>,
    log_file: &str,
    verbose: bool,
) -> Result<(impl Subscriber + Send + Sync + 'static, LoggingGuard), io::Error> {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, file_guard, log_path) = match log_dir {
        Some(log_dir) => {
            let log_path = prepare_log_file(log_dir, log_file)?;
            let file_appender = tracing_appender::rolling::never(log_dir, log_file);
            let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false);
            (Some(file_layer), Some(file_guard), Some(log_path))
        }
        None => (None, None, None),
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .compact();

    // An absent file layer is a no-op layer.
    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer);

    Ok((
        subscriber,
        LoggingGuard {
            _file_guard: file_guard,
            log_path,
        },
    ))
}

/// Create `log_dir` if needed and truncate the log file.
fn prepare_log_file(log_dir: &Path, log_file: &str) -> Result<PathBuf, io::Error> {
    fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(log_file);
    fs::write(&log_path, "")?;
    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // init_logging installs a global subscriber, so tests scope the built one instead.

    #[test]
    fn test_file_layer_receives_events() {
        let temp = TempDir::new().unwrap();
        let (subscriber, guard) =
            build_subscriber(Some(temp.path()), "envcache.log", false).unwrap();
        let log_path = guard.log_path().unwrap().to_path_buf();

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!("snapshot store unavailable");
        });
        drop(guard);

        let contents = fs::read_to_string(log_path).unwrap();
        assert!(contents.contains("snapshot store unavailable"));
    }

    #[test]
    fn test_console_only_has_no_log_path() {
        let (subscriber, guard) = build_subscriber(None, "envcache.log", true).unwrap();
        assert!(guard.log_path().is_none());

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("console only");
        });
    }

    #[test]
    fn test_creates_nested_directory_and_file() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("deep").join("logs");

        let path = prepare_log_file(&dir, "envcache.log").unwrap();

        assert_eq!(path, dir.join("envcache.log"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_clears_existing_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("envcache.log"), "old log data").unwrap();

        let path = prepare_log_file(temp.path(), "envcache.log").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "");
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_blocked_by_file_is_error() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        assert!(prepare_log_file(&blocker.join("logs"), "envcache.log").is_err());
    }
}
