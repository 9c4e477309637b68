//! Diagnostic logging.
//!
//! File-based logging with automatic cleanup of old log files. User-facing
//! progress stays on stdout; everything diagnostic goes through `tracing`
//! into `<root>/logs/`.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing_subscriber::EnvFilter;

/// Log retention period in hours.
const LOG_RETENTION_HOURS: u64 = 24;

/// Default log level when `RUST_LOG` is unset.
const DEFAULT_LOG_LEVEL: &str = "info";

/// Returns the log directory under the launcher root.
#[must_use]
pub fn log_directory(root: &Path) -> PathBuf {
    root.join("logs")
}

/// Returns a fresh timestamped log file path.
#[must_use]
pub fn current_log_path(root: &Path) -> PathBuf {
    let now = chrono::Local::now();
    let filename = format!("launchpad_{}.log", now.format("%Y-%m-%d_%H-%M-%S"));
    log_directory(root).join(filename)
}

/// Deletes `.log` files older than the retention period.
pub fn cleanup_old_logs(root: &Path) -> io::Result<u32> {
    let log_dir = log_directory(root);
    if !log_dir.exists() {
        return Ok(0);
    }

    let retention = Duration::from_secs(LOG_RETENTION_HOURS * 3600);
    let now = SystemTime::now();
    let mut deleted = 0;

    for entry in fs::read_dir(&log_dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.extension().and_then(|e| e.to_str()) != Some("log") {
            continue;
        }

        if let Ok(metadata) = entry.metadata() {
            if let Ok(modified) = metadata.modified() {
                if let Ok(age) = now.duration_since(modified) {
                    if age > retention && fs::remove_file(&path).is_ok() {
                        deleted += 1;
                    }
                }
            }
        }
    }

    Ok(deleted)
}

/// Initializes file logging under the given root.
///
/// `RUST_LOG` overrides the default `info` filter. Old log files are
/// cleaned up first.
pub fn init(root: &Path) -> io::Result<()> {
    let log_dir = log_directory(root);
    fs::create_dir_all(&log_dir)?;

    let deleted = cleanup_old_logs(root)?;

    let log_path = current_log_path(root);
    let log_file = File::create(&log_path)?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .init();

    tracing::info!("Launchpad logging initialized");
    tracing::info!("Log file: {}", log_path.display());
    if deleted > 0 {
        tracing::info!("Cleaned up {} old log file(s)", deleted);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directory_under_root() {
        let dir = log_directory(Path::new("/tmp/lp"));
        assert_eq!(dir, PathBuf::from("/tmp/lp/logs"));
    }

    #[test]
    fn test_current_log_path_shape() {
        let path = current_log_path(Path::new("/tmp/lp"));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("launchpad_"));
        assert!(name.ends_with(".log"));
    }

    #[test]
    fn test_cleanup_missing_directory_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(cleanup_old_logs(dir.path()).unwrap(), 0);
    }

    #[test]
    fn test_cleanup_keeps_fresh_logs() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = log_directory(dir.path());
        fs::create_dir_all(&log_dir).unwrap();
        fs::write(log_dir.join("launchpad_now.log"), b"fresh").unwrap();

        assert_eq!(cleanup_old_logs(dir.path()).unwrap(), 0);
        assert!(log_dir.join("launchpad_now.log").exists());
    }
}
