//! Logging setup for resmon
//! env_logger backend, optional log file, 7-day retention

use crate::error::StorageError;
use crate::utils::get_logs_dir;
use log::{info, LevelFilter};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

const LOG_RETENTION_DAYS: u64 = 7;

/// Install the global logger. `RUST_LOG` still overrides `level`.
///
/// With `log_to_file`, output goes to a timestamped file under the logs
/// directory and stale logs are cleaned up first. Returns the file path.
pub fn init(level: LevelFilter, log_to_file: bool) -> Result<Option<PathBuf>, StorageError> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).parse_default_env();

    let mut log_path = None;
    if log_to_file {
        let logs_dir = get_logs_dir();
        fs::create_dir_all(&logs_dir).map_err(|source| StorageError::Io {
            path: logs_dir.display().to_string(),
            source,
        })?;
        cleanup_old_logs(&logs_dir);

        let path = logs_dir.join(format!(
            "resmon_{}.log",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        ));
        let file = File::create(&path).map_err(|source| StorageError::Io {
            path: path.display().to_string(),
            source,
        })?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
        log_path = Some(path);
    }

    // A second init (tests, embedding apps) keeps the existing logger
    let _ = builder.try_init();
    Ok(log_path)
}

/// Delete `.log` files older than the retention window
pub fn cleanup_old_logs(logs_dir: &Path) -> usize {
    if !logs_dir.exists() {
        return 0;
    }

    let retention = Duration::from_secs(LOG_RETENTION_DAYS * 24 * 60 * 60);
    let now = SystemTime::now();
    let mut removed = 0;

    if let Ok(entries) = fs::read_dir(logs_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "log") {
                continue;
            }
            let expired = fs::metadata(&path)
                .and_then(|meta| meta.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .map_or(false, |age| age > retention);
            if expired && fs::remove_file(&path).is_ok() {
                info!("Cleaned up old log: {:?}", path.file_name());
                removed += 1;
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_keeps_recent_and_non_log_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("today.log"), "x").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        assert_eq!(cleanup_old_logs(dir.path()), 0);
        assert!(dir.path().join("today.log").exists());
    }

    #[test]
    fn test_cleanup_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(cleanup_old_logs(&dir.path().join("absent")), 0);
    }
}
