// Monitoring command handlers
use crate::error::{ExportError, MonitorError};
use crate::export::{default_export_file_name, write_export, ExportFormat};
use crate::models::{HostInfo, MonitorSettings};
use crate::monitor::ResourceMonitor;
use crate::performance::describe_host;
use crate::utils::get_exports_dir;
use chrono::Local;
use std::path::{Path, PathBuf};

/// Validate stored settings and start the monitor with them
pub fn start_from_settings(
    monitor: &ResourceMonitor,
    settings: &MonitorSettings,
) -> Result<(), MonitorError> {
    let config = settings.validate()?;
    monitor.start(config)
}

/// Write the current history and return where it went.
///
/// `path` may be a file, an existing directory (a timestamped file is created
/// in it) or a bare file name, which is placed in `export_dir`. Without a path
/// the timestamped file goes to `export_dir`, or the default exports directory.
pub fn export_history(
    monitor: &ResourceMonitor,
    format: ExportFormat,
    path: Option<PathBuf>,
    export_dir: Option<&Path>,
) -> Result<PathBuf, MonitorError> {
    let snapshot = monitor.snapshot();
    if snapshot.is_empty() {
        return Err(ExportError::NoData.into());
    }

    let path = resolve_export_path(path, export_dir, || {
        default_export_file_name(format, &Local::now())
    });
    write_export(&path, format, &snapshot)?;
    Ok(path)
}

fn resolve_export_path(
    path: Option<PathBuf>,
    export_dir: Option<&Path>,
    file_name: impl FnOnce() -> String,
) -> PathBuf {
    match path {
        Some(dir) if dir.is_dir() => dir.join(file_name()),
        Some(file) if is_bare_file_name(&file) => match export_dir {
            Some(dir) => dir.join(file),
            None => file,
        },
        Some(file) => file,
        None => export_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(get_exports_dir)
            .join(file_name()),
    }
}

fn is_bare_file_name(path: &Path) -> bool {
    path.parent()
        .map_or(true, |parent| parent.as_os_str().is_empty())
        && path.file_name().is_some()
}

/// Machine summary shown alongside the charts
pub fn get_host_info() -> HostInfo {
    describe_host()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name() -> String {
        "resource_monitor_data_20240101_120000.json".into()
    }

    #[test]
    fn test_bare_file_name_goes_to_export_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = resolve_export_path(Some("run.csv".into()), Some(dir.path()), name);
        assert_eq!(path, dir.path().join("run.csv"));

        assert_eq!(
            resolve_export_path(Some("run.csv".into()), None, name),
            PathBuf::from("run.csv")
        );
    }

    #[test]
    fn test_path_with_directory_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("nested").join("run.json");
        let other = tempfile::tempdir().unwrap();
        assert_eq!(
            resolve_export_path(Some(explicit.clone()), Some(other.path()), name),
            explicit
        );
        assert_eq!(
            resolve_export_path(Some("out/run.json".into()), Some(other.path()), name),
            PathBuf::from("out/run.json")
        );
    }

    #[test]
    fn test_directory_target_and_default_get_timestamped_name() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            resolve_export_path(Some(dir.path().to_path_buf()), None, name),
            dir.path().join(name())
        );
        assert_eq!(
            resolve_export_path(None, Some(dir.path()), name),
            dir.path().join(name())
        );
    }
}
