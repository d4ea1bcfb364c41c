// Settings command handlers backed by settings.json
use crate::error::MonitorError;
use crate::file_manager::{read_json_file_or_default, write_json_file};
use crate::models::MonitorSettings;
use crate::utils::get_settings_json_path;
use log::debug;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSettingsParams {
    pub targets: Option<Vec<String>>,
    pub interval_seconds: Option<f64>,
    pub history_capacity: Option<usize>,
    pub include_system: Option<bool>,
    /// Empty string clears the export directory
    pub export_dir: Option<String>,
}

/// Current settings, defaults when nothing has been saved yet
pub fn get_settings() -> Result<MonitorSettings, MonitorError> {
    get_settings_at(&get_settings_json_path())
}

pub fn get_settings_at(path: &Path) -> Result<MonitorSettings, MonitorError> {
    Ok(read_json_file_or_default(path)?)
}

/// Update settings with partial update support
pub fn update_settings(params: UpdateSettingsParams) -> Result<MonitorSettings, MonitorError> {
    update_settings_at(&get_settings_json_path(), params)
}

/// Apply `params` to the stored settings. Nothing is written if the result
/// fails validation.
pub fn update_settings_at(
    path: &Path,
    params: UpdateSettingsParams,
) -> Result<MonitorSettings, MonitorError> {
    let mut current: MonitorSettings = read_json_file_or_default(path)?;

    if let Some(targets) = params.targets {
        current.targets = targets
            .into_iter()
            .map(|t| t.trim().to_string())
            .collect();
    }
    if let Some(interval_seconds) = params.interval_seconds {
        current.interval_seconds = interval_seconds;
    }
    if let Some(history_capacity) = params.history_capacity {
        current.history_capacity = history_capacity;
    }
    if let Some(include_system) = params.include_system {
        current.include_system = include_system;
    }
    if let Some(export_dir) = params.export_dir {
        current.export_dir = if export_dir.is_empty() {
            None
        } else {
            Some(export_dir)
        };
    }

    validate_stored(&current)?;
    write_json_file(path, &current)?;
    debug!("Settings saved to {:?}", path);
    Ok(current)
}

/// Saved settings may legitimately have no targets yet; everything else must
/// be startable.
fn validate_stored(settings: &MonitorSettings) -> Result<(), MonitorError> {
    match settings.validate() {
        Ok(_) | Err(crate::error::ConfigError::NothingToMonitor) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
