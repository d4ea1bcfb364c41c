use crate::error::StorageError;
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

static APP_DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

pub fn get_app_data_dir() -> PathBuf {
    APP_DATA_DIR
        .get_or_init(|| {
            let base_dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
            base_dir.join("resmon")
        })
        .clone()
}

pub fn get_data_dir() -> PathBuf {
    get_app_data_dir().join("data")
}

pub fn get_logs_dir() -> PathBuf {
    get_app_data_dir().join("logs")
}

/// Fallback location for exports when no directory is configured
pub fn get_exports_dir() -> PathBuf {
    dirs::document_dir()
        .map(|docs| docs.join("resmon"))
        .unwrap_or_else(|| get_app_data_dir().join("exports"))
}

pub fn get_settings_json_path() -> PathBuf {
    get_data_dir().join("settings.json")
}

pub fn initialize_data_directories() -> Result<(), StorageError> {
    for dir in [get_data_dir(), get_logs_dir()] {
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
                path: dir.display().to_string(),
                source,
            })?;
            info!("Created directory: {:?}", dir);
        }
    }
    Ok(())
}
