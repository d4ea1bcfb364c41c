// Export of a history snapshot to JSON or CSV
pub mod csv;
pub mod json;

use crate::error::ExportError;
use crate::file_manager::write_text_file;
use crate::monitor::HistorySnapshot;
use chrono::{DateTime, Local};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use self::csv::to_csv;
pub use self::json::to_json;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    /// Guess from a file extension, case-insensitively
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }
}

/// `resource_monitor_data_<YYYYmmdd_HHMMSS>.<ext>`
pub fn default_export_file_name(format: ExportFormat, now: &DateTime<Local>) -> String {
    format!(
        "resource_monitor_data_{}.{}",
        now.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

/// Render `snapshot` in `format` and write it atomically to `path`
pub fn write_export(
    path: &Path,
    format: ExportFormat,
    snapshot: &HistorySnapshot,
) -> Result<(), ExportError> {
    let contents = match format {
        ExportFormat::Json => to_json(snapshot)?,
        ExportFormat::Csv => to_csv(snapshot)?,
    };
    write_text_file(path, &contents)?;
    info!(
        "Exported {} ticks of {} target(s) to {:?}",
        snapshot.len(),
        snapshot.targets.len(),
        path
    );
    Ok(())
}
