// Atomic file operations for settings and exports

use crate::error::StorageError;
use log::debug;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

lazy_static::lazy_static! {
    static ref FILE_LOCK: Mutex<()> = Mutex::new(());
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let _lock = FILE_LOCK.lock();

    let mut file = File::open(path).map_err(|e| io_error(path, e))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| io_error(path, e))?;

    serde_json::from_str(&contents).map_err(|source| StorageError::Json {
        path: path.display().to_string(),
        source,
    })
}

pub fn read_json_file_or_default<T: DeserializeOwned + Default>(
    path: &Path,
) -> Result<T, StorageError> {
    if path.exists() {
        read_json_file(path)
    } else {
        debug!("{:?} not found, using defaults", path);
        Ok(T::default())
    }
}

/// Serialize as 2-space pretty JSON and write atomically
pub fn write_json_file<T: Serialize>(path: &Path, data: &T) -> Result<(), StorageError> {
    let json_string = serde_json::to_string_pretty(data).map_err(|source| StorageError::Json {
        path: path.display().to_string(),
        source,
    })?;
    write_text_file(path, &json_string)
}

/// Writes text atomically using write-to-temp-then-rename
pub fn write_text_file(path: &Path, contents: &str) -> Result<(), StorageError> {
    let _lock = FILE_LOCK.lock();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = std::path::PathBuf::from(temp_name);

    let mut temp_file = File::create(&temp_path).map_err(|e| io_error(&temp_path, e))?;
    temp_file
        .write_all(contents.as_bytes())
        .map_err(|e| io_error(&temp_path, e))?;
    temp_file.sync_all().map_err(|e| io_error(&temp_path, e))?;

    fs::rename(&temp_path, path).map_err(|e| io_error(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sample.json");
        let data = Sample {
            name: "a".into(),
            count: 3,
        };
        write_json_file(&path, &data).unwrap();
        assert_eq!(read_json_file::<Sample>(&path).unwrap(), data);
        assert!(!dir.path().join("nested").join("sample.json.tmp").exists());
    }

    #[test]
    fn test_missing_file_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let value: Sample = read_json_file_or_default(&dir.path().join("none.json")).unwrap();
        assert_eq!(value, Sample::default());
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            read_json_file::<Sample>(&path),
            Err(StorageError::Json { .. })
        ));
    }
}
