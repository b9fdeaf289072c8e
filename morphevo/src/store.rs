//! RON persistence of populations, champions, networks and configs.
use crate::errors::{ExperimentError, Result};

use ron::ser::PrettyConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Reads and decodes the object stored at `path`.
///
/// # Errors
/// Returns [`ExperimentError::Deserialization`] if the file
/// is missing, unreadable, or does not decode as a `T`.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).map_err(|e| ExperimentError::Deserialization {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    ron::from_str(&text).map_err(|e| ExperimentError::Deserialization {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Encodes `value` and writes it to `path`.
///
/// The object is written to a sibling temporary file first and
/// then renamed over `path`, so readers never observe a partially
/// written file.
///
/// # Errors
/// Returns [`ExperimentError::Io`] if the file cannot be written.
pub fn save<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = ron::ser::to_string_pretty(value, PrettyConfig::new()).map_err(|e| {
        ExperimentError::io(path, io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
    })?;
    let temporary = temporary_path(path);
    fs::write(&temporary, text).map_err(|e| ExperimentError::io(&temporary, e))?;
    fs::rename(&temporary, path).map_err(|e| ExperimentError::io(path, e))
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
