//! Map export: write the current snapshot to a JSON file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use mbot_console_core::MapSnapshot;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot encode map: {0}")]
    Encode(#[from] serde_json::Error),
}

/// `<hostname>-map-<UTC timestamp>.json`, with anything unsafe in a file
/// name replaced by `_`.
pub fn file_name(hostname: &str, now: DateTime<Utc>) -> String {
    let host: String = hostname
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{host}-map-{}.json", now.format("%Y%m%dT%H%M%SZ"))
}

pub fn write_snapshot(
    dir: &Path,
    hostname: &str,
    snapshot: &MapSnapshot,
    now: DateTime<Utc>,
) -> Result<PathBuf, ExportError> {
    let path = dir.join(file_name(hostname, now));
    let json = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(&path, json).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
