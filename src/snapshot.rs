use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::info;

use crate::model::SnapshotError;

/// Filename prefix the payment platform uses for its exports.
const EXPORT_PREFIX: &str = "zeffy-payments-";

/// A snapshot as read from disk: header row plus raw cells, before any
/// column normalization.
#[derive(Debug, Clone)]
pub struct RawSnapshot {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Boundary to whatever produces payment exports. The browser automation
/// that downloads them lives behind this seam; the engine only sees rows
/// or a failure.
pub trait SnapshotProvider {
    fn fetch(&self) -> Result<RawSnapshot, SnapshotError>;
}

/// Picks up the most recent export dropped into a directory, or an
/// explicitly configured file.
pub struct DirectorySource {
    export_dir: PathBuf,
    file_override: Option<PathBuf>,
}

impl DirectorySource {
    pub fn new(export_dir: impl Into<PathBuf>, file_override: Option<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
            file_override,
        }
    }

    /// Most recent `zeffy-payments-*.csv` by modification time.
    fn latest_export(&self) -> Result<PathBuf, SnapshotError> {
        let mut newest: Option<(SystemTime, PathBuf)> = None;

        for entry in fs::read_dir(&self.export_dir)? {
            let entry = entry?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.starts_with(EXPORT_PREFIX) || !name.ends_with(".csv") {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            if newest.as_ref().map(|(ts, _)| modified > *ts).unwrap_or(true) {
                newest = Some((modified, path));
            }
        }

        newest
            .map(|(_, path)| path)
            .ok_or_else(|| SnapshotError::NoExportFound(self.export_dir.display().to_string()))
    }
}

impl SnapshotProvider for DirectorySource {
    fn fetch(&self) -> Result<RawSnapshot, SnapshotError> {
        let path = match &self.file_override {
            Some(path) if path.exists() => path.clone(),
            Some(path) => {
                return Err(SnapshotError::Unreadable(format!(
                    "configured snapshot file not found: {}",
                    path.display()
                )));
            }
            None => self.latest_export()?,
        };

        info!("Reading snapshot: {}", path.display());
        read_raw_csv(&path).map_err(|e| SnapshotError::Unreadable(e.to_string()))
    }
}

/// Reads a CSV file into headers + raw string cells. Rows shorter than the
/// header are padded downstream; `flexible` keeps ragged exports readable.
pub fn read_raw_csv(path: &Path) -> Result<RawSnapshot, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect::<Vec<String>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|cell| cell.to_string()).collect());
    }

    Ok(RawSnapshot { headers, rows })
}
