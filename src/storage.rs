//! Ledger persistence: a single authoritative CSV, rewritten atomically on
//! each merge, with timestamped backup copies alongside.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;

use crate::model::{LedgerError, TransactionRecord};
use crate::parser;
use crate::snapshot;

/// Canonical ledger column set. Loading goes back through the same column
/// normalization as snapshots, so these names must stay in the alternate
/// lists `parser::ColumnMap` resolves.
const LEDGER_COLUMNS: [&str; 8] = [
    "Email",
    "Payment Date",
    "Total Amount",
    "Payment Status",
    "Details",
    "Recurring Status",
    "First Name",
    "Last Name",
];

pub struct LedgerStore {
    ledger_path: PathBuf,
    backup_dir: PathBuf,
}

impl LedgerStore {
    pub fn new(ledger_path: impl Into<PathBuf>, backup_dir: Option<PathBuf>) -> Self {
        let ledger_path = ledger_path.into();
        let backup_dir = backup_dir.unwrap_or_else(|| {
            ledger_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        });
        Self {
            ledger_path,
            backup_dir,
        }
    }

    /// Takes the exclusive lock covering the load -> merge -> persist
    /// critical section. Released on drop on all exit paths.
    pub fn lock(&self) -> Result<LedgerLock, LedgerError> {
        LedgerLock::acquire(&self.ledger_path)
    }

    /// Loads the persisted ledger. A missing file is an empty ledger, not
    /// an error (first run bootstrap).
    pub fn load(&self) -> Result<Vec<TransactionRecord>, LedgerError> {
        if !self.ledger_path.exists() {
            info!("No ledger at {}, starting empty", self.ledger_path.display());
            return Ok(Vec::new());
        }
        let raw = snapshot::read_raw_csv(&self.ledger_path)?;
        Ok(parser::normalize(&raw))
    }

    /// Rewrites the ledger through a sibling temp file plus rename, so a
    /// failed write leaves the prior version untouched and readable.
    pub fn save(&self, records: &[TransactionRecord]) -> Result<(), LedgerError> {
        if let Some(parent) = self.ledger_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.ledger_path.with_extension("csv.tmp");
        write_ledger_csv(&tmp_path, records)?;
        fs::rename(&tmp_path, &self.ledger_path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            LedgerError::WriteFailed(format!(
                "could not replace {}: {}",
                self.ledger_path.display(),
                e
            ))
        })?;

        info!(
            "Saved ledger: {} ({} records)",
            self.ledger_path.display(),
            records.len()
        );
        Ok(())
    }

    /// Writes a timestamped backup of the merged ledger. Backups are
    /// append-only: an existing file is never overwritten.
    pub fn write_backup(&self, records: &[TransactionRecord]) -> Result<PathBuf, LedgerError> {
        fs::create_dir_all(&self.backup_dir)?;

        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let mut path = self
            .backup_dir
            .join(format!("payment_history_backup_{}.csv", stamp));
        let mut attempt = 1;
        while path.exists() {
            path = self
                .backup_dir
                .join(format!("payment_history_backup_{}_{}.csv", stamp, attempt));
            attempt += 1;
        }

        write_ledger_csv(&path, records)?;
        info!("Backup saved: {}", path.display());
        Ok(path)
    }
}

fn write_ledger_csv(path: &Path, records: &[TransactionRecord]) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(LEDGER_COLUMNS)?;

    for record in records {
        let amount = record.amount.map(|a| a.to_string()).unwrap_or_default();
        writer.write_record([
            record.contact_key.as_str(),
            record.timestamp_raw.as_str(),
            amount.as_str(),
            record.status.label(),
            record.raw_detail.as_deref().unwrap_or(""),
            record
                .recurring_status
                .map(|s| s.label())
                .unwrap_or_default(),
            record.first_name.as_deref().unwrap_or(""),
            record.last_name.as_deref().unwrap_or(""),
        ])?;
    }

    writer.flush().map_err(LedgerError::Io)
}

/// Lock file guarding the ledger path. `create_new` makes acquisition
/// atomic; dropping the guard removes the file.
pub struct LedgerLock {
    lock_path: PathBuf,
}

impl LedgerLock {
    fn acquire(ledger_path: &Path) -> Result<Self, LedgerError> {
        let lock_path = PathBuf::from(format!("{}.lock", ledger_path.display()));
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }

        match fs::File::options()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(_) => Ok(Self { lock_path }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(LedgerError::Locked(
                format!("{} exists; another merge is running", lock_path.display()),
            )),
            Err(e) => Err(LedgerError::Io(e)),
        }
    }
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}
