// Core structs: TransactionRecord, MergeStats, plus the subsystem error enums
use chrono::{DateTime, Utc};
use thiserror::Error;

/// One normalized payment event from a snapshot or the persisted ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    /// Stable payer identity (email or equivalent).
    pub contact_key: String,
    /// Original date cell, preserved verbatim; part of the dedup key so rows
    /// with unparsable dates still merge deterministically.
    pub timestamp_raw: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub amount: Option<f64>,
    pub status: PaymentStatus,
    pub raw_detail: Option<String>,
    pub membership_tier: MembershipTier,
    pub recurring_status: Option<RecurringStatus>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl TransactionRecord {
    /// Natural dedup key: at most one stored record per pair after merge.
    pub fn dedup_key(&self) -> (String, String) {
        (self.contact_key.clone(), self.timestamp_raw.clone())
    }

    /// "First Last" when any name field is present, otherwise the contact key.
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("").trim();
        let last = self.last_name.as_deref().unwrap_or("").trim();
        if first.is_empty() && last.is_empty() {
            self.contact_key.clone()
        } else {
            format!("{} {}", first, last).trim().to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Succeeded,
    Other,
}

impl PaymentStatus {
    /// Anything mentioning "succeed" counts; exports vary between
    /// "Succeeded" and "Payment succeeded".
    pub fn parse(raw: &str) -> Self {
        if raw.to_lowercase().contains("succeed") {
            PaymentStatus::Succeeded
        } else {
            PaymentStatus::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentStatus::Succeeded => "Succeeded",
            PaymentStatus::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MembershipTier {
    Basic,
    Pro,
    Volunteer,
    None,
}

impl MembershipTier {
    pub fn is_membership(&self) -> bool {
        !matches!(self, MembershipTier::None)
    }

    pub fn label(&self) -> &'static str {
        match self {
            MembershipTier::Basic => "Basic",
            MembershipTier::Pro => "Pro",
            MembershipTier::Volunteer => "Volunteer",
            MembershipTier::None => "None",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurringStatus {
    Active,
    Stopped,
    Unknown,
}

impl RecurringStatus {
    pub fn parse(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        if lower.contains("stopped") {
            RecurringStatus::Stopped
        } else if lower.contains("active") {
            RecurringStatus::Active
        } else {
            RecurringStatus::Unknown
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecurringStatus::Active => "Active",
            RecurringStatus::Stopped => "Stopped",
            RecurringStatus::Unknown => "Unknown",
        }
    }
}

/// Outcome of one merge invocation, for logging and assertions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub duplicates_removed: usize,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("no export files found in {0}")]
    NoExportFound(String),
    #[error("snapshot unreadable: {0}")]
    Unreadable(String),
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ledger csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("ledger is locked: {0}")]
    Locked(String),
    #[error("ledger write failed: {0}")]
    WriteFailed(String),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("report serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
