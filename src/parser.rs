//! Column normalization: maps loosely-named export columns onto the
//! canonical `TransactionRecord` shape. Missing optional columns become
//! `None`, never a hard failure.

use crate::classifier;
use crate::model::{PaymentStatus, RecurringStatus, TransactionRecord};
use crate::snapshot::RawSnapshot;
use crate::utils;

/// Resolved column positions for one snapshot's header row.
#[derive(Debug)]
struct ColumnMap {
    date: usize,
    contact: Option<usize>,
    amount: Option<usize>,
    detail: Option<usize>,
    status: Option<usize>,
    recurring: Option<usize>,
    first_name: Option<usize>,
    last_name: Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &[String]) -> Self {
        // Providers disagree on the date column name; fall back to the
        // first column like the rest of the alternates below.
        let date = find_column(
            headers,
            &[
                "Payment Date",
                "Payment Date (UTC)",
                "Payment Date (America/Los_Angeles)",
            ],
        )
        .or_else(|| {
            headers
                .iter()
                .position(|h| h.to_lowercase().starts_with("payment date"))
        })
        .unwrap_or(0);

        Self {
            date,
            contact: find_column(headers, &["Email", "Contact"]),
            amount: find_column(headers, &["Total Amount", "Amount"]),
            detail: find_column(headers, &["Details", "Description"]),
            status: find_column(headers, &["Payment Status"]),
            recurring: find_column(headers, &["Recurring Status"]),
            first_name: find_column(headers, &["First Name"]),
            last_name: find_column(headers, &["Last Name"]),
        }
    }
}

fn find_column(headers: &[String], names: &[&str]) -> Option<usize> {
    for name in names {
        let lower = name.to_lowercase();
        if let Some(index) = headers.iter().position(|h| h.to_lowercase() == lower) {
            return Some(index);
        }
    }
    None
}

fn cell(row: &[String], index: Option<usize>) -> Option<String> {
    let value = row.get(index?)?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Normalizes every snapshot row into a `TransactionRecord`. Per-row
/// anomalies (unparsable date or amount) are recovered in place and never
/// abort the run.
pub fn normalize(snapshot: &RawSnapshot) -> Vec<TransactionRecord> {
    let columns = ColumnMap::resolve(&snapshot.headers);

    snapshot
        .rows
        .iter()
        .map(|row| normalize_row(row, &columns))
        .collect()
}

fn normalize_row(row: &[String], columns: &ColumnMap) -> TransactionRecord {
    let timestamp_raw = row
        .get(columns.date)
        .map(|v| v.trim().to_string())
        .unwrap_or_default();
    let raw_detail = cell(row, columns.detail);

    // A snapshot without a status column reports everything as settled.
    let status = match columns.status {
        None => PaymentStatus::Succeeded,
        Some(index) => match cell(row, Some(index)) {
            Some(value) => PaymentStatus::parse(&value),
            None => PaymentStatus::Other,
        },
    };

    TransactionRecord {
        contact_key: cell(row, columns.contact).unwrap_or_default(),
        timestamp: utils::parse_datetime(&timestamp_raw),
        timestamp_raw,
        amount: cell(row, columns.amount).and_then(|v| utils::parse_amount(&v)),
        status,
        membership_tier: classifier::classify(raw_detail.as_deref()),
        raw_detail,
        recurring_status: cell(row, columns.recurring).map(|v| RecurringStatus::parse(&v)),
        first_name: cell(row, columns.first_name),
        last_name: cell(row, columns.last_name),
    }
}
