//! Ledger merge: folds a freshly normalized snapshot into the existing
//! ledger, last-write-wins on the `(contact_key, timestamp_raw)` key.

use std::collections::HashMap;

use crate::model::{MergeStats, TransactionRecord};

/// Merges `snapshot` into `existing`. Key collisions are replaced in place,
/// so a status correction in a re-export (pending -> succeeded) updates the
/// stored row without reordering the ledger. Re-merging the same snapshot
/// is a no-op beyond the `unchanged` counter.
pub fn merge(
    existing: Vec<TransactionRecord>,
    snapshot: Vec<TransactionRecord>,
) -> (Vec<TransactionRecord>, MergeStats) {
    let input_total = existing.len() + snapshot.len();
    let mut merged: Vec<TransactionRecord> = Vec::with_capacity(input_total);
    let mut index: HashMap<(String, String), usize> = HashMap::with_capacity(input_total);
    let mut stats = MergeStats::default();

    // The persisted ledger is already deduplicated, but collapse defensively
    // (keep last) so a hand-edited file cannot violate key uniqueness.
    for record in existing {
        match index.get(&record.dedup_key()) {
            Some(&position) => merged[position] = record,
            None => {
                index.insert(record.dedup_key(), merged.len());
                merged.push(record);
            }
        }
    }

    for record in snapshot {
        match index.get(&record.dedup_key()) {
            Some(&position) => {
                if merged[position] == record {
                    stats.unchanged += 1;
                } else {
                    merged[position] = record;
                    stats.updated += 1;
                }
            }
            None => {
                index.insert(record.dedup_key(), merged.len());
                merged.push(record);
                stats.added += 1;
            }
        }
    }

    stats.duplicates_removed = input_total - merged.len();
    (merged, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MembershipTier, PaymentStatus};
    use std::collections::HashSet;

    fn record(contact: &str, date: &str, amount: f64) -> TransactionRecord {
        TransactionRecord {
            contact_key: contact.to_string(),
            timestamp_raw: date.to_string(),
            timestamp: crate::utils::parse_datetime(date),
            amount: Some(amount),
            status: PaymentStatus::Succeeded,
            raw_detail: Some("Basic Membership".to_string()),
            membership_tier: MembershipTier::Basic,
            recurring_status: None,
            first_name: None,
            last_name: None,
        }
    }

    #[test]
    fn bootstrap_from_empty_ledger() {
        let snapshot = vec![
            record("a@x.org", "2026-08-01", 25.0),
            record("b@x.org", "2026-08-02", 25.0),
        ];
        let (merged, stats) = merge(Vec::new(), snapshot.clone());
        assert_eq!(merged, snapshot);
        assert_eq!(stats.added, 2);
        assert_eq!(stats.duplicates_removed, 0);
    }

    #[test]
    fn merge_is_idempotent() {
        let ledger = vec![record("a@x.org", "2026-07-01", 25.0)];
        let snapshot = vec![
            record("a@x.org", "2026-08-01", 25.0),
            record("b@x.org", "2026-08-02", 10.0),
        ];

        let (once, _) = merge(ledger, snapshot.clone());
        let (twice, stats) = merge(once.clone(), snapshot);
        assert_eq!(once, twice);
        assert_eq!(stats.added, 0);
        assert_eq!(stats.updated, 0);
        assert_eq!(stats.unchanged, 2);
    }

    #[test]
    fn snapshot_row_replaces_existing_on_key_collision() {
        let ledger = vec![record("a@x.org", "2026-08-01", 25.0)];
        let mut corrected = record("a@x.org", "2026-08-01", 25.0);
        corrected.status = PaymentStatus::Succeeded;
        corrected.amount = Some(30.0);

        let (merged, stats) = merge(ledger, vec![corrected.clone()]);
        assert_eq!(merged, vec![corrected]);
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.duplicates_removed, 1);
    }

    #[test]
    fn within_snapshot_duplicates_keep_last() {
        let first = record("a@x.org", "2026-08-01", 10.0);
        let second = record("a@x.org", "2026-08-01", 20.0);
        let (merged, stats) = merge(Vec::new(), vec![first, second.clone()]);
        assert_eq!(merged, vec![second]);
        assert_eq!(stats.added, 1);
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.duplicates_removed, 1);
    }

    #[test]
    fn same_contact_different_dates_both_kept() {
        let snapshot = vec![
            record("a@x.org", "2026-07-01", 25.0),
            record("a@x.org", "2026-08-01", 25.0),
        ];
        let (merged, _) = merge(Vec::new(), snapshot);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn merged_ledger_has_unique_keys() {
        let ledger = vec![
            record("a@x.org", "2026-07-01", 25.0),
            record("b@x.org", "2026-07-02", 25.0),
        ];
        let snapshot = vec![
            record("a@x.org", "2026-07-01", 30.0),
            record("c@x.org", "2026-08-01", 25.0),
            record("c@x.org", "2026-08-01", 25.0),
        ];
        let (merged, _) = merge(ledger, snapshot);

        let keys: HashSet<_> = merged.iter().map(|r| r.dedup_key()).collect();
        assert_eq!(keys.len(), merged.len());
    }

    #[test]
    fn rows_with_unparsable_dates_still_dedup() {
        let mut row = record("a@x.org", "not a date", 5.0);
        row.timestamp = None;
        let (merged, stats) = merge(vec![row.clone()], vec![row]);
        assert_eq!(merged.len(), 1);
        assert_eq!(stats.unchanged, 1);
    }
}
