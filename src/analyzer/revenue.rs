//! Revenue aggregation: calendar-month revenue, per-tier figures over the
//! active window, the six-month trend, and the in-progress-month projection.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};

use crate::model::TransactionRecord;
use crate::utils;

fn amount_of(record: &TransactionRecord) -> f64 {
    // Absent amounts count as zero in sums; averages exclude them instead.
    record.amount.unwrap_or(0.0)
}

/// Membership payments inside the last complete calendar month,
/// `[first_day_of_previous_month, first_day_of_current_month)`.
pub fn last_month_payments<'a>(
    memberships: &[&'a TransactionRecord],
    as_of: DateTime<Utc>,
) -> Vec<&'a TransactionRecord> {
    let current_month_start = utils::month_start(as_of);
    let last_month_start = utils::previous_month_start(as_of);

    memberships
        .iter()
        .filter(|r| {
            r.timestamp
                .map(|ts| ts >= last_month_start && ts < current_month_start)
                .unwrap_or(false)
        })
        .copied()
        .collect()
}

pub fn total_amount(payments: &[&TransactionRecord]) -> f64 {
    payments.iter().map(|r| amount_of(r)).sum()
}

/// Revenue per tier over the given payment set.
pub fn revenue_by_tier(payments: &[&TransactionRecord]) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for record in payments {
        *totals
            .entry(record.membership_tier.label().to_string())
            .or_default() += amount_of(record);
    }
    totals
}

/// Mean payment per tier; rows without an amount are left out of the mean.
pub fn average_payment_by_tier(payments: &[&TransactionRecord]) -> BTreeMap<String, f64> {
    let mut sums: HashMap<&'static str, (f64, usize)> = HashMap::new();
    for record in payments {
        if let Some(amount) = record.amount {
            let entry = sums.entry(record.membership_tier.label()).or_insert((0.0, 0));
            entry.0 += amount;
            entry.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(tier, (sum, count))| (tier.to_string(), sum / count as f64))
        .collect()
}

/// Membership revenue grouped by calendar month over the trailing trend
/// window, keyed by sortable "YYYY-MM" labels.
pub fn monthly_trend(
    memberships: &[&TransactionRecord],
    as_of: DateTime<Utc>,
    trend_days: i64,
) -> BTreeMap<String, f64> {
    let cutoff = as_of - Duration::days(trend_days);
    let mut trend: BTreeMap<String, f64> = BTreeMap::new();
    for record in memberships {
        let Some(ts) = record.timestamp else { continue };
        if ts >= cutoff {
            *trend.entry(utils::month_key(ts)).or_default() += amount_of(record);
        }
    }
    trend
}

/// Projects the in-progress month from the ongoing members' last-complete-
/// month average, falling back to their active-window average when none of
/// them paid last month. Zero ongoing members projects zero.
pub fn projected_revenue(
    ongoing_contacts: &HashSet<String>,
    last_month: &[&TransactionRecord],
    recent: &[&TransactionRecord],
) -> f64 {
    let ongoing_count = ongoing_contacts.len();
    if ongoing_count == 0 {
        return 0.0;
    }

    let ongoing_last_month: Vec<&&TransactionRecord> = last_month
        .iter()
        .filter(|r| ongoing_contacts.contains(&r.contact_key))
        .collect();

    let avg_per_member = if !ongoing_last_month.is_empty() {
        let payers: HashSet<&str> = ongoing_last_month
            .iter()
            .map(|r| r.contact_key.as_str())
            .collect();
        let sum: f64 = ongoing_last_month.iter().map(|r| amount_of(r)).sum();
        sum / payers.len() as f64
    } else {
        let sum: f64 = recent
            .iter()
            .filter(|r| ongoing_contacts.contains(&r.contact_key))
            .map(|r| amount_of(r))
            .sum();
        sum / ongoing_count as f64
    };

    avg_per_member * ongoing_count as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MembershipTier, PaymentStatus};

    fn record(contact: &str, date: &str, amount: Option<f64>, tier: MembershipTier) -> TransactionRecord {
        TransactionRecord {
            contact_key: contact.to_string(),
            timestamp_raw: date.to_string(),
            timestamp: utils::parse_datetime(date),
            amount,
            status: PaymentStatus::Succeeded,
            raw_detail: None,
            membership_tier: tier,
            recurring_status: None,
            first_name: None,
            last_name: None,
        }
    }

    fn as_of() -> DateTime<Utc> {
        utils::parse_datetime("2026-08-15 12:00:00").unwrap()
    }

    #[test]
    fn last_complete_month_excludes_current_month() {
        // Two July payments count, the August one does not.
        let records = vec![
            record("a@x.org", "2026-07-03", Some(25.0), MembershipTier::Basic),
            record("b@x.org", "2026-07-20", Some(25.0), MembershipTier::Basic),
            record("a@x.org", "2026-08-03", Some(25.0), MembershipTier::Basic),
        ];
        let refs: Vec<&TransactionRecord> = records.iter().collect();

        let last_month = last_month_payments(&refs, as_of());
        assert_eq!(last_month.len(), 2);
        assert_eq!(total_amount(&last_month), 50.0);
    }

    #[test]
    fn month_boundary_is_half_open() {
        let records = vec![
            record("a@x.org", "2026-07-01 00:00:00", Some(10.0), MembershipTier::Basic),
            record("b@x.org", "2026-08-01 00:00:00", Some(10.0), MembershipTier::Basic),
            record("c@x.org", "2026-06-30 23:59:59", Some(10.0), MembershipTier::Basic),
        ];
        let refs: Vec<&TransactionRecord> = records.iter().collect();

        let last_month = last_month_payments(&refs, as_of());
        assert_eq!(last_month.len(), 1);
        assert_eq!(last_month[0].contact_key, "a@x.org");
    }

    #[test]
    fn tier_revenue_and_averages() {
        let records = vec![
            record("a@x.org", "2026-08-01", Some(10.0), MembershipTier::Basic),
            record("b@x.org", "2026-08-02", Some(30.0), MembershipTier::Basic),
            record("c@x.org", "2026-08-03", Some(50.0), MembershipTier::Pro),
            record("d@x.org", "2026-08-04", None, MembershipTier::Pro),
        ];
        let refs: Vec<&TransactionRecord> = records.iter().collect();

        let revenue = revenue_by_tier(&refs);
        assert_eq!(revenue["Basic"], 40.0);
        assert_eq!(revenue["Pro"], 50.0);

        // The amount-less Pro row is excluded from the mean, not zeroed.
        let averages = average_payment_by_tier(&refs);
        assert_eq!(averages["Basic"], 20.0);
        assert_eq!(averages["Pro"], 50.0);
    }

    #[test]
    fn trend_groups_by_calendar_month() {
        let records = vec![
            record("a@x.org", "2026-06-10", Some(10.0), MembershipTier::Basic),
            record("a@x.org", "2026-07-10", Some(10.0), MembershipTier::Basic),
            record("b@x.org", "2026-07-11", Some(15.0), MembershipTier::Basic),
            record("a@x.org", "2025-12-10", Some(99.0), MembershipTier::Basic),
        ];
        let refs: Vec<&TransactionRecord> = records.iter().collect();

        let trend = monthly_trend(&refs, as_of(), 180);
        assert_eq!(trend.get("2026-06"), Some(&10.0));
        assert_eq!(trend.get("2026-07"), Some(&25.0));
        // Outside the trailing window.
        assert_eq!(trend.get("2025-12"), None);
    }

    #[test]
    fn projection_uses_last_month_average() {
        let last_month = vec![
            record("a@x.org", "2026-07-03", Some(25.0), MembershipTier::Basic),
            record("b@x.org", "2026-07-05", Some(35.0), MembershipTier::Basic),
        ];
        let last_refs: Vec<&TransactionRecord> = last_month.iter().collect();
        let ongoing: HashSet<String> = ["a@x.org", "b@x.org", "c@x.org"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        // (25 + 35) / 2 payers = 30 avg, times 3 ongoing members.
        let projected = projected_revenue(&ongoing, &last_refs, &[]);
        assert_eq!(projected, 90.0);
    }

    #[test]
    fn projection_falls_back_to_recent_window() {
        let recent = vec![
            record("a@x.org", "2026-08-03", Some(20.0), MembershipTier::Basic),
            record("b@x.org", "2026-08-05", Some(40.0), MembershipTier::Basic),
        ];
        let recent_refs: Vec<&TransactionRecord> = recent.iter().collect();
        let ongoing: HashSet<String> = ["a@x.org", "b@x.org"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let projected = projected_revenue(&ongoing, &[], &recent_refs);
        assert_eq!(projected, 60.0);
    }

    #[test]
    fn zero_ongoing_members_project_zero() {
        let recent = vec![record("a@x.org", "2026-08-03", Some(20.0), MembershipTier::Basic)];
        let recent_refs: Vec<&TransactionRecord> = recent.iter().collect();

        assert_eq!(projected_revenue(&HashSet::new(), &[], &recent_refs), 0.0);
    }
}
