//! Cohort construction: active / new / churned member lists derived from
//! the membership-payment subset of the ledger.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};

use crate::analyzer::AnalysisWindows;
use crate::model::{MembershipTier, RecurringStatus, TransactionRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct MemberSummary {
    pub name: String,
    pub email: String,
    pub membership_type: MembershipTier,
    pub days_as_member: i64,
    pub first_payment: DateTime<Utc>,
    pub last_payment: DateTime<Utc>,
    pub total_payments: usize,
    pub recurring_status: RecurringStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuitSummary {
    pub name: String,
    pub email: String,
    pub membership_type: MembershipTier,
    pub last_payment: DateTime<Utc>,
    pub days_since_last: i64,
    pub quit_reason: &'static str,
    pub recurring_status: RecurringStatus,
}

#[derive(Debug, Default)]
pub struct Cohorts {
    /// Everyone with a membership payment in the active window, including
    /// members whose recurring plan is already stopped.
    pub active: Vec<MemberSummary>,
    /// Active members whose first-ever membership payment is recent.
    pub new: Vec<MemberSummary>,
    /// Recently churned members surfaced for the dashboard.
    pub quit: Vec<QuitSummary>,
    /// Contact keys of active members still on a live plan.
    pub ongoing_contacts: HashSet<String>,
}

/// Per-contact membership history, each list sorted by timestamp.
type History<'a> = HashMap<&'a str, Vec<&'a TransactionRecord>>;

fn member_history<'a>(memberships: &[&'a TransactionRecord]) -> History<'a> {
    let mut grouped: History<'a> = HashMap::new();
    for record in memberships {
        grouped
            .entry(record.contact_key.as_str())
            .or_default()
            .push(record);
    }
    for rows in grouped.values_mut() {
        rows.sort_by_key(|r| r.timestamp);
    }
    grouped
}

fn latest_recurring(rows: &[&TransactionRecord]) -> RecurringStatus {
    rows.last()
        .and_then(|r| r.recurring_status)
        .unwrap_or(RecurringStatus::Unknown)
}

fn summarize(contact: &str, rows: &[&TransactionRecord], as_of: DateTime<Utc>) -> MemberSummary {
    // Rows are non-empty by construction and pre-filtered to parsed dates.
    let first_payment = rows.first().and_then(|r| r.timestamp).unwrap_or(as_of);
    let last_payment = rows.last().and_then(|r| r.timestamp).unwrap_or(as_of);
    let tier = rows
        .last()
        .map(|r| r.membership_tier)
        .unwrap_or(MembershipTier::None);
    let name = rows
        .last()
        .map(|r| r.display_name())
        .unwrap_or_else(|| contact.to_string());

    MemberSummary {
        name,
        email: contact.to_string(),
        membership_type: tier,
        days_as_member: (as_of - first_payment).num_days(),
        first_payment,
        last_payment,
        total_payments: rows.len(),
        recurring_status: latest_recurring(rows),
    }
}

/// First-seen-wins dedup by rendered name. Two contact keys sharing a
/// display name collapse into one reported member; counts use the deduped
/// lists.
fn dedupe_by_name<T: Clone>(entries: &[T], name_of: impl Fn(&T) -> String) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for entry in entries {
        if seen.insert(name_of(entry)) {
            unique.push(entry.clone());
        }
    }
    unique
}

pub fn build_cohorts(
    memberships: &[&TransactionRecord],
    as_of: DateTime<Utc>,
    windows: &AnalysisWindows,
) -> Cohorts {
    let active_cutoff = as_of - Duration::days(windows.active_days);
    let history = member_history(memberships);

    let recent_contacts: HashSet<&str> = memberships
        .iter()
        .filter(|r| r.timestamp.map(|ts| ts >= active_cutoff).unwrap_or(false))
        .map(|r| r.contact_key.as_str())
        .collect();

    // Active list: summarized over the contact's full membership history,
    // sorted by tenure so name-dedup keeps the longest-standing entry.
    let mut active: Vec<MemberSummary> = recent_contacts
        .iter()
        .filter_map(|contact| history.get(contact).map(|rows| summarize(contact, rows, as_of)))
        .collect();
    active.sort_by(|a, b| {
        b.days_as_member
            .cmp(&a.days_as_member)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.email.cmp(&b.email))
    });

    let new_candidates: Vec<MemberSummary> = active
        .iter()
        .filter(|m| m.days_as_member <= windows.new_member_days)
        .cloned()
        .collect();

    // Churn, union of two signals: an explicit stop on the latest known
    // recurring status, or no payment activity inside the active window.
    let stopped_contacts: HashSet<&str> = history
        .iter()
        .filter(|(_, rows)| latest_recurring(rows) == RecurringStatus::Stopped)
        .map(|(contact, _)| *contact)
        .collect();
    let former_contacts: HashSet<&str> = memberships
        .iter()
        .filter(|r| r.timestamp.map(|ts| ts < active_cutoff).unwrap_or(false))
        .map(|r| r.contact_key.as_str())
        .collect();
    let inactive_contacts: HashSet<&str> = former_contacts
        .difference(&recent_contacts)
        .copied()
        .collect();

    let mut quit: Vec<QuitSummary> = Vec::new();
    for contact in stopped_contacts.union(&inactive_contacts) {
        let Some(rows) = history.get(contact) else {
            continue;
        };
        let last_payment = rows.last().and_then(|r| r.timestamp).unwrap_or(as_of);
        let days_since_last = (as_of - last_payment).num_days();
        let is_stopped = stopped_contacts.contains(contact);

        // Wide detection, narrow reporting: implicit-only churns surface
        // only while the lapse is fresh; explicit stops always surface.
        if !is_stopped && days_since_last > windows.new_member_days {
            continue;
        }

        quit.push(QuitSummary {
            name: rows
                .last()
                .map(|r| r.display_name())
                .unwrap_or_else(|| contact.to_string()),
            email: contact.to_string(),
            membership_type: rows
                .last()
                .map(|r| r.membership_tier)
                .unwrap_or(MembershipTier::None),
            last_payment,
            days_since_last,
            quit_reason: if is_stopped {
                "Cancelled (Recurring Stopped)"
            } else {
                "Inactive (No recent payment)"
            },
            recurring_status: latest_recurring(rows),
        });
    }
    quit.sort_by(|a, b| {
        a.days_since_last
            .cmp(&b.days_since_last)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.email.cmp(&b.email))
    });

    let active = dedupe_by_name(&active, |m| m.name.clone());
    let new = dedupe_by_name(&new_candidates, |m| m.name.clone());
    let quit = dedupe_by_name(&quit, |q| q.name.clone());

    let ongoing_contacts: HashSet<String> = active
        .iter()
        .filter(|m| m.recurring_status != RecurringStatus::Stopped)
        .map(|m| m.email.clone())
        .collect();

    Cohorts {
        active,
        new,
        quit,
        ongoing_contacts,
    }
}
