// Analyzer module: lifecycle cohorts and revenue figures derived from the
// merged ledger. Pure with respect to the ledger snapshot and `as_of`.

pub mod lifecycle;
pub mod revenue;

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};

pub use lifecycle::{MemberSummary, QuitSummary};

use crate::model::{PaymentStatus, TransactionRecord};
use crate::utils;

/// Trailing lookback lengths anchored at analysis time.
#[derive(Debug, Clone)]
pub struct AnalysisWindows {
    pub active_days: i64,
    pub new_member_days: i64,
    pub trend_days: i64,
}

impl Default for AnalysisWindows {
    fn default() -> Self {
        Self {
            active_days: 60,
            new_member_days: 30,
            trend_days: 180,
        }
    }
}

/// Everything the dashboard renders, still in typed form; the report
/// module flattens it for export.
#[derive(Debug, Clone)]
pub struct DashboardMetrics {
    pub as_of: DateTime<Utc>,
    pub ongoing_members: usize,
    pub total_active_members: usize,
    pub membership_breakdown: BTreeMap<String, usize>,
    pub monthly_revenue: f64,
    pub monthly_revenue_month: String,
    pub projected_revenue: f64,
    pub projected_revenue_month: String,
    pub revenue_by_type: BTreeMap<String, f64>,
    pub members_quit_60_days: usize,
    pub avg_payment_by_type: BTreeMap<String, f64>,
    pub monthly_trend: BTreeMap<String, f64>,
    pub total_payments: usize,
    pub new_members_30_days: usize,
    pub active_member_list: Vec<MemberSummary>,
    pub new_member_list: Vec<MemberSummary>,
    pub quit_member_list: Vec<QuitSummary>,
}

/// Distinct contacts per tier over the recent window.
fn membership_breakdown(recent: &[&TransactionRecord]) -> BTreeMap<String, usize> {
    let mut contacts_by_tier: HashMap<&'static str, HashSet<&str>> = HashMap::new();
    for record in recent {
        contacts_by_tier
            .entry(record.membership_tier.label())
            .or_default()
            .insert(record.contact_key.as_str());
    }
    contacts_by_tier
        .into_iter()
        .map(|(tier, contacts)| (tier.to_string(), contacts.len()))
        .collect()
}

pub fn analyze(
    records: &[TransactionRecord],
    as_of: DateTime<Utc>,
    windows: &AnalysisWindows,
) -> DashboardMetrics {
    // Only settled payments feed any metric; the raw total keeps
    // non-membership rows and rows without a usable date.
    let succeeded: Vec<&TransactionRecord> = records
        .iter()
        .filter(|r| r.status == PaymentStatus::Succeeded)
        .collect();
    let memberships: Vec<&TransactionRecord> = succeeded
        .iter()
        .filter(|r| r.membership_tier.is_membership() && r.timestamp.is_some())
        .copied()
        .collect();

    let active_cutoff = as_of - Duration::days(windows.active_days);
    let recent: Vec<&TransactionRecord> = memberships
        .iter()
        .filter(|r| r.timestamp.map(|ts| ts >= active_cutoff).unwrap_or(false))
        .copied()
        .collect();

    let cohorts = lifecycle::build_cohorts(&memberships, as_of, windows);

    let last_month = revenue::last_month_payments(&memberships, as_of);
    let monthly_revenue = revenue::total_amount(&last_month);
    let projected = revenue::projected_revenue(&cohorts.ongoing_contacts, &last_month, &recent);

    DashboardMetrics {
        as_of,
        ongoing_members: cohorts.ongoing_contacts.len(),
        total_active_members: cohorts.active.len(),
        membership_breakdown: membership_breakdown(&recent),
        monthly_revenue,
        monthly_revenue_month: utils::month_name(utils::previous_month_start(as_of)),
        projected_revenue: projected,
        projected_revenue_month: utils::month_name(as_of),
        revenue_by_type: revenue::revenue_by_tier(&recent),
        members_quit_60_days: cohorts.quit.len(),
        avg_payment_by_type: revenue::average_payment_by_tier(&recent),
        monthly_trend: revenue::monthly_trend(&memberships, as_of, windows.trend_days),
        total_payments: succeeded.len(),
        new_members_30_days: cohorts.new.len(),
        active_member_list: cohorts.active,
        new_member_list: cohorts.new,
        quit_member_list: cohorts.quit,
    }
}
