//! Dashboard export: flattens `DashboardMetrics` into the JSON document the
//! static dashboard page consumes. Currency stays plain f64, dates render
//! as `YYYY-MM-DD`, the update stamp as `YYYY-MM-DD HH:MM:SS`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::analyzer::{DashboardMetrics, MemberSummary, QuitSummary};
use crate::model::ReportError;

#[derive(Debug, Serialize)]
pub struct DashboardData {
    pub last_updated: String,
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
    pub active_member_list: Vec<MemberEntry>,
    pub new_member_list: Vec<MemberEntry>,
    pub quit_member_list: Vec<QuitEntry>,
}

#[derive(Debug, Serialize)]
pub struct MemberEntry {
    pub name: String,
    pub email: String,
    pub membership_type: String,
    pub days_as_member: i64,
    pub first_payment: String,
    pub last_payment: String,
    pub total_payments: usize,
    pub recurring_status: String,
}

#[derive(Debug, Serialize)]
pub struct QuitEntry {
    pub name: String,
    pub email: String,
    pub membership_type: String,
    pub last_payment: String,
    pub days_since_last: i64,
    pub quit_reason: String,
    pub recurring_status: String,
}

fn member_entry(member: &MemberSummary) -> MemberEntry {
    MemberEntry {
        name: member.name.clone(),
        email: member.email.clone(),
        membership_type: member.membership_type.label().to_string(),
        days_as_member: member.days_as_member,
        first_payment: member.first_payment.format("%Y-%m-%d").to_string(),
        last_payment: member.last_payment.format("%Y-%m-%d").to_string(),
        total_payments: member.total_payments,
        recurring_status: member.recurring_status.label().to_string(),
    }
}

fn quit_entry(member: &QuitSummary) -> QuitEntry {
    QuitEntry {
        name: member.name.clone(),
        email: member.email.clone(),
        membership_type: member.membership_type.label().to_string(),
        last_payment: member.last_payment.format("%Y-%m-%d").to_string(),
        days_since_last: member.days_since_last,
        quit_reason: member.quit_reason.to_string(),
        recurring_status: member.recurring_status.label().to_string(),
    }
}

pub fn render(metrics: &DashboardMetrics) -> DashboardData {
    DashboardData {
        last_updated: metrics.as_of.format("%Y-%m-%d %H:%M:%S").to_string(),
        ongoing_members: metrics.ongoing_members,
        total_active_members: metrics.total_active_members,
        membership_breakdown: metrics.membership_breakdown.clone(),
        monthly_revenue: metrics.monthly_revenue,
        monthly_revenue_month: metrics.monthly_revenue_month.clone(),
        projected_revenue: metrics.projected_revenue,
        projected_revenue_month: metrics.projected_revenue_month.clone(),
        revenue_by_type: metrics.revenue_by_type.clone(),
        members_quit_60_days: metrics.members_quit_60_days,
        avg_payment_by_type: metrics.avg_payment_by_type.clone(),
        monthly_trend: metrics.monthly_trend.clone(),
        total_payments: metrics.total_payments,
        new_members_30_days: metrics.new_members_30_days,
        active_member_list: metrics.active_member_list.iter().map(member_entry).collect(),
        new_member_list: metrics.new_member_list.iter().map(member_entry).collect(),
        quit_member_list: metrics.quit_member_list.iter().map(quit_entry).collect(),
    }
}

pub fn write_json(data: &DashboardData, path: &Path) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(data)?;
    fs::write(path, json)?;
    info!("Dashboard data saved: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{AnalysisWindows, analyze};
    use crate::classifier;
    use crate::model::{PaymentStatus, TransactionRecord};
    use crate::utils;

    fn record(contact: &str, date: &str, detail: &str) -> TransactionRecord {
        TransactionRecord {
            contact_key: contact.to_string(),
            timestamp_raw: date.to_string(),
            timestamp: utils::parse_datetime(date),
            amount: Some(25.0),
            status: PaymentStatus::Succeeded,
            raw_detail: Some(detail.to_string()),
            membership_tier: classifier::classify(Some(detail)),
            recurring_status: None,
            first_name: Some("Kim".to_string()),
            last_name: Some("Lau".to_string()),
        }
    }

    fn sample_data() -> DashboardData {
        let records = vec![record("kim@x.org", "2026-08-01 09:30:00", "Basic Membership")];
        let as_of = utils::parse_datetime("2026-08-15 12:34:56").unwrap();
        render(&analyze(&records, as_of, &AnalysisWindows::default()))
    }

    #[test]
    fn formats_dates_and_update_stamp() {
        let data = sample_data();
        assert_eq!(data.last_updated, "2026-08-15 12:34:56");
        assert_eq!(data.active_member_list[0].first_payment, "2026-08-01");
        assert_eq!(data.active_member_list[0].last_payment, "2026-08-01");
    }

    #[test]
    fn serializes_with_expected_field_names() {
        let json = serde_json::to_value(sample_data()).unwrap();
        for field in [
            "last_updated",
            "ongoing_members",
            "total_active_members",
            "membership_breakdown",
            "monthly_revenue",
            "monthly_revenue_month",
            "projected_revenue",
            "projected_revenue_month",
            "revenue_by_type",
            "members_quit_60_days",
            "avg_payment_by_type",
            "monthly_trend",
            "total_payments",
            "new_members_30_days",
            "active_member_list",
            "new_member_list",
            "quit_member_list",
        ] {
            assert!(json.get(field).is_some(), "missing field {field}");
        }
        assert!(json["monthly_revenue"].is_f64() || json["monthly_revenue"].is_number());
        assert_eq!(json["active_member_list"][0]["membership_type"], "Basic");
        assert_eq!(json["active_member_list"][0]["name"], "Kim Lau");
    }

    #[test]
    fn write_json_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/dashboard_data.json");
        write_json(&sample_data(), &path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["total_active_members"], 1);
    }
}
