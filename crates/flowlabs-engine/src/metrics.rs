//! Aggregate metrics over lead, client and log snapshots.
//!
//! Everything here is a pure function of its inputs. Empty collections yield
//! zeroed metrics, and deal values that are not finite positive numbers count
//! as zero.

use chrono::{DateTime, Duration, Utc};
use flowlabs_core::LeadId;
use flowlabs_store::{sanitize_deal_value, AutomationLog, Client, Lead, LeadStatus, LogStatus};
use serde::Serialize;

/// Number of buckets in the weekly series.
pub const WEEKS: i64 = 4;

/// Title of every activity feed entry.
pub const NEW_LEAD_ACTIVITY: &str = "New Lead Added";

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardStats {
    /// Sum of deal values across all leads, whatever their status.
    pub pipeline_value: f64,
    /// Number of leads on file.
    pub active_leads: usize,
    /// Number of clients.
    pub total_clients: usize,
    /// Number of automation log entries.
    pub total_automations: usize,
    /// Percentage of logs that succeeded, 0 when there are none.
    pub success_rate: u32,
}

/// One bucket of the weekly chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyPoint {
    /// Bucket label, `Week 1` through `Week 4`.
    pub name: String,
    /// Closed leads created up to the end of the week.
    pub closed: usize,
    /// Leads created up to the end of the week.
    pub total: usize,
}

/// Numbers for the performance report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportingMetrics {
    /// Sum of deal values over closed leads.
    pub closed_revenue: f64,
    /// Percentage of leads that are closed.
    pub conversion_rate: u32,
    /// Number of closed leads.
    pub closed_leads: usize,
    /// Number of leads.
    pub total_leads: usize,
    /// Cumulative weekly series for charting.
    pub weekly: Vec<WeeklyPoint>,
}

/// An entry of the recent activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityItem {
    /// The lead the entry is about.
    pub lead_id: LeadId,
    /// Entry title.
    pub title: String,
    /// Entry body.
    pub description: String,
    /// When the lead was added.
    pub created_at: DateTime<Utc>,
}

/// A column of the prospecting board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardColumn {
    /// Stable column key.
    pub id: &'static str,
    /// Column heading.
    pub title: &'static str,
    /// Statuses shown in the column.
    pub statuses: &'static [LeadStatus],
    /// Leads in the column, in input order.
    pub leads: Vec<Lead>,
}

/// Column layout of the prospecting board. Closed leads are not shown.
const BOARD: [(&str, &str, &[LeadStatus]); 4] = [
    ("new", "New Leads", &[LeadStatus::New, LeadStatus::Enriched]),
    ("contacted", "Contacted", &[LeadStatus::Contacted]),
    ("negotiation", "Negotiation", &[LeadStatus::Replied]),
    ("closed", "Closed", &[LeadStatus::Booked]),
];

/// `round(part / whole * 100)` with halves rounded up; 0 when `whole` is 0.
fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    let rounded = (part * 200 + whole) / (whole * 2);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

fn total_value<'a>(leads: impl Iterator<Item = &'a Lead>) -> f64 {
    leads.map(|l| sanitize_deal_value(l.value)).sum()
}

/// Compute the dashboard headline numbers.
#[must_use]
pub fn compute_dashboard_stats(
    leads: &[Lead],
    clients: &[Client],
    logs: &[AutomationLog],
) -> DashboardStats {
    let succeeded = logs
        .iter()
        .filter(|l| l.status == LogStatus::Success)
        .count();

    DashboardStats {
        pipeline_value: total_value(leads.iter()),
        active_leads: leads.len(),
        total_clients: clients.len(),
        total_automations: logs.len(),
        success_rate: percentage(succeeded, logs.len()),
    }
}

/// Compute the performance report for the four weeks ending at `now`.
#[must_use]
pub fn compute_reporting_metrics(leads: &[Lead], now: DateTime<Utc>) -> ReportingMetrics {
    let closed: Vec<&Lead> = leads
        .iter()
        .filter(|l| l.status == LeadStatus::Closed)
        .collect();

    ReportingMetrics {
        closed_revenue: total_value(closed.iter().copied()),
        conversion_rate: percentage(closed.len(), leads.len()),
        closed_leads: closed.len(),
        total_leads: leads.len(),
        weekly: weekly_series(leads, now),
    }
}

/// Cumulative counts at the end of each of the last four weeks.
///
/// Week 4 ends at `now`, each earlier week seven days before the next. Leads
/// created after `now` are not counted.
fn weekly_series(leads: &[Lead], now: DateTime<Utc>) -> Vec<WeeklyPoint> {
    (1..=WEEKS)
        .map(|week| {
            let end = now - Duration::weeks(WEEKS - week);
            let (closed, total) = leads
                .iter()
                .filter(|l| l.created_at <= end)
                .fold((0, 0), |(closed, total), l| {
                    (closed + usize::from(l.status == LeadStatus::Closed), total + 1)
                });
            WeeklyPoint {
                name: format!("Week {week}"),
                closed,
                total,
            }
        })
        .collect()
}

/// The `limit` most recently added leads as activity entries, newest first.
#[must_use]
pub fn recent_activity(leads: &[Lead], limit: usize) -> Vec<ActivityItem> {
    let mut newest: Vec<&Lead> = leads.iter().collect();
    newest.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    newest
        .into_iter()
        .take(limit)
        .map(|lead| ActivityItem {
            lead_id: lead.id,
            title: NEW_LEAD_ACTIVITY.to_string(),
            description: match lead.company.as_deref() {
                Some(company) => format!("{} from {company}", lead.name),
                None => lead.name.clone(),
            },
            created_at: lead.created_at,
        })
        .collect()
}

/// Group leads into the prospecting board's columns.
#[must_use]
pub fn board_columns(leads: &[Lead]) -> Vec<BoardColumn> {
    BOARD
        .iter()
        .map(|&(id, title, statuses)| BoardColumn {
            id,
            title,
            statuses,
            leads: leads
                .iter()
                .filter(|l| statuses.contains(&l.status))
                .cloned()
                .collect(),
        })
        .collect()
}

/// Plain-text description of the metrics, used as analysis input.
#[must_use]
pub fn metrics_summary(stats: &DashboardStats, reporting: &ReportingMetrics) -> String {
    format!(
        "Pipeline value: ${:.2} across {} leads\n\
Closed revenue: ${:.2} from {} closed leads\n\
Conversion rate: {}%\n\
Active clients: {}\n\
Automation runs: {} with a {}% success rate",
        stats.pipeline_value,
        stats.active_leads,
        reporting.closed_revenue,
        reporting.closed_leads,
        reporting.conversion_rate,
        stats.total_clients,
        stats.total_automations,
        stats.success_rate,
    )
}
