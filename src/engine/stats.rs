use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::models::request::{AssignmentStatus, PickupRequest, RequestStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorStats {
    pub collector_id: Uuid,
    pub total_assignments: usize,
    pub completed_assignments: usize,
    pub total_weight: f64,
    /// Completed share of all assignments, as a whole percentage.
    pub performance: u8,
    pub current_assignments: usize,
    pub pending_assignments: usize,
    pub in_progress_assignments: usize,
    pub impact: EnvironmentalImpact,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalImpact {
    pub trees_saved: u64,
    pub co2_reduction_kg: u64,
    pub energy_saved_kwh: u64,
    pub water_saved_liters: u64,
}

impl EnvironmentalImpact {
    pub fn from_weight(kilograms: f64) -> Self {
        let kilograms = kilograms.max(0.0);
        Self {
            trees_saved: (kilograms / 5.0).round() as u64,
            co2_reduction_kg: (kilograms * 2.5).round() as u64,
            energy_saved_kwh: (kilograms * 10.0).round() as u64,
            water_saved_liters: (kilograms * 100.0).round() as u64,
        }
    }
}

/// Folds a collector's assignment history into its stats. Entries linked
/// to a different collector are skipped; entries without a link count.
pub fn aggregate(collector_id: Uuid, history: &[PickupRequest]) -> CollectorStats {
    let entries: Vec<&PickupRequest> = history
        .iter()
        .filter(|entry| entry.assigned_collector_id.is_none_or(|id| id == collector_id))
        .collect();

    let total_assignments = entries.len();
    let completed_assignments = entries
        .iter()
        .filter(|entry| {
            entry.assignment_status == AssignmentStatus::Completed
                || entry.status == RequestStatus::Collected
        })
        .count();
    let pending_assignments = count_assignment(&entries, AssignmentStatus::Pending);
    let in_progress_assignments = count_assignment(&entries, AssignmentStatus::InProgress);

    let total_weight = order_independent_sum(entries.iter().filter_map(|entry| entry.weight));

    CollectorStats {
        collector_id,
        total_assignments,
        completed_assignments,
        total_weight,
        performance: performance(completed_assignments, total_assignments),
        current_assignments: pending_assignments + in_progress_assignments,
        pending_assignments,
        in_progress_assignments,
        impact: EnvironmentalImpact::from_weight(total_weight),
    }
}

pub fn performance(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }

    let ratio = (completed.min(total) as f64 / total as f64) * 100.0;
    ratio.round().clamp(0.0, 100.0) as u8
}

/// Console-wide counters over every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_requests: usize,
    pub today_requests: usize,
    pub pending_requests: usize,
    pub collected_requests: usize,
    pub total_weight: f64,
    /// Collected share of all requests, in percent with one decimal.
    pub efficiency: f64,
    pub impact: EnvironmentalImpact,
}

/// `today` is a UTC calendar date, matched against `createdAt`.
pub fn summarize(requests: &[PickupRequest], today: NaiveDate) -> DashboardSummary {
    let total_requests = requests.len();
    let today_requests = requests
        .iter()
        .filter(|request| request.created_at.date_naive() == today)
        .count();
    let pending_requests = requests
        .iter()
        .filter(|request| request.status == RequestStatus::Pending)
        .count();
    let collected_requests = requests
        .iter()
        .filter(|request| request.status == RequestStatus::Collected)
        .count();
    let total_weight = order_independent_sum(requests.iter().filter_map(|request| request.weight));

    let efficiency = if total_requests == 0 {
        0.0
    } else {
        let percent = collected_requests as f64 / total_requests as f64 * 100.0;
        (percent * 10.0).round() / 10.0
    };

    DashboardSummary {
        total_requests,
        today_requests,
        pending_requests,
        collected_requests,
        total_weight,
        efficiency,
        impact: EnvironmentalImpact::from_weight(total_weight),
    }
}

fn order_independent_sum(weights: impl Iterator<Item = f64>) -> f64 {
    let mut weights: Vec<f64> = weights.collect();
    // float addition is not associative; sort first
    weights.sort_by(f64::total_cmp);
    weights.iter().sum()
}

fn count_assignment(entries: &[&PickupRequest], status: AssignmentStatus) -> usize {
    entries
        .iter()
        .filter(|entry| entry.assignment_status == status)
        .count()
}
