use crate::models::request::{AssignmentStatus, RequestStatus};

const PENDING_ALLOWED: [AssignmentStatus; 3] = [
    AssignmentStatus::Available,
    AssignmentStatus::Pending,
    AssignmentStatus::InProgress,
];

const SCHEDULED_ALLOWED: [AssignmentStatus; 2] =
    [AssignmentStatus::Available, AssignmentStatus::Pending];

const COLLECTED_ALLOWED: [AssignmentStatus; 1] = [AssignmentStatus::Completed];

const CANCELLED_ALLOWED: [AssignmentStatus; 1] = [AssignmentStatus::Cancelled];

/// Assignment statuses legal for `status`, in preference order. The first
/// entry is the fallback used to repair an illegal pair.
pub fn allowed_assignment_statuses(status: RequestStatus) -> &'static [AssignmentStatus] {
    match status {
        RequestStatus::Pending => &PENDING_ALLOWED,
        RequestStatus::Scheduled => &SCHEDULED_ALLOWED,
        RequestStatus::Collected => &COLLECTED_ALLOWED,
        RequestStatus::Cancelled => &CANCELLED_ALLOWED,
        RequestStatus::Unrecognized => &AssignmentStatus::ALL,
    }
}

pub fn is_allowed(status: RequestStatus, assignment: AssignmentStatus) -> bool {
    allowed_assignment_statuses(status).contains(&assignment)
}

pub fn fallback_assignment_status(status: RequestStatus) -> AssignmentStatus {
    allowed_assignment_statuses(status)
        .first()
        .copied()
        .unwrap_or_default()
}
