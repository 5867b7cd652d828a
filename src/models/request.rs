use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Scheduled,
    Collected,
    Cancelled,
    /// Any value the backend sends that the console does not know.
    #[serde(other)]
    Unrecognized,
}

impl RequestStatus {
    pub const KNOWN: [RequestStatus; 4] = [
        RequestStatus::Pending,
        RequestStatus::Scheduled,
        RequestStatus::Collected,
        RequestStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Scheduled => "SCHEDULED",
            RequestStatus::Collected => "COLLECTED",
            RequestStatus::Cancelled => "CANCELLED",
            RequestStatus::Unrecognized => "UNRECOGNIZED",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    #[default]
    Available,
    Pending,
    InProgress,
    Completed,
    Cancelled,
    Expired,
}

impl AssignmentStatus {
    pub const ALL: [AssignmentStatus; 6] = [
        AssignmentStatus::Available,
        AssignmentStatus::Pending,
        AssignmentStatus::InProgress,
        AssignmentStatus::Completed,
        AssignmentStatus::Cancelled,
        AssignmentStatus::Expired,
    ];

    /// Held by a collector and not yet finished. These are the values that
    /// make a collector busy.
    pub fn is_open(&self) -> bool {
        matches!(self, AssignmentStatus::Pending | AssignmentStatus::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Available => "AVAILABLE",
            AssignmentStatus::Pending => "PENDING",
            AssignmentStatus::InProgress => "IN_PROGRESS",
            AssignmentStatus::Completed => "COMPLETED",
            AssignmentStatus::Cancelled => "CANCELLED",
            AssignmentStatus::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The coupled lifecycle columns of a request, as stored on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleFields {
    pub status: RequestStatus,
    pub assignment_status: AssignmentStatus,
    pub assigned_collector_id: Option<Uuid>,
    pub weight: Option<f64>,
}

/// A citizen's pickup request as the backend reports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PickupRequest {
    pub id: Uuid,
    pub code: String,
    pub status: RequestStatus,
    #[serde(default)]
    pub assignment_status: AssignmentStatus,
    #[serde(default)]
    pub assigned_collector_id: Option<Uuid>,
    #[serde(default)]
    pub weight: Option<f64>,
    pub material: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub user_lastname: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PickupRequest {
    pub fn lifecycle_fields(&self) -> LifecycleFields {
        LifecycleFields {
            status: self.status,
            assignment_status: self.assignment_status,
            assigned_collector_id: self.assigned_collector_id,
            weight: self.weight,
        }
    }

    pub fn apply_lifecycle_fields(&mut self, fields: LifecycleFields) {
        self.status = fields.status;
        self.assignment_status = fields.assignment_status;
        self.assigned_collector_id = fields.assigned_collector_id;
        self.weight = fields.weight;
    }

    /// Holds an open assignment for `collector_id`.
    pub fn is_open_for(&self, collector_id: Uuid) -> bool {
        self.assignment_status.is_open() && self.assigned_collector_id == Some(collector_id)
    }
}

/// Form input for creating or editing a request, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestDraft {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub status: Option<RequestStatus>,
    #[serde(default)]
    pub assignment_status: Option<AssignmentStatus>,
    #[serde(default)]
    pub assigned_collector_id: Option<Uuid>,
    #[serde(default)]
    pub weight: Option<f64>,
}

/// Replacement for the editable fields of a request. Sent to the backend
/// only after draft validation and lifecycle reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestPatch {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub material: String,
    pub description: Option<String>,
    pub address: String,
    pub district: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub status: RequestStatus,
    pub assignment_status: AssignmentStatus,
    pub assigned_collector_id: Option<Uuid>,
    pub weight: Option<f64>,
}

impl RequestPatch {
    pub fn lifecycle_fields(&self) -> LifecycleFields {
        LifecycleFields {
            status: self.status,
            assignment_status: self.assignment_status,
            assigned_collector_id: self.assigned_collector_id,
            weight: self.weight,
        }
    }
}

/// Informational outcome attached to a successful operation. Never an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notice {
    #[serde(rename_all = "camelCase")]
    AutoCorrected {
        status: RequestStatus,
        from: AssignmentStatus,
        to: AssignmentStatus,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    WeightCleared { status: RequestStatus },
    #[serde(rename_all = "camelCase")]
    WeightRequired { request_id: Uuid },
}
