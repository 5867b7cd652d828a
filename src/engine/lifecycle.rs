//! Request lifecycle validation.
//!
//! `validate` and `reconcile` work on the raw wire columns and implement the
//! "auto-correct and warn" policy used by administrative edits.
//! `RequestLifecycle` is the structural view: a value of that type can only
//! hold a legal status/assignment combination, and the claim, release and
//! complete transitions are defined on it.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::engine::transitions::{allowed_assignment_statuses, fallback_assignment_status, is_allowed};
use crate::models::request::{AssignmentStatus, LifecycleFields, Notice, RequestStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleValidation {
    pub valid: bool,
    pub message: Option<String>,
    /// Set only when `valid` is false.
    pub fallback: Option<AssignmentStatus>,
}

pub fn validate(status: RequestStatus, assignment: AssignmentStatus) -> LifecycleValidation {
    if is_allowed(status, assignment) {
        return LifecycleValidation {
            valid: true,
            message: None,
            fallback: None,
        };
    }

    let allowed = allowed_assignment_statuses(status)
        .iter()
        .map(AssignmentStatus::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    LifecycleValidation {
        valid: false,
        message: Some(format!(
            "assignment status {assignment} is not allowed while the request is {status}; allowed: {allowed}"
        )),
        fallback: Some(fallback_assignment_status(status)),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub fields: LifecycleFields,
    pub notices: Vec<Notice>,
}

/// Repairs the lifecycle columns after an edit. Weight is dropped outside
/// COLLECTED, an illegal assignment status is replaced by the fallback for
/// the status, and an AVAILABLE assignment loses its collector.
pub fn reconcile(fields: LifecycleFields) -> Reconciled {
    let mut fields = fields;
    let mut notices = Vec::new();

    if fields.status != RequestStatus::Collected && fields.weight.is_some() {
        fields.weight = None;
        notices.push(Notice::WeightCleared {
            status: fields.status,
        });
    }

    let check = validate(fields.status, fields.assignment_status);
    if let (false, Some(fallback)) = (check.valid, check.fallback) {
        notices.push(Notice::AutoCorrected {
            status: fields.status,
            from: fields.assignment_status,
            to: fallback,
            message: check.message.unwrap_or_default(),
        });
        fields.assignment_status = fallback;
    }

    if fields.assignment_status == AssignmentStatus::Available {
        fields.assigned_collector_id = None;
    }

    Reconciled { fields, notices }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LifecycleError {
    #[error("assignment status {assignment} is not allowed while the request is {status}")]
    IllegalCombination {
        status: RequestStatus,
        assignment: AssignmentStatus,
    },

    #[error("assignment status {assignment} requires an assigned collector")]
    MissingCollector { assignment: AssignmentStatus },

    #[error("an AVAILABLE request cannot have an assigned collector")]
    UnexpectedCollector,

    #[error("weight can only be recorded on a COLLECTED request, not {status}")]
    WeightNotAllowed { status: RequestStatus },

    #[error("weight must be a non-negative number of kilograms, got {0}")]
    InvalidWeight(f64),

    #[error("cannot {action} a request whose assignment is {assignment} (status {status})")]
    NotAllowed {
        action: &'static str,
        status: RequestStatus,
        assignment: AssignmentStatus,
    },
}

/// Hand-off state while the request itself is PENDING.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handoff {
    Available,
    Pending(Uuid),
    InProgress(Uuid),
}

/// Hand-off state while the request is SCHEDULED. Work cannot be in
/// progress on a scheduled request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledHandoff {
    Available,
    Pending(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RequestLifecycle {
    Pending(Handoff),
    Scheduled(ScheduledHandoff),
    Collected {
        collector_id: Option<Uuid>,
        weight: Option<f64>,
    },
    Cancelled {
        collector_id: Option<Uuid>,
    },
    Unrecognized {
        assignment: AssignmentStatus,
        collector_id: Option<Uuid>,
    },
}

impl TryFrom<LifecycleFields> for RequestLifecycle {
    type Error = LifecycleError;

    fn try_from(fields: LifecycleFields) -> Result<Self, Self::Error> {
        let LifecycleFields {
            status,
            assignment_status: assignment,
            assigned_collector_id: collector,
            weight,
        } = fields;

        if let Some(weight) = weight {
            check_weight(weight)?;
            if status != RequestStatus::Collected {
                return Err(LifecycleError::WeightNotAllowed { status });
            }
        }

        if !is_allowed(status, assignment) {
            return Err(LifecycleError::IllegalCombination { status, assignment });
        }

        match (assignment, collector) {
            (AssignmentStatus::Available, Some(_)) => {
                return Err(LifecycleError::UnexpectedCollector);
            }
            (open, None) if open.is_open() => {
                return Err(LifecycleError::MissingCollector { assignment: open });
            }
            _ => {}
        }

        let lifecycle = match (status, assignment, collector) {
            (RequestStatus::Pending, AssignmentStatus::Available, _) => {
                RequestLifecycle::Pending(Handoff::Available)
            }
            (RequestStatus::Pending, AssignmentStatus::Pending, Some(id)) => {
                RequestLifecycle::Pending(Handoff::Pending(id))
            }
            (RequestStatus::Pending, AssignmentStatus::InProgress, Some(id)) => {
                RequestLifecycle::Pending(Handoff::InProgress(id))
            }
            (RequestStatus::Scheduled, AssignmentStatus::Available, _) => {
                RequestLifecycle::Scheduled(ScheduledHandoff::Available)
            }
            (RequestStatus::Scheduled, AssignmentStatus::Pending, Some(id)) => {
                RequestLifecycle::Scheduled(ScheduledHandoff::Pending(id))
            }
            (RequestStatus::Collected, _, collector_id) => RequestLifecycle::Collected {
                collector_id,
                weight,
            },
            (RequestStatus::Cancelled, _, collector_id) => {
                RequestLifecycle::Cancelled { collector_id }
            }
            (RequestStatus::Unrecognized, assignment, collector_id) => {
                RequestLifecycle::Unrecognized {
                    assignment,
                    collector_id,
                }
            }
            (status, assignment, _) => {
                return Err(LifecycleError::IllegalCombination { status, assignment });
            }
        };

        Ok(lifecycle)
    }
}

impl RequestLifecycle {
    pub fn fields(&self) -> LifecycleFields {
        let (status, assignment_status, assigned_collector_id, weight) = match *self {
            RequestLifecycle::Pending(handoff) => match handoff {
                Handoff::Available => (RequestStatus::Pending, AssignmentStatus::Available, None, None),
                Handoff::Pending(id) => (RequestStatus::Pending, AssignmentStatus::Pending, Some(id), None),
                Handoff::InProgress(id) => {
                    (RequestStatus::Pending, AssignmentStatus::InProgress, Some(id), None)
                }
            },
            RequestLifecycle::Scheduled(handoff) => match handoff {
                ScheduledHandoff::Available => {
                    (RequestStatus::Scheduled, AssignmentStatus::Available, None, None)
                }
                ScheduledHandoff::Pending(id) => {
                    (RequestStatus::Scheduled, AssignmentStatus::Pending, Some(id), None)
                }
            },
            RequestLifecycle::Collected {
                collector_id,
                weight,
            } => (
                RequestStatus::Collected,
                AssignmentStatus::Completed,
                collector_id,
                weight,
            ),
            RequestLifecycle::Cancelled { collector_id } => (
                RequestStatus::Cancelled,
                AssignmentStatus::Cancelled,
                collector_id,
                None,
            ),
            RequestLifecycle::Unrecognized {
                assignment,
                collector_id,
            } => (RequestStatus::Unrecognized, assignment, collector_id, None),
        };

        LifecycleFields {
            status,
            assignment_status,
            assigned_collector_id,
            weight,
        }
    }

    pub fn status(&self) -> RequestStatus {
        self.fields().status
    }

    pub fn assignment_status(&self) -> AssignmentStatus {
        self.fields().assignment_status
    }

    pub fn collector_id(&self) -> Option<Uuid> {
        self.fields().assigned_collector_id
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestLifecycle::Cancelled { .. } | RequestLifecycle::Collected { .. }
        )
    }

    pub fn claim(self, collector_id: Uuid) -> Result<Self, LifecycleError> {
        match self {
            RequestLifecycle::Pending(Handoff::Available) => {
                Ok(RequestLifecycle::Pending(Handoff::Pending(collector_id)))
            }
            RequestLifecycle::Scheduled(ScheduledHandoff::Available) => Ok(
                RequestLifecycle::Scheduled(ScheduledHandoff::Pending(collector_id)),
            ),
            RequestLifecycle::Unrecognized {
                assignment: AssignmentStatus::Available,
                ..
            } => Ok(RequestLifecycle::Unrecognized {
                assignment: AssignmentStatus::Pending,
                collector_id: Some(collector_id),
            }),
            other => Err(other.refuse(Intent::Claim)),
        }
    }

    pub fn release(self) -> Result<Self, LifecycleError> {
        match self {
            RequestLifecycle::Pending(Handoff::Pending(_) | Handoff::InProgress(_)) => {
                Ok(RequestLifecycle::Pending(Handoff::Available))
            }
            RequestLifecycle::Scheduled(ScheduledHandoff::Pending(_)) => {
                Ok(RequestLifecycle::Scheduled(ScheduledHandoff::Available))
            }
            RequestLifecycle::Unrecognized { assignment, .. } if assignment.is_open() => {
                Ok(RequestLifecycle::Unrecognized {
                    assignment: AssignmentStatus::Available,
                    collector_id: None,
                })
            }
            other => Err(other.refuse(Intent::Release)),
        }
    }

    /// Finishing the hand-off moves the request to COLLECTED; the weight is
    /// recorded afterwards. An unrecognized status is left as it is.
    pub fn complete(self) -> Result<Self, LifecycleError> {
        match self {
            RequestLifecycle::Pending(Handoff::Pending(id) | Handoff::InProgress(id))
            | RequestLifecycle::Scheduled(ScheduledHandoff::Pending(id)) => {
                Ok(RequestLifecycle::Collected {
                    collector_id: Some(id),
                    weight: None,
                })
            }
            RequestLifecycle::Unrecognized {
                assignment,
                collector_id,
            } if assignment.is_open() => Ok(RequestLifecycle::Unrecognized {
                assignment: AssignmentStatus::Completed,
                collector_id,
            }),
            other => Err(other.refuse(Intent::Complete)),
        }
    }

    pub fn record_weight(self, weight: f64) -> Result<Self, LifecycleError> {
        check_weight(weight)?;
        match self {
            RequestLifecycle::Collected { collector_id, .. } => Ok(RequestLifecycle::Collected {
                collector_id,
                weight: Some(weight),
            }),
            other => Err(LifecycleError::WeightNotAllowed {
                status: other.status(),
            }),
        }
    }

    fn refuse(&self, intent: Intent) -> LifecycleError {
        LifecycleError::NotAllowed {
            action: intent.as_str(),
            status: self.status(),
            assignment: self.assignment_status(),
        }
    }
}

/// The three hand-off intents an administrator can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Claim,
    Release,
    Complete,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Claim => "claim",
            Intent::Release => "release",
            Intent::Complete => "complete",
        }
    }

    pub fn accepts(self, assignment: AssignmentStatus) -> bool {
        match self {
            Intent::Claim => assignment == AssignmentStatus::Available,
            Intent::Release | Intent::Complete => assignment.is_open(),
        }
    }
}

/// Precondition of an intent against a request's stored columns. Only the
/// assignment status is consulted; the collector link and the rest of the
/// row are the backend's to arbitrate.
pub fn check_intent(intent: Intent, fields: &LifecycleFields) -> Result<(), LifecycleError> {
    if intent.accepts(fields.assignment_status) {
        Ok(())
    } else {
        Err(LifecycleError::NotAllowed {
            action: intent.as_str(),
            status: fields.status,
            assignment: fields.assignment_status,
        })
    }
}

pub fn check_weight(weight: f64) -> Result<(), LifecycleError> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(LifecycleError::InvalidWeight(weight))
    }
}
