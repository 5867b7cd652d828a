//! Validation of request create/edit forms.
//!
//! Structural checks run first and accumulate every violation. The
//! lifecycle reconciliation only runs once the structure is sound.

use crate::engine::lifecycle::{reconcile, RequestLifecycle};
use crate::error::AppError;
use crate::models::request::{
    AssignmentStatus, LifecycleFields, Notice, PickupRequest, RequestDraft, RequestPatch,
    RequestStatus,
};

#[derive(Debug, Clone, Copy)]
pub enum DraftTarget<'a> {
    New,
    /// Fields missing from the draft keep the value of the current request.
    Existing(&'a PickupRequest),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDraft {
    pub patch: RequestPatch,
    pub notices: Vec<Notice>,
}

pub fn validate_draft(
    draft: &RequestDraft,
    target: DraftTarget<'_>,
) -> Result<ValidatedDraft, AppError> {
    let current = match target {
        DraftTarget::New => None,
        DraftTarget::Existing(request) => Some(request),
    };

    let material = non_blank(draft.material.clone())
        .or_else(|| current.and_then(|r| non_blank(Some(r.material.clone()))));
    let address = non_blank(draft.address.clone())
        .or_else(|| current.and_then(|r| non_blank(r.address.clone())));
    let latitude = draft.latitude.or(current.and_then(|r| r.latitude));
    let longitude = draft.longitude.or(current.and_then(|r| r.longitude));
    let user_id = draft.user_id.or(current.and_then(|r| r.user_id));

    let mut violations = Vec::new();

    if material.is_none() {
        violations.push("material must be selected".to_string());
    }

    if matches!(target, DraftTarget::New) && user_id.is_none() {
        violations.push("a target user must be selected".to_string());
    }

    match (&address, latitude, longitude) {
        (Some(_), Some(lat), Some(lng)) => {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
                violations.push(format!("location {lat},{lng} is outside valid coordinates"));
            }
        }
        _ => violations.push("an address with latitude and longitude must be selected".to_string()),
    }

    if let Some(weight) = draft.weight {
        if !weight.is_finite() || weight < 0.0 {
            violations.push("weight must be a non-negative number of kilograms".to_string());
        }
    }

    if draft.status == Some(RequestStatus::Unrecognized) {
        violations.push("status must be one of PENDING, SCHEDULED, COLLECTED, CANCELLED".to_string());
    }

    let (Some(material), Some(address), Some(latitude), Some(longitude)) =
        (material, address, latitude, longitude)
    else {
        return Err(AppError::Validation(violations));
    };
    if !violations.is_empty() {
        return Err(AppError::Validation(violations));
    }

    let requested = match current {
        // New requests always start unassigned.
        None => LifecycleFields {
            status: RequestStatus::Pending,
            assignment_status: AssignmentStatus::Available,
            assigned_collector_id: None,
            weight: draft.weight,
        },
        Some(request) => LifecycleFields {
            status: draft.status.unwrap_or(request.status),
            assignment_status: draft.assignment_status.unwrap_or(request.assignment_status),
            assigned_collector_id: draft.assigned_collector_id.or(request.assigned_collector_id),
            weight: draft.weight.or(request.weight),
        },
    };

    let repaired = reconcile(requested);
    let lifecycle = RequestLifecycle::try_from(repaired.fields)
        .map_err(|err| AppError::Validation(vec![err.to_string()]))?;
    let fields = lifecycle.fields();

    if fields.status == RequestStatus::Collected && fields.weight.is_none() {
        return Err(AppError::Validation(vec![
            "weight is required once a request is COLLECTED".to_string(),
        ]));
    }

    Ok(ValidatedDraft {
        patch: RequestPatch {
            user_id,
            material,
            description: draft
                .description
                .clone()
                .or_else(|| current.and_then(|r| r.description.clone())),
            address,
            district: draft
                .district
                .clone()
                .or_else(|| current.and_then(|r| r.district.clone())),
            latitude,
            longitude,
            status: fields.status,
            assignment_status: fields.assignment_status,
            assigned_collector_id: fields.assigned_collector_id,
            weight: fields.weight,
        },
        notices: repaired.notices,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
