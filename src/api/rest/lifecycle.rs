use std::sync::Arc;

use axum::extract::Path;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::engine::lifecycle::{validate, LifecycleValidation};
use crate::engine::transitions::{allowed_assignment_statuses, fallback_assignment_status};
use crate::models::request::{AssignmentStatus, RequestStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/lifecycle/validate", post(validate_pair))
        .route("/lifecycle/:status", get(allowed_for_status))
}

#[derive(Serialize)]
pub struct AllowedAssignments {
    pub status: RequestStatus,
    pub allowed: Vec<AssignmentStatus>,
    pub fallback: AssignmentStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePairRequest {
    pub status: RequestStatus,
    pub assignment_status: AssignmentStatus,
}

async fn allowed_for_status(Path(status): Path<RequestStatus>) -> Json<AllowedAssignments> {
    Json(AllowedAssignments {
        status,
        allowed: allowed_assignment_statuses(status).to_vec(),
        fallback: fallback_assignment_status(status),
    })
}

async fn validate_pair(Json(payload): Json<ValidatePairRequest>) -> Json<LifecycleValidation> {
    Json(validate(payload.status, payload.assignment_status))
}
