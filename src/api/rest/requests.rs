use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::filter::{filter_requests, RequestFilter};
use crate::engine::workflow::WorkflowOutcome;
use crate::error::AppError;
use crate::models::request::{PickupRequest, RequestDraft};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/requests", get(list_requests).post(create_request))
        .route(
            "/requests/:id",
            get(get_request).put(update_request).delete(delete_request),
        )
        .route("/requests/:id/claim", post(claim_request))
        .route("/requests/:id/release", post(release_request))
        .route("/requests/:id/complete", post(complete_request))
        .route("/requests/:id/collection", post(record_collection))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub collector_id: Uuid,
}

#[derive(Deserialize)]
pub struct CollectionRequest {
    pub weight: f64,
}

async fn list_requests(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<RequestFilter>,
) -> Result<Json<Vec<PickupRequest>>, AppError> {
    let requests = state.backend.list_requests().await?;
    Ok(Json(filter_requests(requests, &filter)))
}

async fn create_request(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<RequestDraft>,
) -> Result<(StatusCode, Json<WorkflowOutcome>), AppError> {
    let outcome = state.workflow.create(&draft).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn get_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PickupRequest>, AppError> {
    Ok(Json(state.backend.get_request(id).await?))
}

async fn update_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(draft): Json<RequestDraft>,
) -> Result<Json<WorkflowOutcome>, AppError> {
    let snapshot = state.workflow.snapshot().await?;
    Ok(Json(state.workflow.update(&snapshot, id, &draft).await?))
}

async fn delete_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.workflow.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn claim_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ClaimRequest>,
) -> Result<Json<WorkflowOutcome>, AppError> {
    let snapshot = state.workflow.snapshot().await?;
    let outcome = state
        .workflow
        .claim(&snapshot, id, payload.collector_id)
        .await?;
    Ok(Json(outcome))
}

async fn release_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkflowOutcome>, AppError> {
    let snapshot = state.workflow.snapshot().await?;
    Ok(Json(state.workflow.release(&snapshot, id).await?))
}

async fn complete_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkflowOutcome>, AppError> {
    let snapshot = state.workflow.snapshot().await?;
    Ok(Json(state.workflow.complete(&snapshot, id).await?))
}

async fn record_collection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CollectionRequest>,
) -> Result<Json<WorkflowOutcome>, AppError> {
    let snapshot = state.workflow.snapshot().await?;
    let outcome = state
        .workflow
        .record_collection(&snapshot, id, payload.weight)
        .await?;
    Ok(Json(outcome))
}
