use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::Json;
use axum::Router;
use futures::future::try_join_all;
use serde::Serialize;
use uuid::Uuid;

use crate::engine::availability::current_workload;
use crate::engine::stats::CollectorStats;
use crate::error::AppError;
use crate::models::collector::Collector;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/collectors", get(list_collectors))
        .route("/collectors/stats", get(all_collector_stats))
        .route("/collectors/:id/stats", get(collector_stats))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorSummary {
    #[serde(flatten)]
    pub collector: Collector,
    pub current_assignments: usize,
}

#[derive(Serialize)]
pub struct CollectorBoard {
    pub available: Vec<CollectorSummary>,
    pub busy: Vec<CollectorSummary>,
}

async fn list_collectors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CollectorBoard>, AppError> {
    let snapshot = state.workflow.snapshot().await?;
    let availability = state.workflow.availability(&snapshot);
    let workload = current_workload(&snapshot.requests);

    let summarize = |collectors: Vec<Collector>| -> Vec<CollectorSummary> {
        collectors
            .into_iter()
            .map(|collector| CollectorSummary {
                current_assignments: workload.get(&collector.id).copied().unwrap_or(0),
                collector,
            })
            .collect()
    };

    Ok(Json(CollectorBoard {
        available: summarize(availability.available),
        busy: summarize(availability.busy),
    }))
}

async fn collector_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CollectorStats>, AppError> {
    Ok(Json(state.workflow.collector_stats(id).await?))
}

async fn all_collector_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CollectorStats>>, AppError> {
    let collectors = state.backend.list_collectors().await?;
    let stats = try_join_all(
        collectors
            .iter()
            .map(|collector| state.workflow.collector_stats(collector.id)),
    )
    .await?;
    Ok(Json(stats))
}
