use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Json;
use axum::Router;
use chrono::Utc;

use crate::engine::stats::{summarize, DashboardSummary};
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/dashboard", get(dashboard))
}

async fn dashboard(State(state): State<Arc<AppState>>) -> Result<Json<DashboardSummary>, AppError> {
    let requests = state.backend.list_requests().await?;
    Ok(Json(summarize(&requests, Utc::now().date_naive())))
}
