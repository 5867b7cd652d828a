//! Claim, release and complete, plus the administrative edit path.
//!
//! Every action checks its preconditions against a snapshot the caller
//! loaded earlier, then issues exactly one backend call. The snapshot is
//! never mutated: callers get the backend-confirmed request back and are
//! expected to reload. A conflict from the backend means the snapshot is
//! stale; it is reported, not retried.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::CollectionBackend;
use crate::engine::availability::{resolve_availability, Availability};
use crate::engine::draft::{validate_draft, DraftTarget, ValidatedDraft};
use crate::engine::lifecycle::{check_intent, check_weight, Intent, LifecycleError};
use crate::engine::stats::{aggregate, CollectorStats};
use crate::error::AppError;
use crate::models::collector::Collector;
use crate::models::request::{Notice, PickupRequest, RequestDraft, RequestStatus};
use crate::observability::metrics::Metrics;

/// Requests and collectors as last read from the backend.
#[derive(Debug, Clone, Default)]
pub struct ConsoleSnapshot {
    pub requests: Vec<PickupRequest>,
    pub collectors: Vec<Collector>,
}

impl ConsoleSnapshot {
    pub async fn load(backend: &dyn CollectionBackend) -> Result<Self, AppError> {
        let (requests, collectors) =
            tokio::try_join!(backend.list_requests(), backend.list_collectors())?;
        Ok(Self {
            requests,
            collectors,
        })
    }

    pub fn request(&self, request_id: Uuid) -> Result<&PickupRequest, AppError> {
        self.requests
            .iter()
            .find(|request| request.id == request_id)
            .ok_or_else(|| AppError::NotFound(format!("request {request_id} not found")))
    }

    pub fn collector(&self, collector_id: Uuid) -> Result<&Collector, AppError> {
        self.collectors
            .iter()
            .find(|collector| collector.id == collector_id)
            .ok_or_else(|| AppError::NotFound(format!("collector {collector_id} not found")))
    }

    pub fn availability(&self) -> Availability {
        resolve_availability(&self.requests, &self.collectors)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowOutcome {
    pub request: PickupRequest,
    pub notices: Vec<Notice>,
}

impl WorkflowOutcome {
    fn confirmed(request: PickupRequest) -> Self {
        Self {
            request,
            notices: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct AssignmentWorkflow {
    backend: Arc<dyn CollectionBackend>,
    metrics: Metrics,
}

impl AssignmentWorkflow {
    pub fn new(backend: Arc<dyn CollectionBackend>, metrics: Metrics) -> Self {
        Self { backend, metrics }
    }

    pub fn backend(&self) -> &dyn CollectionBackend {
        self.backend.as_ref()
    }

    pub async fn snapshot(&self) -> Result<ConsoleSnapshot, AppError> {
        ConsoleSnapshot::load(self.backend.as_ref()).await
    }

    pub fn availability(&self, snapshot: &ConsoleSnapshot) -> Availability {
        let availability = snapshot.availability();
        self.metrics
            .busy_collectors
            .set(availability.busy.len() as i64);
        availability
    }

    pub async fn claim(
        &self,
        snapshot: &ConsoleSnapshot,
        request_id: Uuid,
        collector_id: Uuid,
    ) -> Result<WorkflowOutcome, AppError> {
        let start = Instant::now();
        let result = async {
            let request = snapshot.request(request_id)?;
            let collector = snapshot.collector(collector_id)?;

            check_intent(Intent::Claim, &request.lifecycle_fields()).map_err(stale)?;
            if !snapshot.availability().is_available(collector_id) {
                return Err(AppError::Validation(vec![format!(
                    "collector {} already holds an open assignment",
                    collector.display_name()
                )]));
            }

            let confirmed = self.backend.claim_request(request_id, collector_id).await?;
            info!(
                request_id = %request_id,
                collector_id = %collector_id,
                code = %confirmed.code,
                "request claimed"
            );
            Ok::<_, AppError>(WorkflowOutcome::confirmed(confirmed))
        }
        .await;

        self.finish("claim", request_id, start, result)
    }

    pub async fn release(
        &self,
        snapshot: &ConsoleSnapshot,
        request_id: Uuid,
    ) -> Result<WorkflowOutcome, AppError> {
        let start = Instant::now();
        let result = async {
            let request = snapshot.request(request_id)?;
            check_intent(Intent::Release, &request.lifecycle_fields()).map_err(stale)?;

            let confirmed = self.backend.release_request(request_id).await?;
            info!(
                request_id = %request_id,
                previous_collector = ?request.assigned_collector_id,
                "request released"
            );
            Ok::<_, AppError>(WorkflowOutcome::confirmed(confirmed))
        }
        .await;

        self.finish("release", request_id, start, result)
    }

    pub async fn complete(
        &self,
        snapshot: &ConsoleSnapshot,
        request_id: Uuid,
    ) -> Result<WorkflowOutcome, AppError> {
        let start = Instant::now();
        let result = async {
            let request = snapshot.request(request_id)?;
            check_intent(Intent::Complete, &request.lifecycle_fields()).map_err(stale)?;

            let confirmed = self.backend.complete_request(request_id).await?;
            info!(
                request_id = %request_id,
                collector_id = ?confirmed.assigned_collector_id,
                "assignment completed"
            );

            let mut outcome = WorkflowOutcome::confirmed(confirmed);
            if outcome.request.status != RequestStatus::Unrecognized
                && outcome.request.weight.is_none()
            {
                outcome.notices.push(Notice::WeightRequired { request_id });
            }
            Ok::<_, AppError>(outcome)
        }
        .await;

        self.finish("complete", request_id, start, result)
    }

    /// Records the measured weight of a completed pickup. An open assignment
    /// is completed by the same call.
    pub async fn record_collection(
        &self,
        snapshot: &ConsoleSnapshot,
        request_id: Uuid,
        weight: f64,
    ) -> Result<WorkflowOutcome, AppError> {
        let start = Instant::now();
        let result = async {
            let request = snapshot.request(request_id)?;
            let fields = request.lifecycle_fields();
            if fields.status != RequestStatus::Collected {
                check_intent(Intent::Complete, &fields).map_err(stale)?;
            }
            check_weight(weight)?;

            let confirmed = self.backend.record_collection(request_id, weight).await?;
            info!(request_id = %request_id, weight, "collection recorded");
            Ok::<_, AppError>(WorkflowOutcome::confirmed(confirmed))
        }
        .await;

        self.finish("collect", request_id, start, result)
    }

    pub async fn update(
        &self,
        snapshot: &ConsoleSnapshot,
        request_id: Uuid,
        draft: &RequestDraft,
    ) -> Result<WorkflowOutcome, AppError> {
        let start = Instant::now();
        let result = async {
            let request = snapshot.request(request_id)?;
            if let Some(collector_id) = draft.assigned_collector_id {
                snapshot.collector(collector_id)?;
            }

            let validated = validate_draft(draft, DraftTarget::Existing(request))?;
            if let Some(collector_id) = validated.patch.assigned_collector_id {
                let reassigned = request.assigned_collector_id != Some(collector_id);
                if reassigned
                    && validated.patch.assignment_status.is_open()
                    && snapshot.availability().is_busy(collector_id)
                {
                    return Err(AppError::Validation(vec![format!(
                        "collector {collector_id} already holds an open assignment"
                    )]));
                }
            }
            self.report_corrections(request_id, &validated);

            let confirmed = self
                .backend
                .update_request(request_id, &validated.patch)
                .await?;
            info!(request_id = %request_id, status = %confirmed.status, "request updated");
            Ok::<_, AppError>(WorkflowOutcome {
                request: confirmed,
                notices: validated.notices,
            })
        }
        .await;

        self.finish("update", request_id, start, result)
    }

    pub async fn create(&self, draft: &RequestDraft) -> Result<WorkflowOutcome, AppError> {
        let start = Instant::now();
        let result = async {
            let validated = validate_draft(draft, DraftTarget::New)?;
            let created = self.backend.create_request(&validated.patch).await?;
            info!(request_id = %created.id, code = %created.code, "request created");
            Ok::<_, AppError>(WorkflowOutcome {
                request: created,
                notices: validated.notices,
            })
        }
        .await;

        let request_id = result
            .as_ref()
            .map(|outcome| outcome.request.id)
            .unwrap_or_else(|_| Uuid::nil());
        self.finish("create", request_id, start, result)
    }

    pub async fn delete(&self, request_id: Uuid) -> Result<(), AppError> {
        let start = Instant::now();
        let result = self.backend.delete_request(request_id).await;
        if result.is_ok() {
            info!(request_id = %request_id, "request deleted");
        }
        self.finish("delete", request_id, start, result)
    }

    pub async fn collector_stats(&self, collector_id: Uuid) -> Result<CollectorStats, AppError> {
        let history = self
            .backend
            .list_assignments_for_collector(collector_id)
            .await?;
        Ok(aggregate(collector_id, &history))
    }

    fn report_corrections(&self, request_id: Uuid, validated: &ValidatedDraft) {
        for notice in &validated.notices {
            if let Notice::AutoCorrected { from, to, .. } = notice {
                self.metrics.lifecycle_corrections_total.inc();
                warn!(
                    request_id = %request_id,
                    from = %from,
                    to = %to,
                    "assignment status auto-corrected"
                );
            }
        }
    }

    fn finish<T>(
        &self,
        action: &'static str,
        request_id: Uuid,
        start: Instant,
        result: Result<T, AppError>,
    ) -> Result<T, AppError> {
        let elapsed = start.elapsed().as_secs_f64();
        match &result {
            Ok(_) => self.metrics.record_action(action, "success", elapsed),
            Err(err) => {
                self.metrics
                    .record_action(action, err.outcome_label(), elapsed);
                match err {
                    AppError::Conflict(_) => warn!(
                        action,
                        request_id = %request_id,
                        error = %err,
                        "request changed concurrently; refetch required"
                    ),
                    AppError::Transport(_) => warn!(
                        action,
                        request_id = %request_id,
                        error = %err,
                        "backend unreachable"
                    ),
                    _ => warn!(action, request_id = %request_id, error = %err, "action rejected"),
                }
            }
        }
        result
    }
}

/// The request no longer matches what the caller saw; it must refetch.
fn stale(err: LifecycleError) -> AppError {
    AppError::Conflict(err.to_string())
}
