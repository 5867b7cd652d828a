use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::backend::CollectionBackend;
use crate::engine::lifecycle::{LifecycleError, RequestLifecycle};
use crate::error::AppError;
use crate::models::collector::Collector;
use crate::models::request::{PickupRequest, RequestPatch};

/// In-process backend. Each mutation holds the request's map entry while it
/// checks and applies the transition, so conflicting claims serialize and
/// only the first one wins.
pub struct MemoryBackend {
    requests: DashMap<Uuid, PickupRequest>,
    collectors: DashMap<Uuid, Collector>,
    next_code: AtomicU64,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            requests: DashMap::new(),
            collectors: DashMap::new(),
            next_code: AtomicU64::new(1),
        }
    }

    pub fn insert_collector(&self, collector: Collector) {
        self.collectors.insert(collector.id, collector);
    }

    /// Seeds a request as-is. The lifecycle columns must already be legal.
    pub fn insert_request(&self, request: PickupRequest) -> Result<(), AppError> {
        RequestLifecycle::try_from(request.lifecycle_fields())?;
        self.requests.insert(request.id, request);
        Ok(())
    }

    pub fn request_count(&self) -> usize {
        self.requests.len()
    }

    fn transition<F>(&self, request_id: Uuid, apply: F) -> Result<PickupRequest, AppError>
    where
        F: FnOnce(RequestLifecycle) -> Result<RequestLifecycle, LifecycleError>,
    {
        let mut request = self
            .requests
            .get_mut(&request_id)
            .ok_or_else(|| AppError::NotFound(format!("request {request_id} not found")))?;

        let current = RequestLifecycle::try_from(request.lifecycle_fields())?;
        let next = apply(current).map_err(|err| AppError::Conflict(err.to_string()))?;

        request.apply_lifecycle_fields(next.fields());
        request.updated_at = Some(Utc::now());
        debug!(
            request_id = %request_id,
            assignment_status = %request.assignment_status,
            "request transitioned"
        );

        Ok(request.clone())
    }

    fn ensure_collector(&self, collector_id: Uuid) -> Result<(), AppError> {
        if self.collectors.contains_key(&collector_id) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("collector {collector_id} not found")))
        }
    }
}

#[async_trait]
impl CollectionBackend for MemoryBackend {
    fn mode(&self) -> &'static str {
        "memory"
    }

    async fn list_requests(&self) -> Result<Vec<PickupRequest>, AppError> {
        let mut requests: Vec<PickupRequest> = self
            .requests
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.code.cmp(&b.code)));
        Ok(requests)
    }

    async fn get_request(&self, request_id: Uuid) -> Result<PickupRequest, AppError> {
        self.requests
            .get(&request_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("request {request_id} not found")))
    }

    async fn list_collectors(&self) -> Result<Vec<Collector>, AppError> {
        let mut collectors: Vec<Collector> = self
            .collectors
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        collectors.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(collectors)
    }

    async fn list_assignments_for_collector(
        &self,
        collector_id: Uuid,
    ) -> Result<Vec<PickupRequest>, AppError> {
        self.ensure_collector(collector_id)?;
        let requests = self.list_requests().await?;
        Ok(requests
            .into_iter()
            .filter(|request| request.assigned_collector_id == Some(collector_id))
            .collect())
    }

    async fn claim_request(
        &self,
        request_id: Uuid,
        collector_id: Uuid,
    ) -> Result<PickupRequest, AppError> {
        self.ensure_collector(collector_id)?;
        self.transition(request_id, |lifecycle| lifecycle.claim(collector_id))
    }

    async fn release_request(&self, request_id: Uuid) -> Result<PickupRequest, AppError> {
        self.transition(request_id, RequestLifecycle::release)
    }

    async fn complete_request(&self, request_id: Uuid) -> Result<PickupRequest, AppError> {
        self.transition(request_id, RequestLifecycle::complete)
    }

    async fn update_request(
        &self,
        request_id: Uuid,
        patch: &RequestPatch,
    ) -> Result<PickupRequest, AppError> {
        RequestLifecycle::try_from(patch.lifecycle_fields())?;
        if let Some(collector_id) = patch.assigned_collector_id {
            self.ensure_collector(collector_id)?;
        }

        let mut request = self
            .requests
            .get_mut(&request_id)
            .ok_or_else(|| AppError::NotFound(format!("request {request_id} not found")))?;

        request.user_id = patch.user_id.or(request.user_id);
        request.material = patch.material.clone();
        request.description = patch.description.clone();
        request.address = Some(patch.address.clone());
        request.district = patch.district.clone();
        request.latitude = Some(patch.latitude);
        request.longitude = Some(patch.longitude);
        request.apply_lifecycle_fields(patch.lifecycle_fields());
        request.updated_at = Some(Utc::now());

        Ok(request.clone())
    }

    async fn create_request(&self, patch: &RequestPatch) -> Result<PickupRequest, AppError> {
        RequestLifecycle::try_from(patch.lifecycle_fields())?;

        let sequence = self.next_code.fetch_add(1, Ordering::Relaxed);
        let now = Utc::now();
        let request = PickupRequest {
            id: Uuid::new_v4(),
            code: format!("REQ-{sequence:05}"),
            status: patch.status,
            assignment_status: patch.assignment_status,
            assigned_collector_id: patch.assigned_collector_id,
            weight: patch.weight,
            material: patch.material.clone(),
            description: patch.description.clone(),
            address: Some(patch.address.clone()),
            district: patch.district.clone(),
            latitude: Some(patch.latitude),
            longitude: Some(patch.longitude),
            user_id: patch.user_id,
            user_name: None,
            user_lastname: None,
            created_at: now,
            updated_at: Some(now),
        };

        self.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn delete_request(&self, request_id: Uuid) -> Result<(), AppError> {
        self.requests
            .remove(&request_id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("request {request_id} not found")))
    }

    async fn record_collection(
        &self,
        request_id: Uuid,
        weight: f64,
    ) -> Result<PickupRequest, AppError> {
        self.transition(request_id, |lifecycle| {
            let collected = match lifecycle {
                RequestLifecycle::Collected { .. } => lifecycle,
                open => open.complete()?,
            };
            collected.record_weight(weight)
        })
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::MemoryBackend;
    use crate::backend::CollectionBackend;
    use crate::engine::availability::tests::{collector, request};
    use crate::error::AppError;
    use crate::models::request::{AssignmentStatus, RequestStatus};

    fn seeded() -> (MemoryBackend, Uuid, Uuid) {
        let backend = MemoryBackend::new();
        let c = collector(1);
        let r = request(1, RequestStatus::Pending, AssignmentStatus::Available, None);
        let ids = (r.id, c.id);
        backend.insert_collector(c);
        backend.insert_request(r).unwrap();
        (backend, ids.0, ids.1)
    }

    #[tokio::test]
    async fn second_claim_conflicts() {
        let (backend, request_id, collector_id) = seeded();

        let claimed = backend.claim_request(request_id, collector_id).await.unwrap();
        assert_eq!(claimed.assignment_status, AssignmentStatus::Pending);
        assert_eq!(claimed.assigned_collector_id, Some(collector_id));

        let err = backend.claim_request(request_id, collector_id).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn claim_with_unknown_collector_is_not_found() {
        let (backend, request_id, _) = seeded();

        let err = backend
            .claim_request(request_id, Uuid::from_u128(404))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn seeding_an_illegal_request_fails() {
        let backend = MemoryBackend::new();
        let illegal = request(1, RequestStatus::Collected, AssignmentStatus::Pending, None);

        assert!(matches!(
            backend.insert_request(illegal),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn record_collection_completes_an_open_assignment() {
        let (backend, request_id, collector_id) = seeded();
        backend.claim_request(request_id, collector_id).await.unwrap();

        let collected = backend.record_collection(request_id, 6.5).await.unwrap();

        assert_eq!(collected.status, RequestStatus::Collected);
        assert_eq!(collected.assignment_status, AssignmentStatus::Completed);
        assert_eq!(collected.weight, Some(6.5));
    }

    #[tokio::test]
    async fn release_of_available_request_conflicts() {
        let (backend, request_id, _) = seeded();

        let err = backend.release_request(request_id).await.unwrap_err();
        assert!(err.is_conflict());
    }
}
