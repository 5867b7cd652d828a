//! The remote service that owns request state.
//!
//! Every mutating call is a single request/response exchange. The backend
//! is the only arbiter of a request's current assignment status: a claim,
//! release or complete that no longer matches the stored state comes back
//! as `AppError::Conflict`.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::collector::Collector;
use crate::models::request::{PickupRequest, RequestPatch};

#[async_trait]
pub trait CollectionBackend: Send + Sync {
    /// Short label for logs and health output.
    fn mode(&self) -> &'static str;

    async fn list_requests(&self) -> Result<Vec<PickupRequest>, AppError>;

    async fn get_request(&self, request_id: Uuid) -> Result<PickupRequest, AppError>;

    async fn list_collectors(&self) -> Result<Vec<Collector>, AppError>;

    async fn list_assignments_for_collector(
        &self,
        collector_id: Uuid,
    ) -> Result<Vec<PickupRequest>, AppError>;

    async fn claim_request(
        &self,
        request_id: Uuid,
        collector_id: Uuid,
    ) -> Result<PickupRequest, AppError>;

    async fn release_request(&self, request_id: Uuid) -> Result<PickupRequest, AppError>;

    async fn complete_request(&self, request_id: Uuid) -> Result<PickupRequest, AppError>;

    async fn update_request(
        &self,
        request_id: Uuid,
        patch: &RequestPatch,
    ) -> Result<PickupRequest, AppError>;

    async fn create_request(&self, patch: &RequestPatch) -> Result<PickupRequest, AppError>;

    async fn delete_request(&self, request_id: Uuid) -> Result<(), AppError>;

    /// Marks a completed pickup COLLECTED with its measured weight.
    async fn record_collection(
        &self,
        request_id: Uuid,
        weight: f64,
    ) -> Result<PickupRequest, AppError>;
}
