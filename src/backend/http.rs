use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend::CollectionBackend;
use crate::error::AppError;
use crate::models::collector::Collector;
use crate::models::request::{PickupRequest, RequestPatch, RequestStatus};

/// Talks to the remote collection backend over HTTP. Calls are bounded by
/// the client timeout and never retried.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClaimBody {
    collector_id: Uuid,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Claim, release and complete report a stale precondition as 400 or 409.
#[derive(Clone, Copy, PartialEq)]
enum CallKind {
    Read,
    Edit,
    Intent,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration, token: Option<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Internal(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, kind: CallKind) -> Result<Response, AppError> {
        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        debug!(status = %status, url = %response.url(), "backend responded");

        if status.is_success() {
            return Ok(response);
        }

        let message = read_error_message(response).await;
        Err(map_status(status, kind, message))
    }

    async fn json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        kind: CallKind,
    ) -> Result<T, AppError> {
        let response = self.send(builder, kind).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| AppError::Transport(format!("invalid backend response: {err}")))
    }
}

fn transport_error(err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        warn!(error = %err, "backend call timed out");
        AppError::Transport(format!("backend call timed out: {err}"))
    } else {
        warn!(error = %err, "backend call failed");
        AppError::Transport(err.to_string())
    }
}

async fn read_error_message(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|body| body.message.or(body.error))
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            if text.trim().is_empty() {
                format!("backend returned {status}")
            } else {
                text
            }
        })
}

fn map_status(status: StatusCode, kind: CallKind, message: String) -> AppError {
    match status {
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::CONFLICT => AppError::Conflict(message),
        StatusCode::BAD_REQUEST if kind == CallKind::Intent => AppError::Conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY if kind == CallKind::Edit => {
            AppError::Validation(vec![message])
        }
        other => AppError::Transport(format!("backend returned {other}: {message}")),
    }
}

#[async_trait]
impl CollectionBackend for HttpBackend {
    fn mode(&self) -> &'static str {
        "http"
    }

    async fn list_requests(&self) -> Result<Vec<PickupRequest>, AppError> {
        self.json(self.request(Method::GET, "requests"), CallKind::Read)
            .await
    }

    async fn get_request(&self, request_id: Uuid) -> Result<PickupRequest, AppError> {
        self.json(
            self.request(Method::GET, &format!("requests/{request_id}")),
            CallKind::Read,
        )
        .await
    }

    async fn list_collectors(&self) -> Result<Vec<Collector>, AppError> {
        self.json(
            self.request(Method::GET, "admin/users/role/ROLE_COLLECTOR"),
            CallKind::Read,
        )
        .await
    }

    async fn list_assignments_for_collector(
        &self,
        collector_id: Uuid,
    ) -> Result<Vec<PickupRequest>, AppError> {
        self.json(
            self.request(Method::GET, &format!("assignments/collector/{collector_id}")),
            CallKind::Read,
        )
        .await
    }

    async fn claim_request(
        &self,
        request_id: Uuid,
        collector_id: Uuid,
    ) -> Result<PickupRequest, AppError> {
        let builder = self
            .request(Method::POST, &format!("assignments/claim/{request_id}"))
            .json(&ClaimBody { collector_id });
        self.json(builder, CallKind::Intent).await
    }

    async fn release_request(&self, request_id: Uuid) -> Result<PickupRequest, AppError> {
        self.json(
            self.request(Method::POST, &format!("assignments/release/{request_id}")),
            CallKind::Intent,
        )
        .await
    }

    async fn complete_request(&self, request_id: Uuid) -> Result<PickupRequest, AppError> {
        self.json(
            self.request(Method::POST, &format!("assignments/complete/{request_id}")),
            CallKind::Intent,
        )
        .await
    }

    async fn update_request(
        &self,
        request_id: Uuid,
        patch: &RequestPatch,
    ) -> Result<PickupRequest, AppError> {
        let builder = self
            .request(Method::PUT, &format!("requests/{request_id}"))
            .json(patch);
        self.json(builder, CallKind::Edit).await
    }

    async fn create_request(&self, patch: &RequestPatch) -> Result<PickupRequest, AppError> {
        let builder = self.request(Method::POST, "requests").json(patch);
        self.json(builder, CallKind::Edit).await
    }

    async fn delete_request(&self, request_id: Uuid) -> Result<(), AppError> {
        self.send(
            self.request(Method::DELETE, &format!("requests/{request_id}")),
            CallKind::Edit,
        )
        .await
        .map(|_| ())
    }

    async fn record_collection(
        &self,
        request_id: Uuid,
        weight: f64,
    ) -> Result<PickupRequest, AppError> {
        let builder = self
            .request(Method::PATCH, &format!("collector/requests/{request_id}"))
            .query(&[
                ("status", RequestStatus::Collected.as_str().to_string()),
                ("weight", weight.to_string()),
            ]);
        self.json(builder, CallKind::Intent).await
    }
}
