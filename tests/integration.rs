use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use collection_console::api::rest::router;
use collection_console::backend::memory::MemoryBackend;
use collection_console::models::collector::Collector;
use collection_console::models::request::{AssignmentStatus, PickupRequest, RequestStatus};
use collection_console::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

fn collector(seed: u128, name: &str) -> Collector {
    Collector {
        id: Uuid::from_u128(seed),
        name: name.to_string(),
        lastname: Some("Rojas".to_string()),
        email: Some(format!("{name}@example.org")),
        phone: None,
    }
}

fn pickup(
    seed: u128,
    status: RequestStatus,
    assignment_status: AssignmentStatus,
    collector: Option<Uuid>,
) -> PickupRequest {
    PickupRequest {
        id: Uuid::from_u128(10_000 + seed),
        code: format!("REQ-{seed:05}"),
        status,
        assignment_status,
        assigned_collector_id: collector,
        weight: None,
        material: "plastic".to_string(),
        description: None,
        address: Some("Calle Los Pinos 55".to_string()),
        district: Some("Miraflores".to_string()),
        latitude: Some(-12.12),
        longitude: Some(-77.03),
        user_id: Some(Uuid::from_u128(500)),
        user_name: Some("Lucia".to_string()),
        user_lastname: Some("Flores".to_string()),
        created_at: Utc::now(),
        updated_at: None,
    }
}

fn setup() -> (axum::Router, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    let state = AppState::new(backend.clone());
    (router(Arc::new(state)), backend)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    empty_request("GET", uri)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn ids(list: &Value) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_reports_backend_mode() {
    let (app, _backend) = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "memory");
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let (app, backend) = setup();
    let c = collector(1, "carla");
    let r = pickup(1, RequestStatus::Pending, AssignmentStatus::Available, None);
    backend.insert_collector(c.clone());
    backend.insert_request(r.clone()).unwrap();

    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/requests/{}/claim", r.id),
            json!({ "collectorId": c.id }),
        ))
        .await
        .unwrap();

    let response = app.oneshot(get_request("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("workflow_actions_total"));
    assert!(body.contains("action=\"claim\""));
}

#[tokio::test]
async fn claim_moves_collector_from_available_to_busy() {
    let (app, backend) = setup();
    let c = collector(1, "carla");
    let r = pickup(1, RequestStatus::Pending, AssignmentStatus::Available, None);
    backend.insert_collector(c.clone());
    backend.insert_request(r.clone()).unwrap();

    let board = body_json(app.clone().oneshot(get_request("/collectors")).await.unwrap()).await;
    assert_eq!(ids(&board["available"]), vec![c.id.to_string()]);
    assert!(board["busy"].as_array().unwrap().is_empty());

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/requests/{}/claim", r.id),
            json!({ "collectorId": c.id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let outcome = body_json(res).await;
    assert_eq!(outcome["request"]["assignmentStatus"], "PENDING");
    assert_eq!(outcome["request"]["assignedCollectorId"], c.id.to_string());

    let board = body_json(app.oneshot(get_request("/collectors")).await.unwrap()).await;
    assert!(board["available"].as_array().unwrap().is_empty());
    assert_eq!(ids(&board["busy"]), vec![c.id.to_string()]);
    assert_eq!(board["busy"][0]["currentAssignments"], 1);
    assert_eq!(board["busy"][0]["name"], "carla");
}

#[tokio::test]
async fn claim_of_taken_request_is_a_conflict() {
    let (app, backend) = setup();
    let holder = collector(1, "carla");
    let other = collector(2, "diego");
    let r = pickup(1, RequestStatus::Pending, AssignmentStatus::Pending, Some(holder.id));
    backend.insert_collector(holder.clone());
    backend.insert_collector(other.clone());
    backend.insert_request(r.clone()).unwrap();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/requests/{}/claim", r.id),
            json!({ "collectorId": other.id }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body = body_json(res).await;
    assert_eq!(body["refetch"], true);

    let stored = body_json(
        app.oneshot(get_request(&format!("/requests/{}", r.id)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(stored["assignedCollectorId"], holder.id.to_string());
}

#[tokio::test]
async fn complete_then_record_weight_updates_stats() {
    let (app, backend) = setup();
    let c = collector(1, "carla");
    let r = pickup(1, RequestStatus::Pending, AssignmentStatus::InProgress, Some(c.id));
    backend.insert_collector(c.clone());
    backend.insert_request(r.clone()).unwrap();

    let stats_uri = format!("/collectors/{}/stats", c.id);
    let before = body_json(app.clone().oneshot(get_request(&stats_uri)).await.unwrap()).await;
    assert_eq!(before["currentAssignments"], 1);
    assert_eq!(before["completedAssignments"], 0);

    let res = app
        .clone()
        .oneshot(empty_request("POST", &format!("/requests/{}/complete", r.id)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let outcome = body_json(res).await;
    assert_eq!(outcome["request"]["assignmentStatus"], "COMPLETED");
    assert_eq!(outcome["request"]["status"], "COLLECTED");
    assert_eq!(outcome["notices"][0]["kind"], "WEIGHT_REQUIRED");

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/requests/{}/collection", r.id),
            json!({ "weight": 42.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let after = body_json(app.oneshot(get_request(&stats_uri)).await.unwrap()).await;
    assert_eq!(after["currentAssignments"], 0);
    assert_eq!(after["completedAssignments"], 1);
    assert_eq!(after["totalWeight"], 42.0);
    assert_eq!(after["performance"], 100);
}

#[tokio::test]
async fn release_returns_request_to_pool() {
    let (app, backend) = setup();
    let c = collector(1, "carla");
    let r = pickup(1, RequestStatus::Scheduled, AssignmentStatus::Pending, Some(c.id));
    backend.insert_collector(c.clone());
    backend.insert_request(r.clone()).unwrap();

    let res = app
        .clone()
        .oneshot(empty_request("POST", &format!("/requests/{}/release", r.id)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let outcome = body_json(res).await;
    assert_eq!(outcome["request"]["assignmentStatus"], "AVAILABLE");
    assert!(outcome["request"]["assignedCollectorId"].is_null());

    let res = app
        .oneshot(empty_request("POST", &format!("/requests/{}/release", r.id)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn edit_to_collected_requires_weight_and_auto_corrects() {
    let (app, backend) = setup();
    let c = collector(1, "carla");
    let r = pickup(1, RequestStatus::Scheduled, AssignmentStatus::Pending, Some(c.id));
    backend.insert_collector(c.clone());
    backend.insert_request(r.clone()).unwrap();
    let uri = format!("/requests/{}", r.id);

    let res = app
        .clone()
        .oneshot(json_request("PUT", &uri, json!({ "status": "COLLECTED" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = app
        .oneshot(json_request(
            "PUT",
            &uri,
            json!({ "status": "COLLECTED", "weight": 9.5 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let outcome = body_json(res).await;
    assert_eq!(outcome["request"]["assignmentStatus"], "COMPLETED");
    assert_eq!(outcome["request"]["weight"], 9.5);
    assert_eq!(outcome["notices"][0]["kind"], "AUTO_CORRECTED");
    assert_eq!(outcome["notices"][0]["from"], "PENDING");
    assert_eq!(outcome["notices"][0]["to"], "COMPLETED");
}

#[tokio::test]
async fn create_reports_all_missing_fields() {
    let (app, backend) = setup();

    let res = app
        .clone()
        .oneshot(json_request("POST", "/requests", json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(res).await;
    assert_eq!(body["violations"].as_array().unwrap().len(), 3);
    assert_eq!(backend.request_count(), 0);

    let res = app
        .oneshot(json_request(
            "POST",
            "/requests",
            json!({
                "userId": Uuid::from_u128(500),
                "material": "glass",
                "address": "Av. Arequipa 1200",
                "latitude": -12.08,
                "longitude": -77.03
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let outcome = body_json(res).await;
    assert_eq!(outcome["request"]["status"], "PENDING");
    assert_eq!(outcome["request"]["assignmentStatus"], "AVAILABLE");
    assert!(outcome["request"]["code"].as_str().unwrap().starts_with("REQ-"));
}

#[tokio::test]
async fn list_requests_applies_filters() {
    let (app, backend) = setup();
    let c = collector(1, "carla");
    backend.insert_collector(c.clone());
    let open = pickup(1, RequestStatus::Pending, AssignmentStatus::Available, None);
    let mut paper = pickup(2, RequestStatus::Scheduled, AssignmentStatus::Pending, Some(c.id));
    paper.material = "paper".to_string();
    backend.insert_request(open.clone()).unwrap();
    backend.insert_request(paper.clone()).unwrap();

    let res = app
        .clone()
        .oneshot(get_request("/requests?assignmentStatus=PENDING"))
        .await
        .unwrap();
    assert_eq!(ids(&body_json(res).await), vec![paper.id.to_string()]);

    let res = app
        .oneshot(get_request("/requests?search=PLASTIC&status=PENDING"))
        .await
        .unwrap();
    assert_eq!(ids(&body_json(res).await), vec![open.id.to_string()]);
}

#[tokio::test]
async fn delete_then_get_returns_404() {
    let (app, backend) = setup();
    let r = pickup(1, RequestStatus::Pending, AssignmentStatus::Available, None);
    backend.insert_request(r.clone()).unwrap();
    let uri = format!("/requests/{}", r.id);

    let res = app.clone().oneshot(empty_request("DELETE", &uri)).await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = app.oneshot(get_request(&uri)).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn lifecycle_endpoints_expose_the_table() {
    let (app, _backend) = setup();

    let res = app
        .clone()
        .oneshot(get_request("/lifecycle/SCHEDULED"))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["allowed"], json!(["AVAILABLE", "PENDING"]));
    assert_eq!(body["fallback"], "AVAILABLE");

    let res = app
        .oneshot(json_request(
            "POST",
            "/lifecycle/validate",
            json!({ "status": "COLLECTED", "assignmentStatus": "PENDING" }),
        ))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["valid"], false);
    assert_eq!(body["fallback"], "COMPLETED");
}

#[tokio::test]
async fn concurrent_claims_have_exactly_one_winner() {
    let (app, backend) = setup();
    let first = collector(1, "carla");
    let second = collector(2, "diego");
    let r = pickup(1, RequestStatus::Pending, AssignmentStatus::Available, None);
    backend.insert_collector(first.clone());
    backend.insert_collector(second.clone());
    backend.insert_request(r.clone()).unwrap();

    let uri = format!("/requests/{}/claim", r.id);
    let (a, b) = tokio::join!(
        app.clone()
            .oneshot(json_request("POST", &uri, json!({ "collectorId": first.id }))),
        app.clone()
            .oneshot(json_request("POST", &uri, json!({ "collectorId": second.id }))),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    let statuses = [a.status(), b.status()];

    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::OK).count(),
        1,
        "statuses: {statuses:?}"
    );
    let loser = if a.status() == StatusCode::OK { b } else { a };
    assert_eq!(loser.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(loser).await["refetch"], true);
}

#[tokio::test]
async fn second_claim_after_first_is_a_conflict() {
    let (app, backend) = setup();
    let first = collector(1, "carla");
    let second = collector(2, "diego");
    let r = pickup(1, RequestStatus::Pending, AssignmentStatus::Available, None);
    backend.insert_collector(first.clone());
    backend.insert_collector(second.clone());
    backend.insert_request(r.clone()).unwrap();

    let uri = format!("/requests/{}/claim", r.id);
    let res = app
        .clone()
        .oneshot(json_request("POST", &uri, json!({ "collectorId": first.id })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(json_request("POST", &uri, json!({ "collectorId": second.id })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body = body_json(res).await;
    assert_eq!(body["refetch"], true);
    assert!(body["error"].as_str().unwrap().contains("claim"));
}

#[tokio::test]
async fn dashboard_summarizes_all_requests() {
    let (app, backend) = setup();
    let c = collector(1, "carla");
    backend.insert_collector(c.clone());

    let mut collected = pickup(1, RequestStatus::Collected, AssignmentStatus::Completed, Some(c.id));
    collected.weight = Some(10.0);
    collected.created_at = Utc::now() - chrono::Duration::days(2);
    backend.insert_request(collected).unwrap();
    backend
        .insert_request(pickup(2, RequestStatus::Pending, AssignmentStatus::Available, None))
        .unwrap();
    backend
        .insert_request(pickup(3, RequestStatus::Cancelled, AssignmentStatus::Cancelled, None))
        .unwrap();
    backend
        .insert_request(pickup(4, RequestStatus::Collected, AssignmentStatus::Completed, None))
        .unwrap();

    let res = app.oneshot(get_request("/dashboard")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["totalRequests"], 4);
    assert_eq!(body["todayRequests"], 3);
    assert_eq!(body["pendingRequests"], 1);
    assert_eq!(body["collectedRequests"], 2);
    assert_eq!(body["totalWeight"], 10.0);
    assert_eq!(body["efficiency"], 50.0);
    assert_eq!(body["impact"]["treesSaved"], 2);
}
