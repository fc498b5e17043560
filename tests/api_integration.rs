//! Integration tests for Tourguard API endpoints.
//!
//! These tests verify the full request/response cycle through the HTTP API.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, StatusCode, header::AUTHORIZATION};
use axum_test::TestServer;
use serde_json::{Value, json};

use tourguard::api::{self, AppState};
use tourguard::auth::{Claims, JwtConfig, Role};
use tourguard::lifecycle::ComplaintService;
use tourguard::notify::Notifier;
use tourguard::storage::Storage;

const SECRET: &str = "integration-test-secret-at-least-32-bytes";

struct Harness {
    server: TestServer,
    jwt: Arc<JwtConfig>,
}

impl Harness {
    fn token(&self, claims: Claims) -> (HeaderName, HeaderValue) {
        let token = self.jwt.issue(&claims).unwrap();
        (
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        )
    }

    fn tourist(&self, user_id: &str) -> (HeaderName, HeaderValue) {
        self.token(Claims::new(user_id, Role::Tourist).with_phone("+1-555-0100"))
    }

    fn officer(&self) -> (HeaderName, HeaderValue) {
        self.token(Claims::new("officer-1", Role::Authority).with_name("Officer Rao"))
    }
}

async fn create_test_server() -> Harness {
    let storage = Storage::new("sqlite::memory:").await.unwrap();
    let (notifier, _delivery) = Notifier::spawn(storage.clone());
    let jwt = Arc::new(JwtConfig::try_new(SECRET, None).unwrap());

    let state = AppState {
        storage: storage.clone(),
        complaints: ComplaintService::new(storage, notifier),
        jwt: jwt.clone(),
    };

    Harness {
        server: TestServer::new(api::router(state)).unwrap(),
        jwt,
    }
}

fn theft_report() -> Value {
    json!({
        "category": "theft_robbery",
        "title": "Wallet stolen",
        "description": "Pickpocketed near the clock tower",
        "urgency": "high",
        "contactInfo": "+1-555-0100",
        "location": {
            "address": "MG Road",
            "coordinates": [77.5946, 12.9716]
        }
    })
}

async fn submit(harness: &Harness, user_id: &str) -> String {
    let (name, value) = harness.tourist(user_id);
    let response = harness
        .server
        .post("/sos/submit")
        .add_header(name, value)
        .json(&theft_report())
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    body["complaint"]["id"].as_str().unwrap().to_string()
}

/// Drive a complaint to `resolved` through the authority routes.
async fn resolve_as_officer(harness: &Harness, id: &str) {
    let (name, value) = harness.officer();
    harness
        .server
        .patch(&format!("/authority/complaints/{id}/acknowledge"))
        .add_header(name.clone(), value.clone())
        .await
        .assert_status_ok();
    harness
        .server
        .patch(&format!("/authority/complaints/{id}/assign"))
        .add_header(name.clone(), value.clone())
        .json(&json!({ "officerId": "officer-7" }))
        .await
        .assert_status_ok();
    harness
        .server
        .patch(&format!("/authority/complaints/{id}/status"))
        .add_header(name.clone(), value.clone())
        .json(&json!({ "status": "in_progress" }))
        .await
        .assert_status_ok();
    harness
        .server
        .patch(&format!("/authority/complaints/{id}/resolve"))
        .add_header(name, value)
        .json(&json!({ "resolutionNotes": "Wallet recovered", "actionTaken": "Returned" }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_health_endpoint() {
    let harness = create_test_server().await;

    harness.server.get("/health").await.assert_status_ok();
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let harness = create_test_server().await;

    let response = harness.server.post("/sos/submit").json(&theft_report()).await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_submit_complaint_derives_fields() {
    let harness = create_test_server().await;
    let (name, value) = harness.tourist("tourist-1");

    let response = harness
        .server
        .post("/sos/submit")
        .add_header(name.clone(), value.clone())
        .json(&theft_report())
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["complaint"]["status"], "submitted");
    assert!(
        body["complaint"]["complaintId"]
            .as_str()
            .unwrap()
            .starts_with("SOS")
    );

    let id = body["complaint"]["id"].as_str().unwrap();
    let response = harness
        .server
        .get(&format!("/sos/{id}"))
        .add_header(name, value)
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["complaint"]["priority"], "high");
    assert_eq!(body["complaint"]["assignedDepartment"], "police");
    assert_eq!(body["complaint"]["communications"][0]["from"], "system");
}

#[tokio::test]
async fn test_submit_rejects_blank_title() {
    let harness = create_test_server().await;
    let (name, value) = harness.tourist("tourist-1");

    let mut report = theft_report();
    report["title"] = json!("   ");

    let response = harness
        .server
        .post("/sos/submit")
        .add_header(name, value)
        .json(&report)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_emergency_without_body() {
    let harness = create_test_server().await;
    let (name, value) = harness.tourist("tourist-1");

    let response = harness
        .server
        .post("/sos/emergency")
        .add_header(name, value)
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["eta"], "5-8 minutes");
    assert_eq!(body["complaint"]["urgency"], "critical");
    assert_eq!(body["complaint"]["isEmergencySOS"], true);
}

#[tokio::test]
async fn test_emergency_without_contact_info() {
    let harness = create_test_server().await;
    let (name, value) = harness.token(Claims::new("tourist-2", Role::Tourist));

    let response = harness
        .server
        .post("/sos/emergency")
        .add_header(name, value)
        .json(&json!({}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "MISSING_CONTACT_INFO");
}

#[tokio::test]
async fn test_other_users_complaint_is_forbidden() {
    let harness = create_test_server().await;
    let id = submit(&harness, "tourist-1").await;
    let (name, value) = harness.tourist("tourist-2");

    let response = harness
        .server
        .get(&format!("/sos/{id}"))
        .add_header(name, value)
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unknown_complaint_is_not_found() {
    let harness = create_test_server().await;
    let (name, value) = harness.officer();

    let response = harness
        .server
        .get("/authority/complaints/does-not-exist")
        .add_header(name, value)
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_own_complaints_paginates() {
    let harness = create_test_server().await;
    for _ in 0..3 {
        submit(&harness, "tourist-1").await;
    }
    submit(&harness, "tourist-2").await;

    let (name, value) = harness.tourist("tourist-1");
    let response = harness
        .server
        .get("/sos?limit=2")
        .add_header(name, value)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["complaints"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["totalPages"], 2);
    assert_eq!(body["pagination"]["hasNext"], true);
}

#[tokio::test]
async fn test_cancel_then_cancel_again() {
    let harness = create_test_server().await;
    let id = submit(&harness, "tourist-1").await;
    let (name, value) = harness.tourist("tourist-1");

    let response = harness
        .server
        .patch(&format!("/sos/{id}/cancel"))
        .add_header(name.clone(), value.clone())
        .json(&json!({ "reason": "Found it" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["complaint"]["status"], "closed");

    let response = harness
        .server
        .patch(&format!("/sos/{id}/cancel"))
        .add_header(name, value)
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"], "NOT_CANCELLABLE");
}

#[tokio::test]
async fn test_authority_routes_require_role() {
    let harness = create_test_server().await;
    let (name, value) = harness.tourist("tourist-1");

    let response = harness
        .server
        .get("/authority/complaints")
        .add_header(name, value)
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_full_lifecycle_and_feedback() {
    let harness = create_test_server().await;
    let id = submit(&harness, "tourist-1").await;
    resolve_as_officer(&harness, &id).await;

    let (name, value) = harness.tourist("tourist-1");
    let response = harness
        .server
        .post(&format!("/sos/{id}/feedback"))
        .add_header(name.clone(), value.clone())
        .json(&json!({ "rating": 5, "comment": "Quick help" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["complaint"]["status"], "resolved");
    assert_eq!(body["complaint"]["feedback"]["rating"], 5);
    assert!(body["complaint"]["emergencyResponseTime"].is_number());

    let response = harness
        .server
        .post(&format!("/sos/{id}/feedback"))
        .add_header(name.clone(), value.clone())
        .json(&json!({ "rating": 1 }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"], "ALREADY_RATED");

    let response = harness
        .server
        .get("/sos/stats/user")
        .add_header(name, value)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["stats"]["total"], 1);
    assert_eq!(body["stats"]["resolvedCount"], 1);
    assert_eq!(body["stats"]["averageRating"], 5.0);
}

#[tokio::test]
async fn test_feedback_before_resolution_conflicts() {
    let harness = create_test_server().await;
    let id = submit(&harness, "tourist-1").await;
    let (name, value) = harness.tourist("tourist-1");

    let response = harness
        .server
        .post(&format!("/sos/{id}/feedback"))
        .add_header(name, value)
        .json(&json!({ "rating": 4 }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"], "NOT_ELIGIBLE_FOR_FEEDBACK");
}

#[tokio::test]
async fn test_invalid_transition_conflicts() {
    let harness = create_test_server().await;
    let id = submit(&harness, "tourist-1").await;
    let (name, value) = harness.officer();

    let response = harness
        .server
        .patch(&format!("/authority/complaints/{id}/status"))
        .add_header(name, value)
        .json(&json!({ "status": "resolved" }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn test_resolve_requires_notes() {
    let harness = create_test_server().await;
    let id = submit(&harness, "tourist-1").await;
    let (name, value) = harness.officer();

    let response = harness
        .server
        .patch(&format!("/authority/complaints/{id}/resolve"))
        .add_header(name, value)
        .json(&json!({ "resolutionNotes": "  " }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "MISSING_RESOLUTION_NOTES");
}

#[tokio::test]
async fn test_escalate_generates_fir_number() {
    let harness = create_test_server().await;
    let id = submit(&harness, "tourist-1").await;
    let (name, value) = harness.officer();

    let response = harness
        .server
        .patch(&format!("/authority/complaints/{id}/escalate"))
        .add_header(name, value)
        .json(&json!({ "escalationNotes": "Repeat offender" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["complaint"]["status"], "escalated");
    assert_eq!(body["complaint"]["priority"], "high");
    assert!(
        body["complaint"]["escalation"]["firNumber"]
            .as_str()
            .unwrap()
            .starts_with("FIR")
    );
}

#[tokio::test]
async fn test_authority_view_and_nearby() {
    let harness = create_test_server().await;
    let id = submit(&harness, "tourist-1").await;
    let (name, value) = harness.officer();

    let response = harness
        .server
        .get(&format!("/authority/complaints/{id}"))
        .add_header(name.clone(), value.clone())
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["alert"]["type"], "theft");
    assert_eq!(body["alert"]["severity"], "high");
    assert_eq!(body["alert"]["coordinates"]["lat"], 12.9716);
    assert_eq!(body["alert"]["coordinates"]["lng"], 77.5946);

    let response = harness
        .server
        .get("/authority/complaints/nearby?lat=12.9720&lng=77.5950&radius=2")
        .add_header(name.clone(), value.clone())
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["alerts"].as_array().unwrap().len(), 1);
    assert!(body["alerts"][0]["distanceKm"].is_number());

    let response = harness
        .server
        .get("/authority/complaints/nearby?lat=19.0760&lng=72.8777")
        .add_header(name, value)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["alerts"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_authority_list_search_and_stats() {
    let harness = create_test_server().await;
    submit(&harness, "tourist-1").await;
    let (name, value) = harness.tourist("tourist-2");
    harness
        .server
        .post("/sos/emergency")
        .add_header(name, value)
        .await
        .assert_status(StatusCode::CREATED);

    let (name, value) = harness.officer();

    let response = harness
        .server
        .get("/authority/complaints?sortBy=priority")
        .add_header(name.clone(), value.clone())
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["alerts"][0]["priority"], "critical");

    let response = harness
        .server
        .get("/authority/complaints?search=wallet")
        .add_header(name.clone(), value.clone())
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["pagination"]["total"], 1);

    let response = harness
        .server
        .get("/authority/complaints/stats?timeRange=7d")
        .add_header(name, value)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["stats"]["timeRange"], "7d");
    assert_eq!(body["stats"]["total"], 2);
    assert_eq!(body["stats"]["emergencyCount"], 1);
}

#[tokio::test]
async fn test_soft_deleted_complaint_disappears() {
    let harness = create_test_server().await;
    let id = submit(&harness, "tourist-1").await;
    let (name, value) = harness.officer();

    harness
        .server
        .delete(&format!("/authority/complaints/{id}"))
        .add_header(name.clone(), value.clone())
        .await
        .assert_status_ok();

    harness
        .server
        .get(&format!("/authority/complaints/{id}"))
        .add_header(name, value)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tourist_safety_score() {
    let harness = create_test_server().await;
    submit(&harness, "tourist-1").await;
    let (name, value) = harness.officer();

    let response = harness
        .server
        .get("/authority/tourists/tourist-1/safety")
        .add_header(name, value)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["stats"]["score"], 75);
    assert_eq!(body["stats"]["riskLevel"], "low");
}

#[tokio::test]
async fn test_notifications_delivered_and_marked_read() {
    let harness = create_test_server().await;
    submit(&harness, "tourist-1").await;
    let (name, value) = harness.tourist("tourist-1");

    // Delivery runs on a background task.
    let mut notifications = Vec::new();
    for _ in 0..50 {
        let body: Value = harness
            .server
            .get("/notifications?unreadOnly=true")
            .add_header(name.clone(), value.clone())
            .await
            .json();
        notifications = body["notifications"].as_array().cloned().unwrap_or_default();
        if !notifications.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(notifications.len(), 1);

    let notification_id = notifications[0]["id"].as_str().unwrap();
    let (other_name, other_value) = harness.tourist("tourist-2");
    harness
        .server
        .patch(&format!("/notifications/{notification_id}/read"))
        .add_header(other_name, other_value)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = harness
        .server
        .patch(&format!("/notifications/{notification_id}/read"))
        .add_header(name.clone(), value.clone())
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["notification"]["isRead"], true);

    let body: Value = harness
        .server
        .get("/notifications?unreadOnly=true")
        .add_header(name, value)
        .await
        .json();
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_submit_reads_emergency_flag() {
    let harness = create_test_server().await;
    let (name, value) = harness.tourist("tourist-1");

    let mut report = theft_report();
    report["category"] = json!("fire_emergency");
    report["isEmergencySOS"] = json!(true);

    let response = harness
        .server
        .post("/sos/submit")
        .add_header(name.clone(), value.clone())
        .json(&report)
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["complaint"]["isEmergencySOS"], true);

    let id = body["complaint"]["id"].as_str().unwrap();
    let body: Value = harness
        .server
        .get(&format!("/sos/{id}"))
        .add_header(name, value)
        .await
        .json();
    assert_eq!(body["complaint"]["priority"], "critical");
    assert_eq!(body["complaint"]["assignedDepartment"], "fire_department");
    assert!(body["complaint"]["sosActivatedAt"].is_string());
}

#[tokio::test]
async fn test_status_route_refuses_dedicated_statuses() {
    let harness = create_test_server().await;
    let id = submit(&harness, "tourist-1").await;
    let (name, value) = harness.officer();

    for status in ["under_review", "escalated"] {
        let response = harness
            .server
            .patch(&format!("/authority/complaints/{id}/status"))
            .add_header(name.clone(), value.clone())
            .json(&json!({ "status": status }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    let body: Value = harness
        .server
        .get(&format!("/authority/complaints/{id}"))
        .add_header(name, value)
        .await
        .json();
    assert_eq!(body["complaint"]["status"], "submitted");
}

#[tokio::test]
async fn test_missing_body_field_is_validation_error() {
    let harness = create_test_server().await;
    let (name, value) = harness.tourist("tourist-1");

    let mut report = theft_report();
    report.as_object_mut().unwrap().remove("description");

    let response = harness
        .server
        .post("/sos/submit")
        .add_header(name, value)
        .json(&report)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert!(body["message"].as_str().unwrap().contains("description"));
}

#[tokio::test]
async fn test_bad_query_value_is_validation_error() {
    let harness = create_test_server().await;
    let (name, value) = harness.tourist("tourist-1");

    let response = harness
        .server
        .get("/sos?status=bogus")
        .add_header(name, value)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_out_of_range_rating_is_validation_error() {
    let harness = create_test_server().await;
    let id = submit(&harness, "tourist-1").await;
    resolve_as_officer(&harness, &id).await;
    let (name, value) = harness.tourist("tourist-1");

    let response = harness
        .server
        .post(&format!("/sos/{id}/feedback"))
        .add_header(name.clone(), value.clone())
        .json(&json!({ "rating": 300 }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let body: Value = harness
        .server
        .get(&format!("/sos/{id}"))
        .add_header(name, value)
        .await
        .json();
    assert!(body["complaint"]["feedback"].is_null());
}
