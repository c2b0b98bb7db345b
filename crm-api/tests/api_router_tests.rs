//! Router-level tests against the in-memory store.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use crm_api::{app_state, create_api_router, ApiConfig};
use crm_test_utils::{EntityType, InMemoryStore, StoreOp};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> (Router, InMemoryStore) {
    let store = InMemoryStore::new();
    let router = create_api_router(app_state(Arc::new(store.clone())), &ApiConfig::default());
    (router, store)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().uri(uri).method(method);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn post(app: &Router, uri: &str, body: Value) -> Value {
    let (status, value) = send(app, Method::POST, uri, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "POST {} failed: {}", uri, value);
    value
}

/// Company, contact at it, deal and task linked to both; returns their ids.
async fn seed(app: &Router) -> (i64, i64, i64, i64) {
    let company = post(app, "/api/v1/companies", json!({ "name": "Acme" })).await;
    let company_id = company["id"].as_i64().unwrap();

    let contact = post(
        app,
        "/api/v1/contacts",
        json!({ "first_name": "Ada", "last_name": "Lovelace", "company_id": company_id }),
    )
    .await;
    let contact_id = contact["id"].as_i64().unwrap();

    let deal = post(
        app,
        "/api/v1/deals",
        json!({
            "title": "Licence",
            "value": 999999.99,
            "stage": "Proposal Sent",
            "contact_id": contact_id,
            "company_id": company_id
        }),
    )
    .await;
    let deal_id = deal["id"].as_i64().unwrap();

    let task = post(
        app,
        "/api/v1/tasks",
        json!({
            "title": "Follow up",
            "contact_id": contact_id,
            "company_id": company_id,
            "deal_id": deal_id
        }),
    )
    .await;
    let task_id = task["id"].as_i64().unwrap();

    (company_id, contact_id, deal_id, task_id)
}

// ============================================================================
// CRUD
// ============================================================================

#[tokio::test]
async fn test_create_returns_201_with_assigned_fields() {
    let (app, _) = app();
    let company = post(&app, "/api/v1/companies", json!({ "name": "Acme", "industry": "Tech" })).await;

    assert_eq!(company["id"], 1);
    assert_eq!(company["industry"], "Tech");
    assert_eq!(company["website"], Value::Null);
    assert_eq!(company["created_at"], company["updated_at"]);
}

#[tokio::test]
async fn test_get_missing_record_is_404() {
    let (app, _) = app();
    let (status, body) = send(&app, Method::GET, "/api/v1/deals/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "ENTITY_NOT_FOUND");
}

#[tokio::test]
async fn test_list_returns_records_in_id_order() {
    let (app, _) = app();
    post(&app, "/api/v1/tasks", json!({ "title": "One" })).await;
    post(&app, "/api/v1/tasks", json!({ "title": "Two" })).await;

    let (status, body) = send(&app, Method::GET, "/api/v1/tasks", None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["One", "Two"]);
}

#[tokio::test]
async fn test_patch_distinguishes_null_from_absent() {
    let (app, _) = app();
    let created = post(
        &app,
        "/api/v1/companies",
        json!({ "name": "Acme", "industry": "Tech", "website": "https://acme.example" }),
    )
    .await;

    let (status, updated) = send(
        &app,
        Method::PATCH,
        "/api/v1/companies/1",
        Some(json!({ "industry": null })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["industry"], Value::Null);
    assert_eq!(updated["website"], "https://acme.example");
    assert_eq!(updated["name"], "Acme");
    assert_eq!(updated["created_at"], created["created_at"]);
    assert_ne!(updated["updated_at"], created["updated_at"]);
}

#[tokio::test]
async fn test_deal_value_is_a_json_number() {
    let (app, _) = app();
    let (_, _, deal_id, _) = seed(&app).await;

    let (status, deal) = send(&app, Method::GET, &format!("/api/v1/deals/{}", deal_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deal["value"], json!(999999.99));
    assert_eq!(deal["stage"], "Proposal Sent");
}

// ============================================================================
// ERROR MAPPING
// ============================================================================

#[tokio::test]
async fn test_missing_reference_is_400_invalid_reference() {
    let (app, store) = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/contacts",
        Some(json!({ "first_name": "Ada", "last_name": "L", "company_id": 999999 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REFERENCE");
    assert_eq!(body["details"]["id"], 999999);
    assert_eq!(store.count(EntityType::Contact).await, 0);
}

#[tokio::test]
async fn test_invalid_email_is_400_validation_failed() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/companies",
        Some(json!({ "name": "Acme", "email": "invalid-email" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(body["details"]["field"], "email");
}

#[tokio::test]
async fn test_unknown_stage_is_rejected() {
    let (app, _) = app();
    let (_, contact_id, _, _) = seed(&app).await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/deals",
        Some(json!({
            "title": "X",
            "value": 1,
            "stage": "Closed",
            "contact_id": contact_id,
            "company_id": 1
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn test_out_of_range_or_string_value_is_rejected() {
    let (app, store) = app();
    let (_, contact_id, deal_id, _) = seed(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/deals",
        Some(json!({
            "title": "Too big",
            "value": 10000000000000.0,
            "stage": "New Lead",
            "contact_id": contact_id,
            "company_id": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(body["details"]["field"], "value");
    assert_eq!(store.count(EntityType::Deal).await, 1);

    let uri = format!("/api/v1/deals/{}", deal_id);
    let (status, body) = send(&app, Method::PATCH, &uri, Some(json!({ "value": "12.5" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");

    let (_, deal) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(deal["value"], json!(999999.99));
}

#[tokio::test]
async fn test_malformed_json_and_bad_id_are_400() {
    let (app, _) = app();

    let request = Request::builder()
        .uri("/api/v1/companies")
        .method(Method::POST)
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::GET, "/api/v1/companies/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_update_of_missing_record_is_404() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        Method::PATCH,
        "/api/v1/contacts/7",
        Some(json!({ "job_title": "CTO" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "ENTITY_NOT_FOUND");
}

#[tokio::test]
async fn test_storage_failure_is_500_without_internals() {
    let (app, store) = app();
    store.fail_on(StoreOp::Insert(EntityType::Task)).await;

    let (status, body) = send(&app, Method::POST, "/api/v1/tasks", Some(json!({ "title": "T" }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "DATABASE_ERROR");
    assert!(!body["message"].as_str().unwrap().contains("injected"));
}

// ============================================================================
// DELETES
// ============================================================================

#[tokio::test]
async fn test_company_delete_cascades_over_http() {
    let (app, _) = app();
    let (company_id, contact_id, deal_id, task_id) = seed(&app).await;

    let (status, outcome) = send(
        &app,
        Method::DELETE,
        &format!("/api/v1/companies/{}", company_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        outcome,
        json!({
            "success": true,
            "removed": true,
            "cascade": { "tasks_deleted": 1, "deals_deleted": 1, "contacts_detached": 1 }
        })
    );

    let (status, _) = send(&app, Method::GET, &format!("/api/v1/deals/{}", deal_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::GET, &format!("/api/v1/tasks/{}", task_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, contact) = send(&app, Method::GET, &format!("/api/v1/contacts/{}", contact_id), None).await;
    assert_eq!(contact["company_id"], Value::Null);
    assert_eq!(contact["first_name"], "Ada");
}

#[tokio::test]
async fn test_delete_semantics_differ_by_kind() {
    let (app, _) = app();

    let (status, body) = send(&app, Method::DELETE, "/api/v1/companies/5", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "ENTITY_NOT_FOUND");

    for uri in ["/api/v1/contacts/5", "/api/v1/deals/5", "/api/v1/tasks/5"] {
        let (status, body) = send(&app, Method::DELETE, uri, None).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(body, json!({ "success": true, "removed": false }));
    }
}

// ============================================================================
// HEALTH AND DOCS
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let (app, _) = app();

    let (status, body) = send(&app, Method::GET, "/health/ping", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());

    let (status, body) = send(&app, Method::GET, "/health/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let (app, _) = app();
    let (status, body) = send(&app, Method::GET, "/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/v1/companies/{id}"].is_object());
}
