//! Property tests for the HTTP surface.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use crm_api::{app_state, create_api_router, ApiConfig};
use crm_test_utils::generators::{arb_deal_stage, arb_text_patch};
use crm_test_utils::{InMemoryStore, Patch};
use proptest::prelude::*;
use serde_json::{json, Map, Value};
use tokio::runtime::Runtime;
use tower::ServiceExt;

fn test_runtime() -> Result<Runtime, TestCaseError> {
    Runtime::new().map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

fn test_app() -> Router {
    create_api_router(
        app_state(Arc::new(InMemoryStore::new())),
        &ApiConfig::default(),
    )
}

async fn call(app: &Router, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .method(method)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

/// Render a tri-state into a JSON object entry: absent keys are left out.
fn put(body: &mut Map<String, Value>, key: &str, patch: &Patch<String>) {
    match patch {
        Patch::Absent => {}
        Patch::Null => {
            body.insert(key.to_string(), Value::Null);
        }
        Patch::Value(v) => {
            body.insert(key.to_string(), Value::String(v.clone()));
        }
    }
}

fn expected(original: &Value, patch: &Patch<String>) -> Value {
    match patch {
        Patch::Absent => original.clone(),
        Patch::Null => Value::Null,
        Patch::Value(v) => Value::String(v.clone()),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// A PATCH body touches exactly the keys it names.
    #[test]
    fn prop_patch_body_touches_only_named_keys(
        industry in arb_text_patch(),
        website in arb_text_patch(),
        phone in arb_text_patch(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let app = test_app();
            let (status, created) = call(&app, Method::POST, "/api/v1/companies", json!({
                "name": "Acme",
                "industry": "Tech",
                "website": "https://acme.example",
                "phone": "+1 555 0100",
                "address": "1 Main St"
            })).await;
            prop_assert_eq!(status, StatusCode::CREATED);

            let mut body = Map::new();
            put(&mut body, "industry", &industry);
            put(&mut body, "website", &website);
            put(&mut body, "phone", &phone);

            let (status, updated) =
                call(&app, Method::PATCH, "/api/v1/companies/1", Value::Object(body)).await;
            prop_assert_eq!(status, StatusCode::OK);
            prop_assert_eq!(&updated["industry"], &expected(&created["industry"], &industry));
            prop_assert_eq!(&updated["website"], &expected(&created["website"], &website));
            prop_assert_eq!(&updated["phone"], &expected(&created["phone"], &phone));
            prop_assert_eq!(&updated["address"], &created["address"]);
            prop_assert_eq!(&updated["name"], &created["name"]);
            Ok(())
        })?;
    }

    /// Deal values and stages survive the HTTP round trip.
    #[test]
    fn prop_deal_round_trips_over_http(cents in 0i64..=99_999_999, stage in arb_deal_stage()) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let app = test_app();
            call(&app, Method::POST, "/api/v1/companies", json!({ "name": "Acme" })).await;
            call(&app, Method::POST, "/api/v1/contacts",
                json!({ "first_name": "Ada", "last_name": "L", "company_id": 1 })).await;

            let wire_value = cents as f64 / 100.0;
            let (status, created) = call(&app, Method::POST, "/api/v1/deals", json!({
                "title": "Deal",
                "value": wire_value,
                "stage": stage,
                "contact_id": 1,
                "company_id": 1
            })).await;
            prop_assert_eq!(status, StatusCode::CREATED);
            prop_assert_eq!(&created["value"], &json!(wire_value));
            prop_assert_eq!(&created["stage"], &json!(stage));
            Ok(())
        })?;
    }
}
