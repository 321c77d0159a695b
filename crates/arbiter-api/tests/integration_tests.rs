//! # Integration Tests for arbiter-api
//!
//! Drives the assembled router end to end: health probes, advisory
//! recommendations with automatic escalation, review resolution, bearer
//! authentication and scopes, compliance checks, audit trails, and metrics.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use arbiter_api::config::AppConfig;
use arbiter_api::state::AppState;

const SECRET: &str = "s3cret";

/// Helper: build the test app with auth disabled.
fn test_app() -> axum::Router {
    arbiter_api::app(AppState::default())
}

/// Helper: build the test app with bearer auth enabled.
fn test_app_with_auth(secret: &str) -> axum::Router {
    let config = AppConfig {
        auth_token: Some(secret.to_string()),
        ..AppConfig::default()
    };
    arbiter_api::app(AppState::new(config))
}

/// Helper: read response body as string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::http::Response<Body>) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

fn post_json(uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn advisory_request(id: &str, tier: u8) -> Value {
    json!({
        "correlation_id": id,
        "idempotency_key": format!("idem-{id}"),
        "submitter_id": "a".repeat(64),
        "request_type": "escrow_release",
        "priority": "medium",
        "timeout_ms": 2000,
        "payload": {
            "risk": { "amount_tier": tier },
            "compliance": {
                "sanctions": "clear",
                "risk_profile": "low",
                "verification": "standard",
                "amount_tier": tier
            }
        }
    })
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let response = test_app().oneshot(get("/health/liveness", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let response = test_app().oneshot(get("/health/readiness", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

#[tokio::test]
async fn test_health_needs_no_token() {
    let app = test_app_with_auth(SECRET);
    let response = app.oneshot(get("/health/liveness", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// -- Advisory -----------------------------------------------------------------

#[tokio::test]
async fn test_low_tier_auto_executes() {
    let app = test_app();
    let response = app
        .oneshot(post_json("/v1/advisory/recommend", &advisory_request("adv-1", 1), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["disposition"], "auto_execute");
    assert_eq!(body["replayed"], false);
    assert_eq!(body["advisory"]["combined"]["recommendation"]["type"], "proceed");
    assert_eq!(body["advisory"]["fallback_used"], false);
    assert!(body.get("approval").is_none());
}

#[tokio::test]
async fn test_high_tier_requires_approval() {
    let app = test_app();
    let response = app
        .clone()
        .oneshot(post_json("/v1/advisory/recommend", &advisory_request("adv-2", 5), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["disposition"], "requires_approval");
    assert_eq!(body["approval"]["correlation_id"], "adv-2");
    assert_eq!(body["approval"]["status"], "pending");
    assert!(body["approval"]["sla_expires_at"].is_string());

    let response = app.oneshot(get("/v1/hil/requests", None)).await.unwrap();
    let pending = body_json(response).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);
    assert_eq!(pending[0]["correlation_id"], "adv-2");
}

#[tokio::test]
async fn test_replay_returns_same_approval() {
    let app = test_app();
    let req = advisory_request("adv-3", 5);
    let first = body_json(
        app.clone()
            .oneshot(post_json("/v1/advisory/recommend", &req, None))
            .await
            .unwrap(),
    )
    .await;
    let second = body_json(
        app.clone()
            .oneshot(post_json("/v1/advisory/recommend", &req, None))
            .await
            .unwrap(),
    )
    .await;

    assert_eq!(second["replayed"], true);
    assert_eq!(first["advisory"], second["advisory"]);
    assert_eq!(second["approval"]["correlation_id"], "adv-3");

    let metrics = body_json(app.oneshot(get("/v1/hil/metrics", None)).await.unwrap()).await;
    assert_eq!(metrics["submitted"], 1);
}

#[tokio::test]
async fn test_missing_advisory_data_goes_to_review() {
    let app = test_app();
    let mut req = advisory_request("adv-4", 1);
    req["payload"] = json!({});
    let response = app
        .oneshot(post_json("/v1/advisory/recommend", &req, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["advisory"]["combined"]["recommendation"]["type"], "review");
    assert_eq!(body["disposition"], "requires_approval");
    assert_eq!(body["approval"]["trigger"], "low_confidence");
}

#[tokio::test]
async fn test_fallback_endpoint_never_queues() {
    let app = test_app();
    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/advisory/recommend/fallback",
            &advisory_request("adv-5", 5),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["fallback_used"], true);
    assert!(body["risk_assessment"].is_null());

    let pending = body_json(app.oneshot(get("/v1/hil/requests", None)).await.unwrap()).await;
    assert!(pending.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_tier_is_bad_request() {
    let mut req = advisory_request("adv-6", 1);
    req["payload"]["risk"]["amount_tier"] = json!(9);
    let response = test_app()
        .oneshot(post_json("/v1/advisory/recommend", &req, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_timeout_out_of_range_is_unprocessable() {
    let mut req = advisory_request("adv-7", 1);
    req["timeout_ms"] = json!(0);
    let response = test_app()
        .oneshot(post_json("/v1/advisory/recommend", &req, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/v1/advisory/recommend")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// -- Human-in-the-Loop --------------------------------------------------------

#[tokio::test]
async fn test_resolve_flow() {
    let app = test_app();
    app.clone()
        .oneshot(post_json("/v1/advisory/recommend", &advisory_request("hil-1", 5), None))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/hil/requests/hil-1/resolve",
            &json!({ "action": { "type": "approve" }, "reasoning": "documents checked" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = body_json(response).await;
    assert_eq!(outcome["correlation_id"], "hil-1");
    assert_eq!(outcome["final_recommendation"]["type"], "execute_original");
    assert_eq!(outcome["approver"], "local-admin");
    assert_eq!(outcome["sla_compliant"], true);

    let detail = body_json(
        app.clone()
            .oneshot(get("/v1/hil/requests/hil-1", None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(detail["status"], "resolved");

    let metrics = body_json(app.oneshot(get("/v1/hil/metrics", None)).await.unwrap()).await;
    assert_eq!(metrics["resolved"], 1);
    assert_eq!(metrics["pending"], 0);
    assert_eq!(metrics["sla_compliant"], 1);
}

#[tokio::test]
async fn test_deny_blocks() {
    let app = test_app();
    app.clone()
        .oneshot(post_json("/v1/advisory/recommend", &advisory_request("hil-2", 5), None))
        .await
        .unwrap();
    let response = app
        .oneshot(post_json(
            "/v1/hil/requests/hil-2/resolve",
            &json!({ "action": { "type": "deny" }, "reasoning": "counterparty unknown" }),
            None,
        ))
        .await
        .unwrap();
    let outcome = body_json(response).await;
    assert_eq!(outcome["final_recommendation"]["type"], "block");
}

#[tokio::test]
async fn test_duplicate_resolve_conflicts() {
    let app = test_app();
    app.clone()
        .oneshot(post_json("/v1/advisory/recommend", &advisory_request("hil-3", 5), None))
        .await
        .unwrap();
    let approve = json!({ "action": { "type": "approve" } });
    let first = app
        .clone()
        .oneshot(post_json("/v1/hil/requests/hil-3/resolve", &approve, None))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let second = app
        .oneshot(post_json("/v1/hil/requests/hil-3/resolve", &approve, None))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unknown_request_not_found() {
    let app = test_app();
    let response = app
        .clone()
        .oneshot(get("/v1/hil/requests/nope", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(post_json(
            "/v1/hil/requests/nope/resolve",
            &json!({ "action": { "type": "approve" } }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_escalate_without_reason_unprocessable() {
    let response = test_app()
        .oneshot(post_json(
            "/v1/hil/requests/any/resolve",
            &json!({ "action": { "type": "escalate", "to": "legal", "reason": "" } }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_sweep_with_nothing_overdue() {
    let app = test_app();
    app.clone()
        .oneshot(post_json("/v1/advisory/recommend", &advisory_request("hil-4", 5), None))
        .await
        .unwrap();
    let response = app
        .oneshot(post_json("/v1/hil/sweep", &json!({}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["expired"].as_array().unwrap().is_empty());
}

// -- Authentication -----------------------------------------------------------

#[tokio::test]
async fn test_missing_token_unauthorized() {
    let app = test_app_with_auth(SECRET);
    let response = app
        .oneshot(post_json("/v1/advisory/recommend", &advisory_request("auth-1", 1), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_secret_unauthorized() {
    let app = test_app_with_auth(SECRET);
    let response = app
        .oneshot(get("/v1/hil/requests", Some("admin:ops:wrong")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_submitter_cannot_resolve() {
    let app = test_app_with_auth(SECRET);
    let submitter = format!("submitter:svc-escrow:{SECRET}");
    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/advisory/recommend",
            &advisory_request("auth-2", 5),
            Some(&submitter),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json(
            "/v1/hil/requests/auth-2/resolve",
            &json!({ "action": { "type": "approve" } }),
            Some(&submitter),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_approver_cannot_sign_for_someone_else() {
    let app = test_app_with_auth(SECRET);
    let approver = format!("approver:alice:{SECRET}");
    app.clone()
        .oneshot(post_json(
            "/v1/advisory/recommend",
            &advisory_request("auth-3", 5),
            Some(&approver),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/hil/requests/auth-3/resolve",
            &json!({ "action": { "type": "approve" }, "approver": "bob" }),
            Some(&approver),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(post_json(
            "/v1/hil/requests/auth-3/resolve",
            &json!({ "action": { "type": "approve" } }),
            Some(&approver),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["approver"], "alice");
}

#[tokio::test]
async fn test_sweep_requires_admin() {
    let app = test_app_with_auth(SECRET);
    let approver = format!("approver:alice:{SECRET}");
    let response = app
        .clone()
        .oneshot(post_json("/v1/hil/sweep", &json!({}), Some(&approver)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = format!("admin:ops:{SECRET}");
    let response = app
        .oneshot(post_json("/v1/hil/sweep", &json!({}), Some(&admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// -- Compliance ---------------------------------------------------------------

#[tokio::test]
async fn test_compliance_check_generates_correlation_id() {
    let body = json!({
        "request": {
            "sanctions": "clear",
            "risk_profile": "low",
            "verification": "standard",
            "amount_tier": 1
        }
    });
    let response = test_app()
        .oneshot(post_json("/v1/compliance/check", &body, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(!body["correlation_id"].as_str().unwrap().is_empty());
    assert_eq!(body["result"]["recommendation"]["decision"], "approve");
    assert_eq!(body["result"]["fallback_used"], false);
}

#[tokio::test]
async fn test_compliance_fallback_rejects_sanctioned() {
    let body = json!({
        "correlation_id": "cmp-1",
        "request": {
            "sanctions": "blocked",
            "risk_profile": "low",
            "verification": "standard",
            "amount_tier": 1
        }
    });
    let response = test_app()
        .oneshot(post_json("/v1/compliance/check/fallback", &body, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["correlation_id"], "cmp-1");
    assert_eq!(body["result"]["recommendation"]["decision"], "reject");
    assert_eq!(body["result"]["fallback_used"], true);
}

// -- Audit and Metrics --------------------------------------------------------

#[tokio::test]
async fn test_audit_trail_records_pipeline() {
    let app = test_app();
    app.clone()
        .oneshot(post_json("/v1/advisory/recommend", &advisory_request("aud-1", 5), None))
        .await
        .unwrap();

    let response = app.oneshot(get("/v1/audit/aud-1", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["correlation_id"], "aud-1");

    let entries = body["entries"].as_array().unwrap();
    let actions: Vec<&str> = entries
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions.first(), Some(&"advisory_requested"));
    assert!(actions.contains(&"recommendation_combined"));
    assert!(actions.contains(&"approval_submitted"));
    for entry in entries {
        assert_eq!(entry["digest"].as_str().unwrap().len(), 64);
        assert_eq!(entry["action_by"], "local-admin");
    }
}

#[tokio::test]
async fn test_audit_trail_unknown_id_not_found() {
    let response = test_app()
        .oneshot(get("/v1/audit/never-seen", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_http_metrics_count_requests() {
    let app = test_app();
    app.clone()
        .oneshot(get("/v1/hil/requests/missing", None))
        .await
        .unwrap();
    let response = app.oneshot(get("/v1/metrics/http", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["requests"].as_u64().unwrap() >= 1);
    assert!(body["client_errors"].as_u64().unwrap() >= 1);
}
