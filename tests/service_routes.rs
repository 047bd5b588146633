//! HTTP surface tests for the handshake service.

#![cfg(feature = "service")]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use handshake_gateway::{
    create_router, Clock, DistressGuard, FixedClock, GatewayPipeline, IntentClassifier,
    RotatingCredential, ScriptedBackend, ServiceState, Vault,
};

const TEST_MANTRA: &[u8] = b"test_mantra_for_service_routes";
const NOW: i64 = 1_700_000_000;

struct App {
    _dir: TempDir,
    router: Router,
    vault: Arc<Vault>,
    backend: Arc<ScriptedBackend>,
    token: String,
}

fn app(backend: ScriptedBackend) -> App {
    let dir = tempfile::tempdir().expect("tempdir");
    let vault = Arc::new(Vault::new(dir.path().join("enclave")));
    vault.ensure().unwrap();

    let backend = Arc::new(backend);
    let credential = RotatingCredential::new(TEST_MANTRA);
    let clock = FixedClock::at_unix(NOW);
    let token = credential.expected_code(clock.now()).to_string();

    let pipeline = GatewayPipeline::new(
        "ANS-ROUTE-NODE",
        credential,
        Arc::new(clock),
        DistressGuard::new(vault.clone()),
        IntentClassifier::new(backend.clone()),
    );
    let router = create_router(ServiceState::new(pipeline, vault.clone()));

    App { _dir: dir, router, vault, backend, token }
}

async fn post_handshake(router: &Router, body: impl Into<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/ans/handshake")
                .header("content-type", "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_success_response_shape() {
    let app = app(ScriptedBackend::unreachable());
    let body = json!({
        "auth_token": app.token,
        "eeg_state": "NORMAL",
        "mental_intent": "defend the border",
    });

    let (status, value) = post_handshake(&app.router, body.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["status"], "DHARMA_SYNCHRONIZED");
    assert_eq!(value["node"], "ANS-ROUTE-NODE");
    assert_eq!(value["telemetry"]["hardware_reflex_ns"], "120.00");
    assert_eq!(value["telemetry"]["protocol"], "SHA3-KECCAK-512");
    assert_eq!(value["shield_status"], "LIVING_BORDER_ACTIVE");
    assert!(value["astra_signature"].as_str().unwrap().starts_with("ASTRA-"));
    assert!(value["telemetry"]["processing_latency_ms"].is_string());
}

#[tokio::test]
async fn test_token_mismatch_is_403() {
    let app = app(ScriptedBackend::replying("DHARMIC_CLEARANCE"));
    let body = json!({"auth_token": "wrong", "eeg_state": "STRESS_CRITICAL", "mental_intent": "x"});

    let (status, value) = post_handshake(&app.router, body.to_string()).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        value,
        json!({"status": "INTERCEPTED", "node": "LOCKDOWN", "error": "Quantum Token Mismatch"})
    );
    assert_eq!(app.backend.calls(), 0);
}

#[tokio::test]
async fn test_distress_is_410_and_purges() {
    let app = app(ScriptedBackend::replying("DHARMIC_CLEARANCE"));
    std::fs::write(app.vault.root().join("secret.txt"), b"data").unwrap();
    let body = json!({"auth_token": app.token, "eeg_state": "STRESS_CRITICAL", "mental_intent": "x"});

    let (status, value) = post_handshake(&app.router, body.to_string()).await;

    assert_eq!(status, StatusCode::GONE);
    assert_eq!(value["status"], "TERMINATED");
    assert!(app.vault.is_empty());
}

#[tokio::test]
async fn test_policy_rejection_is_401_with_log() {
    let app = app(ScriptedBackend::replying("ADHARMA_REJECT"));
    let body = json!({"auth_token": app.token, "eeg_state": "NORMAL", "mental_intent": "raid"});

    let (status, value) = post_handshake(&app.router, body.to_string()).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        value,
        json!({
            "status": "FORBIDDEN",
            "reason": "Intent violates Strategic Dharma",
            "log": "ADHARMA_REJECT",
        })
    );
}

#[tokio::test]
async fn test_empty_object_is_403_not_crash() {
    let app = app(ScriptedBackend::replying("DHARMIC_CLEARANCE"));
    let (status, value) = post_handshake(&app.router, "{}").await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(value["status"], "INTERCEPTED");
}

#[tokio::test]
async fn test_malformed_body_is_json_400() {
    let app = app(ScriptedBackend::replying("DHARMIC_CLEARANCE"));
    let (status, value) = post_handshake(&app.router, "not json").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_array_bodies_are_400_and_never_purge() {
    let app = app(ScriptedBackend::replying("DHARMIC_CLEARANCE"));
    std::fs::write(app.vault.root().join("secret.txt"), b"data").unwrap();

    let (status, value) = post_handshake(&app.router, "[]").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["code"], "INVALID_REQUEST");

    let positional = json!([app.token, "STRESS_CRITICAL", "x"]);
    let (status, value) = post_handshake(&app.router, positional.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["code"], "INVALID_REQUEST");

    assert!(!app.vault.is_empty());
    assert_eq!(app.backend.calls(), 0);
}

#[tokio::test]
async fn test_scalar_and_mistyped_bodies_are_400() {
    let app = app(ScriptedBackend::replying("DHARMIC_CLEARANCE"));

    for body in ["null", "42", "\"STRESS_CRITICAL\"", r#"{"auth_token": 7}"#] {
        let (status, value) = post_handshake(&app.router, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(value["code"], "INVALID_REQUEST", "{body}");
    }
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = app(ScriptedBackend::replying("DHARMIC_CLEARANCE"));

    let (status, live) = get_json(&app.router, "/health/live").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(live["status"], "alive");

    let (status, ready) = get_json(&app.router, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ready["ready"], true);

    let (status, health) = get_json(&app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["node"], "ANS-ROUTE-NODE");
    assert_eq!(health["stages"], json!(["auth", "distress", "ethics", "signature"]));
    assert_eq!(health["classifier_failure_policy"], "fail_open");
}

#[tokio::test]
async fn test_readiness_fails_without_vault() {
    let app = app(ScriptedBackend::replying("DHARMIC_CLEARANCE"));
    std::fs::remove_dir_all(app.vault.root()).unwrap();

    let (status, ready) = get_json(&app.router, "/health/ready").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(ready["ready"], false);
}
