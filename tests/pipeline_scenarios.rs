//! End-to-end pipeline scenarios.
//!
//! These tests run the full pipeline against a real on-disk vault and a
//! scripted inference backend.

use std::sync::Arc;

use handshake_gateway::{
    Clock, DistressGuard, FixedClock, GatewayPipeline, HandshakeDecision, HandshakeRequest,
    IntentClassifier, RotatingCredential, ScriptedBackend, Vault, FailurePolicy,
};
use tempfile::TempDir;

/// Test mantra for scenario tests
const TEST_MANTRA: &[u8] = b"test_mantra_for_scenarios";

/// 2023-11-14T22:13:20Z
const NOW: i64 = 1_700_000_000;

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

struct Gateway {
    _dir: TempDir,
    vault: Arc<Vault>,
    backend: Arc<ScriptedBackend>,
    pipeline: GatewayPipeline,
    token: String,
}

fn gateway_with_policy(backend: ScriptedBackend, policy: FailurePolicy) -> Gateway {
    let dir = tempfile::tempdir().expect("tempdir");
    let vault = Arc::new(Vault::new(dir.path().join("tactical_enclave")));
    vault.ensure().unwrap();

    let backend = Arc::new(backend);
    let credential = RotatingCredential::new(TEST_MANTRA);
    let clock = FixedClock::at_unix(NOW);
    let token = credential.expected_code(clock.now()).to_string();

    let pipeline = GatewayPipeline::new(
        "ANS-TEST-NODE",
        credential,
        Arc::new(clock),
        DistressGuard::new(vault.clone()),
        IntentClassifier::new(backend.clone()).with_policy(policy),
    );

    Gateway { _dir: dir, vault, backend, pipeline, token }
}

fn gateway(backend: ScriptedBackend) -> Gateway {
    gateway_with_policy(backend, FailurePolicy::FailOpen)
}

fn stock_vault(vault: &Vault) {
    std::fs::write(vault.root().join("mission_orders.txt"), b"classified").unwrap();
    let nested = vault.root().join("maps");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::write(nested.join("sector.bin"), [7u8; 32]).unwrap();
}

fn is_upper_hex(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_a_valid_handshake_with_classifier_offline() {
    let gw = gateway(ScriptedBackend::unreachable());
    stock_vault(&gw.vault);

    let request = HandshakeRequest::new(gw.token.clone(), "NORMAL", "defend the border");
    let decision = gw.pipeline.run(&request).await.unwrap();

    assert_eq!(decision.status_code(), 200);
    let HandshakeDecision::Synchronized(body) = decision else {
        panic!("expected success");
    };

    assert_eq!(body.status, "DHARMA_SYNCHRONIZED");
    assert_eq!(body.node, "ANS-TEST-NODE");
    let suffix = body.astra_signature.strip_prefix("ASTRA-").expect("prefix");
    assert_eq!(suffix.len(), 24);
    assert!(is_upper_hex(suffix));

    let latency: f64 = body.telemetry.processing_latency_ms.parse().unwrap();
    assert!(latency >= 0.0);
    assert_eq!(body.telemetry.processing_latency_ms.split('.').nth(1).unwrap().len(), 4);

    // Vault untouched
    assert!(gw.vault.root().join("mission_orders.txt").exists());
    assert_eq!(gw.backend.calls(), 1);
}

#[tokio::test]
async fn scenario_b_invalid_token_short_circuits() {
    let gw = gateway(ScriptedBackend::replying("DHARMIC_CLEARANCE"));
    stock_vault(&gw.vault);

    for eeg in ["NORMAL", "STRESS_CRITICAL", ""] {
        let request = HandshakeRequest::new("not-the-token", eeg, "defend the border");
        let decision = gw.pipeline.run(&request).await.unwrap();
        assert_eq!(decision, HandshakeDecision::intercepted());
    }

    assert!(gw.vault.root().join("mission_orders.txt").exists());
    assert!(gw.vault.root().join("maps").join("sector.bin").exists());
    assert_eq!(gw.backend.calls(), 0);
}

#[tokio::test]
async fn scenario_c_distress_purges_vault() {
    let gw = gateway(ScriptedBackend::replying("DHARMIC_CLEARANCE"));
    stock_vault(&gw.vault);

    let request = HandshakeRequest::new(gw.token.clone(), "STRESS_CRITICAL", "defend the border");
    let decision = gw.pipeline.run(&request).await.unwrap();

    assert_eq!(decision.status_code(), 410);
    assert_eq!(decision, HandshakeDecision::terminated());
    assert!(gw.vault.exists());
    assert!(gw.vault.is_empty());
    assert_eq!(gw.backend.calls(), 0);
}

#[tokio::test]
async fn distress_lookalikes_leave_vault_untouched() {
    let gw = gateway(ScriptedBackend::replying("DHARMIC_CLEARANCE"));
    stock_vault(&gw.vault);

    for eeg in [Some("stress_critical"), Some(""), None, Some("Stress_Critical")] {
        let request = HandshakeRequest {
            auth_token: Some(gw.token.clone()),
            eeg_state: eeg.map(str::to_string),
            mental_intent: Some("patrol".to_string()),
        };
        let decision = gw.pipeline.run(&request).await.unwrap();
        assert!(decision.is_success(), "eeg {:?} should pass", eeg);
    }

    assert!(gw.vault.root().join("mission_orders.txt").exists());
}

#[tokio::test]
async fn rejection_marker_anywhere_forbids() {
    let reply = "Considering the scriptures, this is Adharma_Reject: selfish aggression.";
    let gw = gateway(ScriptedBackend::replying(reply));

    let request = HandshakeRequest::new(gw.token.clone(), "NORMAL", "annex the valley");
    let decision = gw.pipeline.run(&request).await.unwrap();

    assert_eq!(decision.status_code(), 401);
    let HandshakeDecision::Forbidden(body) = decision else {
        panic!("expected rejection");
    };
    assert_eq!(body.log, reply);
    assert_eq!(body.reason, "Intent violates Strategic Dharma");
}

#[tokio::test]
async fn fail_closed_policy_rejects_when_classifier_offline() {
    let gw = gateway_with_policy(ScriptedBackend::unreachable(), FailurePolicy::FailClosed);

    let request = HandshakeRequest::new(gw.token.clone(), "NORMAL", "defend the border");
    let decision = gw.pipeline.run(&request).await.unwrap();

    assert_eq!(decision.status_code(), 401);
}

#[tokio::test]
async fn same_intent_same_signature_across_requests() {
    let gw = gateway(ScriptedBackend::replying("DHARMIC_CLEARANCE"));
    let request = HandshakeRequest::new(gw.token.clone(), "NORMAL", "hold the pass");

    let first = gw.pipeline.run(&request).await.unwrap();
    let second = gw.pipeline.run(&request).await.unwrap();

    match (first, second) {
        (HandshakeDecision::Synchronized(a), HandshakeDecision::Synchronized(b)) => {
            assert_eq!(a.astra_signature, b.astra_signature);
        }
        other => panic!("expected two successes, got {:?}", other),
    }
}

#[tokio::test]
async fn token_from_previous_window_is_rejected() {
    let gw = gateway(ScriptedBackend::replying("DHARMIC_CLEARANCE"));
    let credential = RotatingCredential::new(TEST_MANTRA);
    let stale = credential
        .expected_code(FixedClock::at_unix(NOW - 30).now())
        .to_string();

    let request = HandshakeRequest::new(stale, "NORMAL", "defend the border");
    let decision = gw.pipeline.run(&request).await.unwrap();

    assert_eq!(decision.status_code(), 403);
}
