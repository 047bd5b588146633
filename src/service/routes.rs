//! Axum routes for the handshake gateway.

use axum::{
    body::Bytes,
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decision::{HandshakeDecision, HandshakeRequest};
use crate::pipeline::PipelineError;

use super::middleware::record_handshake;
use super::state::ServiceState;

/// Handshake endpoint path.
pub const HANDSHAKE_PATH: &str = "/ans/handshake";

// ============================================================================
// Response Types
// ============================================================================

/// Structured error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status tag, present for pipeline faults.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code.
    pub code: String,
}

impl ErrorResponse {
    /// Create a new error response with code and message.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: None,
            error: error.into(),
            code: code.into(),
        }
    }

    /// Attach a status tag.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

/// Service health response (detailed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Node identifier reported on success.
    pub node: String,
    /// Stage names in execution order.
    pub stages: Vec<String>,
    /// Classifier failure policy, `null` for a custom stage list.
    pub classifier_failure_policy: Option<String>,
    /// Whether the vault root exists.
    pub vault_ready: bool,
}

/// Simple liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    /// Always `alive`.
    pub status: String,
}

/// Readiness response with dependency status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Whether the service can take handshakes.
    pub ready: bool,
    /// Whether the vault root exists.
    pub vault: bool,
    /// Reason when not ready.
    pub details: Option<String>,
}

impl IntoResponse for HandshakeDecision {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let code = match &self {
            PipelineError::Storage(_) => "VAULT_PURGE_FAILED",
            PipelineError::Interrupted(_) => "VAULT_PURGE_INTERRUPTED",
        };
        tracing::error!(code = code, error = %self, "Handshake pipeline fault");

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(code, self.to_string()).with_status("FAULT")),
        )
            .into_response()
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Run one handshake through the pipeline.
///
/// The body is parsed by hand so malformed input still gets a JSON error
/// rather than a plain-text extractor rejection.
async fn handshake_handler(State(state): State<ServiceState>, body: Bytes) -> Response {
    let request = match parse_handshake(&body) {
        Ok(request) => request,
        Err(reason) => {
            tracing::warn!(error = %reason, "Rejected malformed handshake body");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(
                    "INVALID_REQUEST",
                    format!("Handshake body must be a JSON object: {}", reason),
                )),
            )
                .into_response();
        }
    };

    match state.pipeline.run(&request).await {
        Ok(decision) => {
            record_handshake(decision.status_tag(), decision.status_code());
            decision.into_response()
        }
        Err(e) => {
            record_handshake("FAULT", StatusCode::INTERNAL_SERVER_ERROR.as_u16());
            e.into_response()
        }
    }
}

/// Decode a handshake body, accepting only a JSON object.
///
/// Derived struct deserialization would also take a JSON array and fill the
/// fields by position, so the shape is checked on the untyped value first.
fn parse_handshake(body: &[u8]) -> Result<HandshakeRequest, String> {
    let value: Value = serde_json::from_slice(body).map_err(|e| e.to_string())?;
    if !value.is_object() {
        return Err(format!("expected object, found {}", json_kind(&value)));
    }
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Health check endpoint (detailed).
async fn health_handler(State(state): State<ServiceState>) -> Json<HealthResponse> {
    let vault_ready = state.vault.exists();

    Json(HealthResponse {
        status: if vault_ready { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        node: state.pipeline.node_id().to_string(),
        stages: state
            .pipeline
            .stage_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
        classifier_failure_policy: state.failure_policy().map(|p| p.to_string()),
        vault_ready,
    })
}

/// Liveness probe endpoint. Does NOT check dependencies.
async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 200 if the vault root exists, 503 otherwise.
async fn readiness_handler(
    State(state): State<ServiceState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    if state.vault.exists() {
        Ok(Json(ReadinessResponse {
            ready: true,
            vault: true,
            details: None,
        }))
    } else {
        Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                ready: false,
                vault: false,
                details: Some(format!("Vault missing at {}", state.vault.root().display())),
            }),
        ))
    }
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the handshake gateway.
pub fn create_router(state: ServiceState) -> Router {
    Router::new()
        .route(HANDSHAKE_PATH, post(handshake_handler))
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .with_state(state)
}
