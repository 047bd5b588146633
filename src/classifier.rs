//! Intent classification against an external inference service.
//!
//! ## Flow
//!
//! ```text
//! intent → prompt → InferenceBackend (bounded by timeout) → reply text → EthicsVerdict
//!                              │
//!                         any failure → FailurePolicy
//! ```
//!
//! ## Failure Policy
//!
//! | Policy | Backend failure | Use Case |
//! |--------|-----------------|----------|
//! | `FailOpen` (default) | `Cleared` | Availability first; matches historical behavior |
//! | `FailClosed` | `Rejected` | Strict deployments where an unreviewed intent must not pass |
//!
//! Failures never escape [`IntentClassifier::classify`]; the caller always
//! gets a verdict.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Marker whose presence anywhere in a reply (case-insensitive) rejects the intent.
pub const REJECTION_MARKER: &str = "ADHARMA";

/// Reply text assumed when the backend answers without a `response` field.
pub const DEFAULT_CLEARANCE: &str = "DHARMIC_CLEARANCE";

/// Report text recorded when the backend failed and the policy is fail-open.
pub const LOCAL_CLEARANCE: &str = "DHARMIC_CLEARANCE_LOCAL_VERIFIED";

/// Report text recorded when the backend failed and the policy is fail-closed.
pub const LOCAL_REJECTION: &str = "ADHARMA_REJECT_CLASSIFIER_UNAVAILABLE";

/// Default classifier timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default inference endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434/api/generate";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "llama3";

/// Error type for inference backend calls.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    /// Request could not be delivered (connection refused, DNS, reset).
    #[error("Inference endpoint unreachable: {0}")]
    Unreachable(String),

    /// Endpoint answered with a non-success status.
    #[error("Inference endpoint returned status {0}")]
    Status(u16),

    /// Reply body was not the expected JSON shape.
    #[error("Malformed inference reply: {0}")]
    Malformed(String),

    /// No reply within the configured timeout.
    #[error("Inference call timed out after {0:?}")]
    Timeout(Duration),
}

/// Binary ethics verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EthicsVerdict {
    /// Intent may proceed.
    Cleared,
    /// Intent violates policy.
    Rejected,
}

impl EthicsVerdict {
    /// Reduce free-text classifier output to a verdict.
    pub fn from_reply(reply: &str) -> Self {
        if reply.to_uppercase().contains(REJECTION_MARKER) {
            Self::Rejected
        } else {
            Self::Cleared
        }
    }
}

impl std::fmt::Display for EthicsVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cleared => write!(f, "CLEARED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// What to do when the inference backend cannot produce an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Treat the intent as cleared.
    #[default]
    FailOpen,
    /// Treat the intent as rejected.
    FailClosed,
}

impl FailurePolicy {
    /// Parse `open` / `closed` (also accepts `fail_open` / `fail_closed`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" | "fail_open" | "fail-open" => Some(Self::FailOpen),
            "closed" | "fail_closed" | "fail-closed" => Some(Self::FailClosed),
            _ => None,
        }
    }

    fn fallback(&self) -> (EthicsVerdict, &'static str) {
        match self {
            Self::FailOpen => (EthicsVerdict::Cleared, LOCAL_CLEARANCE),
            Self::FailClosed => (EthicsVerdict::Rejected, LOCAL_REJECTION),
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FailOpen => write!(f, "fail_open"),
            Self::FailClosed => write!(f, "fail_closed"),
        }
    }
}

/// Result of classifying one intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierOutcome {
    /// Binary verdict.
    pub verdict: EthicsVerdict,
    /// Raw classifier text (or the local fallback text), kept for audit.
    pub report: String,
    /// True when the verdict came from the failure policy rather than the backend.
    pub degraded: bool,
}

/// An external text-generation service.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Send a prompt and return the generated text.
    async fn generate(&self, prompt: &str) -> Result<String, ClassifierError>;
}

/// Build the evaluation prompt for an intent. The intent is embedded verbatim.
pub fn build_prompt(intent: &str) -> String {
    format!(
        "Analyze the following tactical intent based on the Bhagavad Gita's principles \
         of Righteous Defense (Dharma): '{intent}'. \
         Is this action for protection or selfish aggression? \
         Respond ONLY with 'DHARMIC_CLEARANCE' or 'ADHARMA_REJECT'."
    )
}

/// Classifies mission intents through an [`InferenceBackend`].
#[derive(Clone)]
pub struct IntentClassifier {
    backend: Arc<dyn InferenceBackend>,
    timeout: Duration,
    policy: FailurePolicy,
}

impl IntentClassifier {
    /// Create a classifier with the default timeout and fail-open policy.
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self {
            backend,
            timeout: DEFAULT_TIMEOUT,
            policy: FailurePolicy::default(),
        }
    }

    /// Override the call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the failure policy.
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Configured failure policy.
    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Classify an intent. Never fails; backend errors map through the policy.
    pub async fn classify(&self, intent: &str) -> ClassifierOutcome {
        let prompt = build_prompt(intent);

        let reply = match tokio::time::timeout(self.timeout, self.backend.generate(&prompt)).await {
            Ok(result) => result,
            Err(_) => Err(ClassifierError::Timeout(self.timeout)),
        };

        match reply {
            Ok(report) => {
                let verdict = EthicsVerdict::from_reply(&report);
                tracing::info!(
                    target: "handshake_gateway::metrics",
                    metric_type = "classifier",
                    verdict = %verdict,
                    degraded = false,
                    "classifier_metric"
                );
                ClassifierOutcome { verdict, report, degraded: false }
            }
            Err(e) => {
                let (verdict, report) = self.policy.fallback();
                tracing::warn!(
                    error = %e,
                    policy = %self.policy,
                    verdict = %verdict,
                    "Intent classifier unavailable, applying failure policy"
                );
                ClassifierOutcome {
                    verdict,
                    report: report.to_string(),
                    degraded: true,
                }
            }
        }
    }
}

impl std::fmt::Debug for IntentClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentClassifier")
            .field("timeout", &self.timeout)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Ollama-compatible HTTP backend
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

/// Backend speaking the Ollama `/api/generate` protocol.
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaBackend {
    /// Create a backend for `endpoint` using `model`.
    ///
    /// The HTTP client carries its own `timeout` so a stalled socket is
    /// dropped even without the classifier's outer bound.
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifierError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
        })
    }

    /// Endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl InferenceBackend for OllamaBackend {
    async fn generate(&self, prompt: &str) -> Result<String, ClassifierError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| ClassifierError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifierError::Status(status.as_u16()));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::Malformed(e.to_string()))?;

        Ok(body.response.unwrap_or_else(|| DEFAULT_CLEARANCE.to_string()))
    }
}

// ============================================================================
// Scripted backend (tests and offline runs)
// ============================================================================

/// Backend that returns a fixed reply or failure and counts invocations.
#[derive(Debug)]
pub struct ScriptedBackend {
    reply: Result<String, String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    /// Always answer with `reply`.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always fail as if the endpoint were unreachable.
    pub fn unreachable() -> Self {
        Self {
            reply: Err("connection refused".to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `generate` calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceBackend for ScriptedBackend {
    async fn generate(&self, _prompt: &str) -> Result<String, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply
            .clone()
            .map_err(ClassifierError::Unreachable)
    }
}
