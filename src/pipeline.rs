//! The handshake decision pipeline.
//!
//! ## Stage Order
//!
//! ```text
//! auth → distress → ethics → signature
//!  403      410       401      200
//! ```
//!
//! Stages run strictly in this order and the first halting stage wins, even
//! when a later stage would also fail. The order encodes security priority:
//! identity before biometrics before intent before telemetry. It is held as
//! an explicit list of [`Stage`] handlers so it can be inspected with
//! [`GatewayPipeline::stage_names`].

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use crate::classifier::{
    ClassifierError, EthicsVerdict, FailurePolicy, IntentClassifier, OllamaBackend,
};
use crate::config::GatewayConfig;
use crate::credential::{Clock, RotatingCredential, SystemClock};
use crate::decision::{HandshakeDecision, HandshakeRequest};
use crate::guard::{DistressGuard, GuardVerdict};
use crate::signature::synthesize;
use crate::vault::{SecurityAction, VaultError};

/// Canonical stage order, including the terminal signature stage.
pub const STAGE_ORDER: [&str; 4] = ["auth", "distress", "ethics", "signature"];

/// Name of the terminal stage that assembles the success record.
pub const SIGNATURE_STAGE: &str = "signature";

/// Error type for pipeline runs.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Vault purge failed; the wipe cannot be confirmed.
    #[error("Vault purge failed: {0}")]
    Storage(#[from] VaultError),

    /// The blocking purge task was cancelled or panicked; the wipe cannot be confirmed.
    #[error("Vault purge did not complete: {0}")]
    Interrupted(#[from] tokio::task::JoinError),
}

/// Result of evaluating one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Proceed to the next stage.
    Continue,
    /// Stop and return this decision.
    Halt(HandshakeDecision),
}

/// One check in the pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stable stage name used in logs and ordering checks.
    fn name(&self) -> &'static str;

    /// Evaluate the request.
    async fn evaluate(&self, request: &HandshakeRequest) -> Result<StageOutcome, PipelineError>;
}

/// Rotating-token authentication.
pub struct AuthStage {
    credential: RotatingCredential,
    clock: Arc<dyn Clock>,
}

impl AuthStage {
    /// Create the stage over a credential and clock.
    pub fn new(credential: RotatingCredential, clock: Arc<dyn Clock>) -> Self {
        Self { credential, clock }
    }
}

#[async_trait]
impl Stage for AuthStage {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn evaluate(&self, request: &HandshakeRequest) -> Result<StageOutcome, PipelineError> {
        if self.credential.verify(request.auth_token(), self.clock.now()) {
            Ok(StageOutcome::Continue)
        } else {
            tracing::warn!("Rotating token mismatch, handshake intercepted");
            Ok(StageOutcome::Halt(HandshakeDecision::intercepted()))
        }
    }
}

/// Physiological kill-switch.
pub struct DistressStage {
    guard: DistressGuard,
}

impl DistressStage {
    /// Create the stage around a guard.
    pub fn new(guard: DistressGuard) -> Self {
        Self { guard }
    }
}

#[async_trait]
impl Stage for DistressStage {
    fn name(&self) -> &'static str {
        "distress"
    }

    async fn evaluate(&self, request: &HandshakeRequest) -> Result<StageOutcome, PipelineError> {
        if !self.guard.triggers(request.eeg_state()) {
            return Ok(StageOutcome::Continue);
        }

        // Purge walks the filesystem under a lock; keep it off the async workers
        let guard = self.guard.clone();
        let eeg_state = request.eeg_state().to_string();
        let verdict = tokio::task::spawn_blocking(move || guard.check(&eeg_state)).await??;

        match verdict {
            GuardVerdict::Continue => Ok(StageOutcome::Continue),
            GuardVerdict::Terminate => Ok(StageOutcome::Halt(HandshakeDecision::terminated())),
        }
    }
}

/// Intent classification.
pub struct EthicsStage {
    classifier: IntentClassifier,
}

impl EthicsStage {
    /// Create the stage around a classifier.
    pub fn new(classifier: IntentClassifier) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl Stage for EthicsStage {
    fn name(&self) -> &'static str {
        "ethics"
    }

    async fn evaluate(&self, request: &HandshakeRequest) -> Result<StageOutcome, PipelineError> {
        let outcome = self.classifier.classify(request.mental_intent()).await;

        match outcome.verdict {
            EthicsVerdict::Cleared => Ok(StageOutcome::Continue),
            EthicsVerdict::Rejected => {
                tracing::warn!(
                    classifier_log = %outcome.report,
                    degraded = outcome.degraded,
                    "Intent rejected by classifier"
                );
                Ok(StageOutcome::Halt(HandshakeDecision::forbidden(outcome.report)))
            }
        }
    }
}

/// Ordered stage runner producing a [`HandshakeDecision`].
pub struct GatewayPipeline {
    node_id: String,
    stages: Vec<Box<dyn Stage>>,
    failure_policy: Option<FailurePolicy>,
}

impl GatewayPipeline {
    /// Build the standard auth → distress → ethics pipeline.
    pub fn new(
        node_id: impl Into<String>,
        credential: RotatingCredential,
        clock: Arc<dyn Clock>,
        guard: DistressGuard,
        classifier: IntentClassifier,
    ) -> Self {
        let failure_policy = classifier.policy();
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(AuthStage::new(credential, clock)),
            Box::new(DistressStage::new(guard)),
            Box::new(EthicsStage::new(classifier)),
        ];
        Self {
            failure_policy: Some(failure_policy),
            ..Self::with_stages(node_id, stages)
        }
    }

    /// Build a pipeline from an explicit stage list. The signature stage is always last.
    pub fn with_stages(node_id: impl Into<String>, stages: Vec<Box<dyn Stage>>) -> Self {
        Self {
            node_id: node_id.into(),
            stages,
            failure_policy: None,
        }
    }

    /// Wire the standard pipeline from configuration.
    ///
    /// Uses the system clock and an HTTP inference backend.
    ///
    /// # Errors
    ///
    /// Fails only if the HTTP client for the backend cannot be built.
    pub fn from_config(
        config: &GatewayConfig,
        action: Arc<dyn SecurityAction>,
    ) -> Result<Self, ClassifierError> {
        let backend = OllamaBackend::new(
            config.classifier_url.clone(),
            config.classifier_model.clone(),
            config.classifier_timeout,
        )?;
        let classifier = IntentClassifier::new(Arc::new(backend))
            .with_timeout(config.classifier_timeout)
            .with_policy(config.failure_policy);

        Ok(Self::new(
            config.node_id.clone(),
            RotatingCredential::new(config.mantra.clone()),
            Arc::new(SystemClock),
            DistressGuard::new(action),
            classifier,
        ))
    }

    /// Node identifier reported on success.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Classifier failure policy of the standard pipeline; `None` for a custom stage list.
    pub fn failure_policy(&self) -> Option<FailurePolicy> {
        self.failure_policy
    }

    /// Stage names in execution order, ending with the signature stage.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages
            .iter()
            .map(|s| s.name())
            .chain(std::iter::once(SIGNATURE_STAGE))
            .collect()
    }

    /// Run one handshake.
    ///
    /// # Errors
    ///
    /// Only a failed or interrupted vault purge aborts the run; every other
    /// outcome is a [`HandshakeDecision`].
    pub async fn run(&self, request: &HandshakeRequest) -> Result<HandshakeDecision, PipelineError> {
        let start = Instant::now();

        for stage in &self.stages {
            match stage.evaluate(request).await {
                Ok(StageOutcome::Continue) => record_stage_outcome(stage.name(), "pass"),
                Ok(StageOutcome::Halt(decision)) => {
                    record_stage_outcome(stage.name(), "halt");
                    return Ok(decision);
                }
                Err(e) => {
                    record_stage_outcome(stage.name(), "error");
                    tracing::error!(stage = stage.name(), error = %e, "Pipeline stage failed");
                    return Err(e);
                }
            }
        }

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        let signature = synthesize(request.mental_intent());
        record_stage_outcome(SIGNATURE_STAGE, "pass");

        Ok(HandshakeDecision::synchronized(
            self.node_id.as_str(),
            latency_ms,
            signature.to_string(),
        ))
    }
}

impl std::fmt::Debug for GatewayPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayPipeline")
            .field("node_id", &self.node_id)
            .field("stages", &self.stage_names())
            .field("failure_policy", &self.failure_policy)
            .finish()
    }
}

/// Record a stage outcome metric.
fn record_stage_outcome(stage: &str, outcome: &str) {
    tracing::info!(
        target: "handshake_gateway::metrics",
        metric_type = "stage",
        stage = stage,
        outcome = outcome,
        "stage_metric"
    );
}
