//! # handshake-gateway
//!
//! A single-endpoint gatekeeper that runs every inbound handshake through a
//! fixed sequence of checks.
//!
//! ## Core Contract
//!
//! 1. Verify the caller's rotating token (HMAC-SHA3-512 over a 30-second window)
//! 2. Purge the vault and terminate if the operator signals critical distress
//! 3. Ask an external classifier whether the mission intent is acceptable
//! 4. Sign the intent and report processing telemetry
//!
//! ## Architecture
//!
//! ```text
//! HandshakeRequest → auth → distress → ethics → signature → HandshakeDecision
//!                              ↓          ↓
//!                        SecurityAction  InferenceBackend
//!                          (Vault)       (Ollama / scripted)
//! ```
//!
//! ## Failure Posture
//!
//! - Authentication and distress checks fail closed
//! - The classifier fails open by default (configurable via [`FailurePolicy`])
//! - A failed vault purge is never masked

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classifier;
pub mod config;
pub mod credential;
pub mod decision;
pub mod guard;
pub mod pipeline;
pub mod signature;
pub mod vault;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use classifier::{
    ClassifierError, ClassifierOutcome, EthicsVerdict, FailurePolicy, InferenceBackend,
    IntentClassifier, OllamaBackend, ScriptedBackend,
};
pub use config::{ConfigError, GatewayConfig};
pub use credential::{Clock, FixedClock, RotatingCode, RotatingCredential, SystemClock};
pub use decision::{HandshakeDecision, HandshakeRequest, Telemetry};
pub use guard::{DistressGuard, GuardVerdict, STRESS_CRITICAL};
pub use pipeline::{GatewayPipeline, PipelineError, Stage, StageOutcome, STAGE_ORDER};
pub use signature::{synthesize, AstraSignature};
pub use vault::{SecurityAction, Vault, VaultError};

// Service re-exports (when service feature is enabled)
#[cfg(feature = "service")]
pub use service::{create_router, ServiceState};
