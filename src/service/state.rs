//! Service state management.
//!
//! Holds the shared pipeline and the vault it protects.

use std::sync::Arc;

use crate::classifier::{ClassifierError, FailurePolicy};
use crate::config::GatewayConfig;
use crate::pipeline::GatewayPipeline;
use crate::vault::Vault;

/// Shared service state.
///
/// Everything inside is read-only after startup; cloning is cheap.
#[derive(Clone)]
pub struct ServiceState {
    /// The handshake pipeline.
    pub pipeline: Arc<GatewayPipeline>,
    /// The vault purged on operator distress.
    pub vault: Arc<Vault>,
}

impl ServiceState {
    /// Create service state from a pre-built pipeline and its vault.
    pub fn new(pipeline: GatewayPipeline, vault: Arc<Vault>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            vault,
        }
    }

    /// Create service state from configuration.
    ///
    /// Builds the vault handle and wires it into the pipeline as the
    /// distress guard's security action. Does not create the vault.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ClassifierError> {
        let vault = Arc::new(Vault::new(config.vault_path.clone()));
        let pipeline = GatewayPipeline::from_config(config, vault.clone())?;

        Ok(Self::new(pipeline, vault))
    }

    /// Classifier failure policy, reported by the health endpoint.
    pub fn failure_policy(&self) -> Option<FailurePolicy> {
        self.pipeline.failure_policy()
    }
}
