//! Distress kill-switch.
//!
//! Only an exact match on the critical sentinel triggers the injected
//! [`SecurityAction`]. Empty, unknown, or differently-cased signals never
//! cause destructive action.

use std::sync::Arc;

use crate::vault::{SecurityAction, VaultError};

/// EEG signal value that triggers an immediate purge.
pub const STRESS_CRITICAL: &str = "STRESS_CRITICAL";

/// Outcome of a distress check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardVerdict {
    /// No distress detected; the pipeline proceeds.
    Continue,
    /// Distress detected; the protected state has been purged.
    Terminate,
}

/// Guard that purges protected state when the operator is in critical distress.
#[derive(Clone)]
pub struct DistressGuard {
    action: Arc<dyn SecurityAction>,
}

impl DistressGuard {
    /// Create a guard that invokes `action` on critical distress.
    pub fn new(action: Arc<dyn SecurityAction>) -> Self {
        Self { action }
    }

    /// Whether `eeg_state` is the critical sentinel that [`check`](Self::check) acts on.
    pub fn triggers(&self, eeg_state: &str) -> bool {
        eeg_state == STRESS_CRITICAL
    }

    /// Inspect an EEG signal.
    ///
    /// # Errors
    ///
    /// Returns the purge failure unchanged; a failed wipe is never masked.
    pub fn check(&self, eeg_state: &str) -> Result<GuardVerdict, VaultError> {
        if !self.triggers(eeg_state) {
            return Ok(GuardVerdict::Continue);
        }

        tracing::error!(
            eeg_state = %eeg_state,
            "SECURITY_INCIDENT: operator distress detected, purging vault"
        );
        self.action.purge()?;

        Ok(GuardVerdict::Terminate)
    }
}

impl std::fmt::Debug for DistressGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistressGuard").finish_non_exhaustive()
    }
}
