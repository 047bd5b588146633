//! Handshake request and decision records.
//!
//! ## Response Shapes
//!
//! | Status | Tag | Body |
//! |--------|-----|------|
//! | 403 | `INTERCEPTED` | `node`, `error` |
//! | 410 | `TERMINATED` | `msg` |
//! | 401 | `FORBIDDEN` | `reason`, `log` |
//! | 200 | `DHARMA_SYNCHRONIZED` | `node`, `telemetry`, `astra_signature`, `shield_status` |

use serde::{Deserialize, Serialize};

/// Node label reported while the gateway refuses a caller.
pub const LOCKDOWN_NODE: &str = "LOCKDOWN";

/// Shield status reported on success.
pub const SHIELD_ACTIVE: &str = "LIVING_BORDER_ACTIVE";

/// Hash algorithm label reported in telemetry.
pub const PROTOCOL_LABEL: &str = "SHA3-KECCAK-512";

/// Simulated hardware reflex time in nanoseconds.
///
/// This is a fixed placeholder, not a measurement; no hardware timing
/// source exists behind it.
pub const SIMULATED_REFLEX_NS: f64 = 120.0;

/// Inbound handshake.
///
/// Every field tolerates absence or `null`; both read as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeRequest {
    /// Caller's candidate rotating code.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Physiological signal.
    #[serde(default)]
    pub eeg_state: Option<String>,
    /// Free-text mission intent.
    #[serde(default)]
    pub mental_intent: Option<String>,
}

impl HandshakeRequest {
    /// Build a request with all fields present.
    pub fn new(
        auth_token: impl Into<String>,
        eeg_state: impl Into<String>,
        mental_intent: impl Into<String>,
    ) -> Self {
        Self {
            auth_token: Some(auth_token.into()),
            eeg_state: Some(eeg_state.into()),
            mental_intent: Some(mental_intent.into()),
        }
    }

    /// Candidate token, empty if absent.
    pub fn auth_token(&self) -> &str {
        self.auth_token.as_deref().unwrap_or_default()
    }

    /// EEG signal, empty if absent.
    pub fn eeg_state(&self) -> &str {
        self.eeg_state.as_deref().unwrap_or_default()
    }

    /// Mission intent, empty if absent.
    pub fn mental_intent(&self) -> &str {
        self.mental_intent.as_deref().unwrap_or_default()
    }
}

/// Body of a 403 authentication rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterceptedBody {
    /// Always `INTERCEPTED`.
    pub status: String,
    /// Always `LOCKDOWN`.
    pub node: String,
    /// Rejection reason.
    pub error: String,
}

/// Body of a 410 distress termination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminatedBody {
    /// Always `TERMINATED`.
    pub status: String,
    /// Termination notice.
    pub msg: String,
}

/// Body of a 401 policy rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForbiddenBody {
    /// Always `FORBIDDEN`.
    pub status: String,
    /// Rejection reason.
    pub reason: String,
    /// Raw classifier text, kept for audit.
    pub log: String,
}

/// Processing telemetry attached to a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Telemetry {
    /// Elapsed pipeline time, milliseconds with 4 decimals.
    pub processing_latency_ms: String,
    /// Simulated reflex figure, 2 decimals. See [`SIMULATED_REFLEX_NS`].
    pub hardware_reflex_ns: String,
    /// Hash algorithm label.
    pub protocol: String,
}

/// Body of a 200 success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynchronizedBody {
    /// Always `DHARMA_SYNCHRONIZED`.
    pub status: String,
    /// Node identifier.
    pub node: String,
    /// Processing telemetry.
    pub telemetry: Telemetry,
    /// `ASTRA-` signature of the intent.
    pub astra_signature: String,
    /// Always `LIVING_BORDER_ACTIVE`.
    pub shield_status: String,
}

/// Outcome of one handshake, built fresh per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HandshakeDecision {
    /// Token mismatch.
    Intercepted(InterceptedBody),
    /// Operator distress; vault purged.
    Terminated(TerminatedBody),
    /// Intent rejected by the classifier.
    Forbidden(ForbiddenBody),
    /// All checks passed.
    Synchronized(SynchronizedBody),
}

impl HandshakeDecision {
    /// Authentication failure.
    pub fn intercepted() -> Self {
        Self::Intercepted(InterceptedBody {
            status: "INTERCEPTED".to_string(),
            node: LOCKDOWN_NODE.to_string(),
            error: "Quantum Token Mismatch".to_string(),
        })
    }

    /// Distress termination.
    pub fn terminated() -> Self {
        Self::Terminated(TerminatedBody {
            status: "TERMINATED".to_string(),
            msg: "Operator Distress Detected. Tactical Enclave Purged.".to_string(),
        })
    }

    /// Policy rejection carrying the classifier's raw text.
    pub fn forbidden(classifier_log: impl Into<String>) -> Self {
        Self::Forbidden(ForbiddenBody {
            status: "FORBIDDEN".to_string(),
            reason: "Intent violates Strategic Dharma".to_string(),
            log: classifier_log.into(),
        })
    }

    /// Success record.
    pub fn synchronized(node: impl Into<String>, latency_ms: f64, astra_signature: impl Into<String>) -> Self {
        Self::Synchronized(SynchronizedBody {
            status: "DHARMA_SYNCHRONIZED".to_string(),
            node: node.into(),
            telemetry: Telemetry {
                processing_latency_ms: format!("{:.4}", latency_ms),
                hardware_reflex_ns: format!("{:.2}", SIMULATED_REFLEX_NS),
                protocol: PROTOCOL_LABEL.to_string(),
            },
            astra_signature: astra_signature.into(),
            shield_status: SHIELD_ACTIVE.to_string(),
        })
    }

    /// HTTP-equivalent status code.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Intercepted(_) => 403,
            Self::Terminated(_) => 410,
            Self::Forbidden(_) => 401,
            Self::Synchronized(_) => 200,
        }
    }

    /// Status tag carried in the body.
    pub fn status_tag(&self) -> &str {
        match self {
            Self::Intercepted(b) => &b.status,
            Self::Terminated(b) => &b.status,
            Self::Forbidden(b) => &b.status,
            Self::Synchronized(b) => &b.status,
        }
    }

    /// Whether every stage passed.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Synchronized(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_missing_and_null_fields_read_empty() {
        let request: HandshakeRequest =
            serde_json::from_value(json!({"auth_token": null, "mental_intent": "x"})).unwrap();

        assert_eq!(request.auth_token(), "");
        assert_eq!(request.eeg_state(), "");
        assert_eq!(request.mental_intent(), "x");
    }

    #[test]
    fn test_intercepted_shape() {
        let decision = HandshakeDecision::intercepted();
        assert_eq!(decision.status_code(), 403);
        assert_eq!(
            serde_json::to_value(&decision).unwrap(),
            json!({"status": "INTERCEPTED", "node": "LOCKDOWN", "error": "Quantum Token Mismatch"})
        );
    }

    #[test]
    fn test_terminated_shape() {
        let decision = HandshakeDecision::terminated();
        assert_eq!(decision.status_code(), 410);
        assert_eq!(
            serde_json::to_value(&decision).unwrap(),
            json!({"status": "TERMINATED", "msg": "Operator Distress Detected. Tactical Enclave Purged."})
        );
    }

    #[test]
    fn test_forbidden_shape_carries_log() {
        let decision = HandshakeDecision::forbidden("ADHARMA_REJECT");
        assert_eq!(decision.status_code(), 401);
        let value = serde_json::to_value(&decision).unwrap();
        assert_eq!(value["status"], "FORBIDDEN");
        assert_eq!(value["log"], "ADHARMA_REJECT");
    }

    #[test]
    fn test_synchronized_formats_telemetry() {
        let decision = HandshakeDecision::synchronized("NODE-1", 1.234567, "ASTRA-ABC");
        assert_eq!(decision.status_code(), 200);
        assert!(decision.is_success());

        let value = serde_json::to_value(&decision).unwrap();
        assert_eq!(value["status"], "DHARMA_SYNCHRONIZED");
        assert_eq!(value["node"], "NODE-1");
        assert_eq!(value["telemetry"]["processing_latency_ms"], "1.2346");
        assert_eq!(value["telemetry"]["hardware_reflex_ns"], "120.00");
        assert_eq!(value["telemetry"]["protocol"], "SHA3-KECCAK-512");
        assert_eq!(value["astra_signature"], "ASTRA-ABC");
        assert_eq!(value["shield_status"], "LIVING_BORDER_ACTIVE");
    }
}
