//! Gateway configuration.
//!
//! ## Environment
//!
//! | Variable | Default |
//! |----------|---------|
//! | `GATEWAY_NODE_ID` | `ANS-OMEGA-CORE-01` |
//! | `GATEWAY_VAULT_PATH` | `./tactical_enclave` |
//! | `GATEWAY_MANTRA` | development secret (warns) |
//! | `CLASSIFIER_URL` | `http://localhost:11434/api/generate` |
//! | `CLASSIFIER_MODEL` | `llama3` |
//! | `CLASSIFIER_TIMEOUT_MS` | `2000` |
//! | `CLASSIFIER_FAILURE_POLICY` | `open` |
//! | `HOST` | `127.0.0.1` |
//! | `PORT` | `9000` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::classifier::{FailurePolicy, DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TIMEOUT};

/// Default node identifier.
pub const DEFAULT_NODE_ID: &str = "ANS-OMEGA-CORE-01";

/// Default vault location.
pub const DEFAULT_VAULT_PATH: &str = "./tactical_enclave";

/// Loopback-only default bind host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default bind port.
pub const DEFAULT_PORT: u16 = 9000;

const DEVELOPMENT_MANTRA: &str = "development_only_mantra_not_for_production";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Process-wide settings injected into the pipeline at construction.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Node identifier reported on success.
    pub node_id: String,
    /// Vault root directory.
    pub vault_path: PathBuf,
    /// Shared secret for rotating credentials.
    pub mantra: Vec<u8>,
    /// Inference endpoint URL.
    pub classifier_url: String,
    /// Inference model identifier.
    pub classifier_model: String,
    /// Bound on one classifier call.
    pub classifier_timeout: Duration,
    /// Behavior when the classifier is unavailable.
    pub failure_policy: FailurePolicy,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            node_id: DEFAULT_NODE_ID.to_string(),
            vault_path: PathBuf::from(DEFAULT_VAULT_PATH),
            mantra: DEVELOPMENT_MANTRA.as_bytes().to_vec(),
            classifier_url: DEFAULT_ENDPOINT.to_string(),
            classifier_model: DEFAULT_MODEL.to_string(),
            classifier_timeout: DEFAULT_TIMEOUT,
            failure_policy: FailurePolicy::default(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let mantra = match get("GATEWAY_MANTRA") {
            Some(m) => m.into_bytes(),
            None => {
                tracing::warn!(
                    "GATEWAY_MANTRA not set or empty. Using development secret. \
                     This is a SECURITY RISK in production!"
                );
                defaults.mantra
            }
        };

        let classifier_timeout = match get("CLASSIFIER_TIMEOUT_MS") {
            Some(raw) => {
                let ms: u64 = raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                    ConfigError::Invalid {
                        key: "CLASSIFIER_TIMEOUT_MS",
                        value: raw.clone(),
                        reason: e.to_string(),
                    }
                })?;
                if ms == 0 {
                    return Err(ConfigError::Invalid {
                        key: "CLASSIFIER_TIMEOUT_MS",
                        value: raw,
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Duration::from_millis(ms)
            }
            None => defaults.classifier_timeout,
        };

        let failure_policy = match get("CLASSIFIER_FAILURE_POLICY") {
            Some(raw) => FailurePolicy::parse(&raw).ok_or_else(|| ConfigError::Invalid {
                key: "CLASSIFIER_FAILURE_POLICY",
                value: raw.clone(),
                reason: "expected \"open\" or \"closed\"".to_string(),
            })?,
            None => defaults.failure_policy,
        };

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Invalid {
                    key: "PORT",
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => defaults.port,
        };

        Ok(Self {
            node_id: get("GATEWAY_NODE_ID").unwrap_or(defaults.node_id),
            vault_path: get("GATEWAY_VAULT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.vault_path),
            mantra,
            classifier_url: get("CLASSIFIER_URL").unwrap_or(defaults.classifier_url),
            classifier_model: get("CLASSIFIER_MODEL").unwrap_or(defaults.classifier_model),
            classifier_timeout,
            failure_policy,
            host: get("HOST").unwrap_or(defaults.host),
            port,
        })
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
            key: "HOST",
            value: raw.clone(),
            reason: e.to_string(),
        })
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("node_id", &self.node_id)
            .field("vault_path", &self.vault_path)
            .field("mantra", &"<redacted>")
            .field("classifier_url", &self.classifier_url)
            .field("classifier_model", &self.classifier_model)
            .field("classifier_timeout", &self.classifier_timeout)
            .field("failure_policy", &self.failure_policy)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}
