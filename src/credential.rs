//! Rotating shared-secret credentials.
//!
//! ## Security Model
//!
//! The expected code is computed as:
//!
//! ```text
//! window = floor(unix_seconds / 30)
//! code   = hex(HMAC-SHA3-512(mantra, decimal(window)))
//! ```
//!
//! Anyone holding the mantra can predict the code for any window; without
//! the mantra the code cannot be forged. The window value itself never
//! leaves this module.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha3::Sha3_512;
use subtle::ConstantTimeEq;

/// Length of one credential window in seconds.
pub const WINDOW_SECONDS: i64 = 30;

/// Source of wall-clock time for credential derivation.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a single instant (for tests and replay).
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Freeze the clock at the given unix timestamp (seconds).
    pub fn at_unix(seconds: i64) -> Self {
        Self(DateTime::<Utc>::from_timestamp(seconds, 0).unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A rotating authentication code (128 lowercase hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RotatingCode(String);

impl RotatingCode {
    /// Get the code as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison against a caller-supplied candidate.
    ///
    /// A candidate of a different length is rejected without inspecting
    /// its contents.
    pub fn matches(&self, candidate: &str) -> bool {
        self.0.len() == candidate.len()
            && bool::from(self.0.as_bytes().ct_eq(candidate.as_bytes()))
    }
}

impl std::fmt::Display for RotatingCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derives and verifies time-windowed codes from a shared mantra.
#[derive(Clone)]
pub struct RotatingCredential {
    mantra: Vec<u8>,
}

impl RotatingCredential {
    /// Create a credential over the given shared secret.
    pub fn new(mantra: impl Into<Vec<u8>>) -> Self {
        Self { mantra: mantra.into() }
    }

    /// Window index for an instant.
    fn window(now: DateTime<Utc>) -> i64 {
        now.timestamp().div_euclid(WINDOW_SECONDS)
    }

    /// Compute the code a legitimate caller must present at `now`.
    pub fn expected_code(&self, now: DateTime<Utc>) -> RotatingCode {
        let mut mac = Hmac::<Sha3_512>::new_from_slice(&self.mantra)
            .expect("HMAC accepts any key size");
        mac.update(Self::window(now).to_string().as_bytes());

        RotatingCode(hex::encode(mac.finalize().into_bytes()))
    }

    /// Verify a presented token against the code for `now`.
    pub fn verify(&self, candidate: &str, now: DateTime<Utc>) -> bool {
        self.expected_code(now).matches(candidate)
    }
}

impl std::fmt::Debug for RotatingCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatingCredential")
            .field("mantra", &"<redacted>")
            .finish()
    }
}
