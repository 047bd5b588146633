//! Astra signature synthesis.
//!
//! `signature = upper(hex(SHA3-256(intent)))[..24]`

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

/// Number of hex characters kept from the digest.
pub const SIGNATURE_LEN: usize = 24;

/// Prefix used when the signature is rendered on the wire.
pub const SIGNATURE_PREFIX: &str = "ASTRA";

/// A 24-character uppercase hex identifier derived from an intent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AstraSignature(String);

impl AstraSignature {
    /// The bare 24-character hex value (without prefix).
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AstraSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", SIGNATURE_PREFIX, self.0)
    }
}

/// Derive the signature for an intent. Empty intent is valid input.
pub fn synthesize(intent: &str) -> AstraSignature {
    let digest = Sha3_256::digest(intent.as_bytes());
    let mut hex = hex::encode_upper(digest);
    hex.truncate(SIGNATURE_LEN);
    AstraSignature(hex)
}
