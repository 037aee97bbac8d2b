//! Ingestion credential generation and hashing.
//!
//! Every ingestion endpoint requires a pre-shared API key carrying the
//! capability scope for that path. Keys are random alphanumeric strings;
//! only the SHA-256 digest is stored, plus a short prefix for human
//! identification. This module lives in `core` (zero internal deps) so both
//! the API layer and any provisioning tooling can use it.

use rand::Rng;
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Length of the generated API key string (alphanumeric characters).
pub const KEY_LENGTH: usize = 48;

/// Number of leading characters stored as a human-visible prefix.
pub const KEY_PREFIX_LENGTH: usize = 8;

// ---------------------------------------------------------------------------
// Capability scopes
// ---------------------------------------------------------------------------

/// Capability scope names carried by ingestion credentials.
pub mod scopes {
    /// Push ping-style samples and single-entity status updates.
    pub const INGEST_SAMPLES: &str = "ingest:samples";
    /// Push vendor alarm snapshots.
    pub const INGEST_ALARMS: &str = "ingest:alarms";
    /// Query entity status.
    pub const READ_STATUS: &str = "read:status";
}

// ---------------------------------------------------------------------------
// Key generation
// ---------------------------------------------------------------------------

/// The result of generating a new API key.
pub struct GeneratedApiKey {
    /// The plaintext key (shown to the operator exactly once, never stored).
    pub plaintext: String,
    /// The first [`KEY_PREFIX_LENGTH`] characters of the key for display.
    pub prefix: String,
    /// The SHA-256 hex digest of the plaintext key (stored in the database).
    pub hash: String,
}

/// Generate a new random API key.
pub fn generate_api_key() -> GeneratedApiKey {
    let key: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(KEY_LENGTH)
        .map(char::from)
        .collect();

    let prefix = key[..KEY_PREFIX_LENGTH].to_string();
    let hash = hash_api_key(&key);

    GeneratedApiKey {
        plaintext: key,
        prefix,
        hash,
    }
}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Compute the SHA-256 hex digest of an API key.
///
/// Used both during key creation (to store the hash) and during
/// authentication (to look up the key by hash).
pub fn hash_api_key(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
