use sha2::{Digest, Sha256};

/// Header carrying the rebuild webhook's shared secret.
pub const SECRET_TOKEN_HEADER: &str = "x-secret-token";

/// Authentication configuration resolved from config file and environment.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Shared webhook secret. None = webhook reports a configuration error.
    pub webhook_secret: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Compare a presented token against the configured secret.
///
/// Both sides are hashed first so the comparison runs over fixed-length
/// digests regardless of the presented length.
pub fn verify_shared_secret(provided: Option<&str>, secret: &str) -> bool {
    let Some(provided) = provided else {
        return false;
    };
    let presented = Sha256::digest(provided.as_bytes());
    let expected = Sha256::digest(secret.as_bytes());
    presented
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
