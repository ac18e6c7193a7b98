mod guard;

pub use guard::*;

/// Header carrying the shared secret on write requests.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Decides whether a presented API key grants write access.
pub trait KeyVerifier: Send + Sync {
    fn verify(&self, presented: &str) -> bool;
}

/// A single shared secret, compared verbatim.
pub struct StaticKey {
    secret: String,
}

impl StaticKey {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl KeyVerifier for StaticKey {
    fn verify(&self, presented: &str) -> bool {
        presented == self.secret
    }
}
