use sha2::{Digest, Sha256};

/// One-way function applied to passwords before they are stored or compared
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> String;
}

/// Hex-encoded SHA-256 of the password
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl CredentialHasher for Sha256Hasher {
    fn hash(&self, password: &str) -> String {
        let digest = Sha256::digest(password.as_bytes());
        hex::encode(digest)
    }
}
