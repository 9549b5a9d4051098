use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = CipherError> = std::result::Result<T, E>;

/// Every way an envelope or key operation can fail.
///
/// Kinds are kept distinct so callers can tell corruption apart from tamper
/// evidence and from misconfiguration. Surfaces exposed to untrusted peers
/// should render errors through [`CipherError::redacted`] instead of
/// `Display`.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The envelope framing could not be parsed (truncated or corrupt input).
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(&'static str),

    /// The AEAD tag did not verify: wrong key, or nonce/ciphertext tampered.
    #[error("authentication failed: wrong key or tampered data")]
    AuthenticationFailed,

    /// The key may not be used for the requested operation, or the cipher
    /// rejected it.
    #[error("cipher operation failed: {0}")]
    CipherOperationFailed(String),

    /// Export was requested for a key created non-extractable.
    #[error("key is not extractable")]
    KeyNotExtractable,

    /// An imported key representation is malformed or incompatible.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// The KDF rejected its inputs.
    #[error("key derivation failed: {0}")]
    KeyDerivationFailed(String),
}

impl CipherError {
    /// `true` for the two failures a decrypting peer could use as an oracle.
    pub fn is_decryption_failure(&self) -> bool {
        matches!(
            self,
            CipherError::MalformedEnvelope(_) | CipherError::AuthenticationFailed
        )
    }

    /// Message safe to show across a trust boundary.
    ///
    /// Malformed framing and authentication failures collapse into one
    /// string; every other kind renders as usual.
    pub fn redacted(&self) -> String {
        if self.is_decryption_failure() {
            "decryption failed".to_string()
        } else {
            self.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decryption_failures_are_grouped() {
        assert!(CipherError::MalformedEnvelope("x").is_decryption_failure());
        assert!(CipherError::AuthenticationFailed.is_decryption_failure());
        assert!(!CipherError::KeyNotExtractable.is_decryption_failure());
        assert!(!CipherError::CipherOperationFailed("x".into()).is_decryption_failure());
    }

    #[test]
    fn redacted_hides_framing_detail() {
        let malformed = CipherError::MalformedEnvelope("trailing bytes after ciphertext");
        let auth = CipherError::AuthenticationFailed;

        assert_eq!(malformed.redacted(), auth.redacted());
        assert!(malformed.to_string().contains("trailing bytes"));
    }

    #[test]
    fn redacted_keeps_configuration_errors() {
        let e = CipherError::CipherOperationFailed("key lacks 'encrypt' usage".into());
        assert!(e.redacted().contains("encrypt"));
    }
}
