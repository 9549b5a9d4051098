use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroizing;

use super::key::{KeyOptions, SymmetricKey};
use super::{KEY_LEN, MIN_SALT_LEN, PBKDF2_ITERATIONS};
use crate::error::{CipherError, Result};

/// PBKDF2-HMAC-SHA256 parameters.
///
/// The iteration count may be raised above [`PBKDF2_ITERATIONS`] but never
/// lowered below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: PBKDF2_ITERATIONS,
        }
    }
}

impl KdfParams {
    pub fn new(iterations: u32) -> Result<Self> {
        let params = Self { iterations };
        params.validate()?;
        Ok(params)
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations < PBKDF2_ITERATIONS {
            return Err(CipherError::KeyDerivationFailed(format!(
                "pbkdf2 iterations must be >= {PBKDF2_ITERATIONS}, got {}",
                self.iterations
            )));
        }
        Ok(())
    }
}

/// Stretch `secret` into 256 bits of AES key material.
///
/// Recomputed on every call.
pub fn derive_key_bytes(
    secret: &[u8],
    salt: &[u8],
    kdf: KdfParams,
) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    kdf.validate()?;

    if secret.is_empty() {
        return Err(CipherError::KeyDerivationFailed(
            "secret must not be empty".into(),
        ));
    }
    if salt.len() < MIN_SALT_LEN {
        return Err(CipherError::KeyDerivationFailed(format!(
            "salt must be at least {MIN_SALT_LEN} bytes, got {}",
            salt.len()
        )));
    }

    debug!(
        iterations = kdf.iterations,
        salt_len = salt.len(),
        "deriving key with pbkdf2-sha256"
    );

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(secret, salt, kdf.iterations, &mut key[..]);

    Ok(key)
}

/// Derive an AES-GCM key from `secret` and `salt`.
pub fn derive_key(
    secret: &[u8],
    salt: &[u8],
    options: KeyOptions,
    kdf: KdfParams,
) -> Result<SymmetricKey> {
    if options.usages.is_empty() {
        return Err(CipherError::KeyDerivationFailed(
            "derived key must allow at least one usage".into(),
        ));
    }

    let material = derive_key_bytes(secret, salt, kdf)?;
    SymmetricKey::new(material, options.extractable, options.usages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kdf_is_deterministic() {
        let salt = [42u8; 16];
        let kdf = KdfParams::default();

        let k1 = derive_key_bytes(b"password", &salt, kdf).unwrap();
        let k2 = derive_key_bytes(b"password", &salt, kdf).unwrap();

        assert_eq!(*k1, *k2);
    }

    #[test]
    fn salt_affects_output() {
        let kdf = KdfParams::default();

        let k1 = derive_key_bytes(b"pw", &[7u8; 16], kdf).unwrap();
        let k2 = derive_key_bytes(b"pw", &[8u8; 16], kdf).unwrap();

        assert_ne!(*k1, *k2);
    }

    #[test]
    fn rfc7914_pbkdf2_sha256_vector() {
        // RFC 7914 §11, c = 1 vector prefix
        let mut out = [0u8; 32];
        pbkdf2_hmac::<Sha256>(b"passwd", b"salt", 1, &mut out);
        assert_eq!(out[..8], [0x55, 0xac, 0x04, 0x6e, 0x56, 0xe3, 0x08, 0x9f]);
    }

    #[test]
    fn matches_webcrypto_derivation() {
        use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

        let key = derive_key_bytes(
            b"correct horse battery staple",
            &[1u8; 16],
            KdfParams::default(),
        )
        .unwrap();

        assert_eq!(
            URL_SAFE_NO_PAD.encode(*key),
            "_mM53S0u71ahrkl7KznOjgGitOMCY3njRcgv3Cka6Go"
        );
    }

    #[test]
    fn iterations_cannot_be_lowered() {
        assert!(KdfParams::new(PBKDF2_ITERATIONS - 1).is_err());
        assert!(KdfParams::new(1).is_err());
        assert_eq!(
            KdfParams::new(PBKDF2_ITERATIONS + 1).unwrap().iterations(),
            PBKDF2_ITERATIONS + 1
        );
    }

    #[test]
    fn empty_secret_rejected() {
        assert!(matches!(
            derive_key_bytes(b"", &[1u8; 16], KdfParams::default()),
            Err(CipherError::KeyDerivationFailed(_))
        ));
    }

    #[test]
    fn short_salt_rejected() {
        assert!(matches!(
            derive_key_bytes(b"pw", &[1u8; MIN_SALT_LEN - 1], KdfParams::default()),
            Err(CipherError::KeyDerivationFailed(_))
        ));
    }

    #[test]
    fn derived_key_keeps_options() {
        let opts = KeyOptions::default().extractable(true);
        let key = derive_key(b"pw", &[3u8; 16], opts, KdfParams::default()).unwrap();
        assert!(key.extractable());
        assert_eq!(key.usages(), opts.usages);
    }
}
