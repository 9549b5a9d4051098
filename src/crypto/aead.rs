use aes_gcm::{
    AesGcm, Key, Nonce,
    aead::{Aead, KeyInit, consts::U16},
    aes::Aes256,
};
use getrandom::fill;
use tracing::{trace, warn};
use zeroize::Zeroizing;

use super::NONCE_LEN;
use super::key::{KeyUsage, SymmetricKey};
use crate::error::{CipherError, Result};
use crate::format::Envelope;

/// AES-256-GCM with a 128-bit nonce.
///
/// Non-96-bit nonces are run through GHASH to form the initial counter block,
/// the same construction WebCrypto applies to a 16-byte `iv`.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Fill buffer with cryptographically secure random bytes
pub(crate) fn secure_random(buf: &mut [u8]) -> Result<()> {
    fill(buf).map_err(|e| {
        CipherError::CipherOperationFailed(format!("OS random generator unavailable: {e}"))
    })
}

/// Generate a fresh random nonce
pub fn generate_nonce() -> Result<[u8; NONCE_LEN]> {
    let mut nonce = [0u8; NONCE_LEN];
    secure_random(&mut nonce)?;
    Ok(nonce)
}

fn build_cipher(key: &SymmetricKey) -> Aes256Gcm16 {
    Aes256Gcm16::new(Key::<Aes256Gcm16>::from_slice(key.material()))
}

/// Encrypt plaintext under a fresh random nonce.
///
/// Nonces are 128 random bits. Collisions become plausible only after
/// roughly 2^48 messages under one key; rotate keys well before that.
pub fn seal(key: &SymmetricKey, plaintext: &[u8]) -> Result<Envelope> {
    seal_with_nonce(key, generate_nonce()?, plaintext)
}

/// Nonce must never repeat under the same key.
pub(crate) fn seal_with_nonce(
    key: &SymmetricKey,
    nonce: [u8; NONCE_LEN],
    plaintext: &[u8],
) -> Result<Envelope> {
    key.require(KeyUsage::Encrypt)?;

    let cipher = build_cipher(key);

    let ciphertext = cipher
        .encrypt(Nonce::<U16>::from_slice(&nonce), plaintext)
        .map_err(|_| CipherError::CipherOperationFailed("encryption failed".into()))?;

    trace!(
        plaintext_len = plaintext.len(),
        ciphertext_len = ciphertext.len(),
        "sealed envelope"
    );

    Ok(Envelope::new(nonce, ciphertext))
}

/// Verify and decrypt an envelope.
///
/// Nothing is returned unless the tag verifies.
pub fn open(key: &SymmetricKey, envelope: &Envelope) -> Result<Zeroizing<Vec<u8>>> {
    key.require(KeyUsage::Decrypt)?;

    let cipher = build_cipher(key);

    let plaintext = cipher
        .decrypt(Nonce::<U16>::from_slice(envelope.nonce()), envelope.ciphertext())
        .map_err(|_| {
            warn!(
                ciphertext_len = envelope.ciphertext().len(),
                "envelope failed authentication"
            );
            CipherError::AuthenticationFailed
        })?;

    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::key::{KeyOptions, KeyUsages};
    use crate::crypto::{KEY_LEN, TAG_LEN};
    use std::collections::HashSet;

    fn key_with(usages: KeyUsages) -> SymmetricKey {
        let mut raw = [0u8; KEY_LEN];
        secure_random(&mut raw).unwrap();
        SymmetricKey::from_raw(&raw, KeyOptions::default().usages(usages)).unwrap()
    }

    #[test]
    fn seal_open_roundtrip() {
        let key = key_with(KeyUsages::ALL);
        let env = seal(&key, b"secret data").unwrap();
        assert_eq!(*open(&key, &env).unwrap(), b"secret data");
    }

    #[test]
    fn ciphertext_carries_tag() {
        let key = key_with(KeyUsages::ALL);
        let env = seal(&key, b"").unwrap();
        assert_eq!(env.ciphertext().len(), TAG_LEN);
        assert!(open(&key, &env).unwrap().is_empty());
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let env = seal(&key_with(KeyUsages::ALL), b"secret").unwrap();
        assert!(matches!(
            open(&key_with(KeyUsages::ALL), &env),
            Err(CipherError::AuthenticationFailed)
        ));
    }

    #[test]
    fn tampered_nonce_fails_authentication() {
        let key = key_with(KeyUsages::ALL);
        let (mut nonce, ciphertext) = seal(&key, b"secret").unwrap().into_parts();
        nonce[3] ^= 0x10;
        assert!(matches!(
            open(&key, &Envelope::new(nonce, ciphertext)),
            Err(CipherError::AuthenticationFailed)
        ));
    }

    #[test]
    fn usage_is_checked_before_cipher() {
        let decrypt_only = key_with(KeyUsages::DECRYPT);
        assert!(matches!(
            seal(&decrypt_only, b"x"),
            Err(CipherError::CipherOperationFailed(_))
        ));

        let encrypt_only = key_with(KeyUsages::ENCRYPT);
        let env = seal(&encrypt_only, b"x").unwrap();
        assert!(matches!(
            open(&encrypt_only, &env),
            Err(CipherError::CipherOperationFailed(_))
        ));
    }

    fn from_hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    // Produced by WebCrypto AES-GCM with a 16-byte iv.
    const WEBCRYPTO_HELLO: &str = "74d67d43f16425284d52c8ded3d78e84f7ab027c13";

    #[test]
    fn seal_matches_webcrypto_known_answer() {
        let key = SymmetricKey::from_raw(&[0x11; KEY_LEN], KeyOptions::default()).unwrap();
        let env = seal_with_nonce(&key, [0x22; NONCE_LEN], b"hello").unwrap();

        assert_eq!(env.nonce(), &[0x22; NONCE_LEN]);
        assert_eq!(env.ciphertext(), from_hex(WEBCRYPTO_HELLO).as_slice());
    }

    #[test]
    fn open_accepts_webcrypto_known_answer() {
        let key = SymmetricKey::from_raw(&[0x11; KEY_LEN], KeyOptions::default()).unwrap();
        let env = Envelope::new([0x22; NONCE_LEN], from_hex(WEBCRYPTO_HELLO));

        assert_eq!(*open(&key, &env).unwrap(), b"hello");
    }

    #[test]
    fn nonces_are_unique() {
        let key = key_with(KeyUsages::ALL);
        let nonces: HashSet<[u8; NONCE_LEN]> = (0..10_000)
            .map(|_| *seal(&key, b"n").unwrap().nonce())
            .collect();
        assert_eq!(nonces.len(), 10_000);
    }
}
