//! AES-256-GCM envelope encryption.
//!
//! Plaintexts are sealed under a fresh 128-bit random nonce and framed as
//! `nonce | varint(len) | ciphertext+tag` (see [`format`]). Keys are raw,
//! imported from a JWK, or derived from a secret with PBKDF2-SHA256 at
//! 600,000 iterations.
//!
//! The functions at the crate root are async: cipher and KDF work runs on
//! tokio's blocking pool so callers never stall a runtime worker. The
//! synchronous primitives live in [`crypto`].
//!
//! ```no_run
//! # async fn demo() -> keyseal::Result<()> {
//! use keyseal::KeyOptions;
//!
//! let key = keyseal::derive_key(b"correct horse battery staple", &[1u8; 16], KeyOptions::default()).await?;
//! let envelope = keyseal::encrypt(&key, b"hello").await?;
//! let plaintext = keyseal::decrypt(&key, &envelope).await?;
//! assert_eq!(&plaintext[..], b"hello");
//! # Ok(())
//! # }
//! ```

pub mod crypto;
pub mod error;
pub mod format;
mod storage;

pub use crate::crypto::{ExportedKey, KdfParams, KeyOptions, KeyUsage, KeyUsages, SymmetricKey};
pub use crate::error::{CipherError, Result};
pub use crate::format::Envelope;
pub use crate::storage::Storage;

use tokio::task;
use tracing::{debug, instrument};
use zeroize::Zeroizing;

/// Runs CPU-bound crypto on the blocking pool.
async fn offload<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(work)
        .await
        .map_err(|e| CipherError::CipherOperationFailed(format!("crypto task failed: {e}")))?
}

/// Encrypt `plaintext` and return the framed envelope bytes.
///
/// # Errors
///
/// Returns [`CipherError::CipherOperationFailed`] if the key lacks the
/// `encrypt` usage or the cipher fails.
#[instrument(level = "debug", skip_all, fields(len = plaintext.len()))]
pub async fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let key = key.clone();
    let plaintext = Zeroizing::new(plaintext.to_vec());

    let envelope = offload(move || crypto::seal(&key, &plaintext)).await?;
    Ok(envelope.to_bytes())
}

/// Parse and decrypt envelope bytes produced by [`encrypt`].
///
/// # Errors
///
/// - [`CipherError::MalformedEnvelope`] if the framing is invalid; no
///   decryption is attempted
/// - [`CipherError::AuthenticationFailed`] on wrong key or tampering
/// - [`CipherError::CipherOperationFailed`] if the key lacks `decrypt`
#[instrument(level = "debug", skip_all, fields(len = envelope.len()))]
pub async fn decrypt(key: &SymmetricKey, envelope: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let envelope = Envelope::from_bytes(envelope)?;
    let key = key.clone();

    offload(move || crypto::open(&key, &envelope)).await
}

/// Export an extractable key as a JWK.
///
/// # Errors
///
/// Returns [`CipherError::KeyNotExtractable`] for non-extractable keys.
pub async fn export_key(key: &SymmetricKey) -> Result<ExportedKey> {
    crypto::export_key(key)
}

/// Import a JWK.
///
/// `usages` defaults to the JWK's `key_ops`, then to both usages.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyMaterial`] for malformed or
/// incompatible keys.
pub async fn import_key(
    exported: &ExportedKey,
    usages: Option<KeyUsages>,
    extractable: bool,
) -> Result<SymmetricKey> {
    crypto::import_key(exported, usages, extractable)
}

/// Import 32 raw key bytes.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyMaterial`] if `raw` is not 32 bytes.
pub async fn import_raw_key(raw: &[u8], options: KeyOptions) -> Result<SymmetricKey> {
    SymmetricKey::from_raw(raw, options)
}

/// Derive a key from `secret` and `salt` with the default PBKDF2 cost.
///
/// Text secrets are passed as their UTF-8 bytes. Each call recomputes the
/// full derivation.
///
/// # Errors
///
/// Returns [`CipherError::KeyDerivationFailed`] for an empty secret or a
/// salt shorter than 8 bytes.
pub async fn derive_key(secret: &[u8], salt: &[u8], options: KeyOptions) -> Result<SymmetricKey> {
    derive_key_with_params(secret, salt, options, KdfParams::default()).await
}

/// Like [`derive_key`], with an explicit (higher) iteration count.
#[instrument(level = "debug", skip_all, fields(iterations = kdf.iterations()))]
pub async fn derive_key_with_params(
    secret: &[u8],
    salt: &[u8],
    options: KeyOptions,
    kdf: KdfParams,
) -> Result<SymmetricKey> {
    let secret = Zeroizing::new(secret.to_vec());
    let salt = salt.to_vec();

    let key = offload(move || crypto::derive_key(&secret, &salt, options, kdf)).await?;
    debug!(extractable = key.extractable(), "key derived");
    Ok(key)
}
