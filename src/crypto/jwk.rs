//! JSON Web Key (RFC 7517) representation of AES-GCM keys.
//!
//! The shape matches what WebCrypto emits for an extractable 256-bit AES-GCM
//! key, so keys can be exchanged with browser peers:
//!
//! ```json
//! {"kty":"oct","alg":"A256GCM","k":"<base64url>","key_ops":["encrypt","decrypt"],"ext":true}
//! ```

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::key::{KeyUsage, KeyUsages, SymmetricKey};
use super::{ALGORITHM, JWK_ALG, KEY_LEN};
use crate::error::{CipherError, Result};

/// JWK key type for symmetric keys.
pub const JWK_KTY: &str = "oct";

/// Portable form of a [`SymmetricKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedKey {
    pub kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// Key material, base64url without padding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_ops: Option<Vec<KeyUsage>>,
    #[serde(default = "default_ext")]
    pub ext: bool,
}

// JWKs without `ext` are treated as extractable (RFC 7517 leaves it open).
fn default_ext() -> bool {
    true
}

impl ExportedKey {
    /// Algorithm family this key is for.
    pub fn algorithm(&self) -> &'static str {
        ALGORITHM
    }

    /// Usages embedded in the key, if any.
    pub fn usages(&self) -> Option<KeyUsages> {
        self.key_ops
            .as_ref()
            .map(|ops| ops.iter().copied().collect())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CipherError::InvalidKeyMaterial(format!("failed to encode jwk: {e}")))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CipherError::InvalidKeyMaterial(format!("failed to parse jwk: {e}")))
    }
}

/// Export `key` as a JWK.
///
/// # Errors
///
/// Returns [`CipherError::KeyNotExtractable`] unless the key was created
/// extractable.
pub fn export_key(key: &SymmetricKey) -> Result<ExportedKey> {
    if !key.extractable() {
        return Err(CipherError::KeyNotExtractable);
    }

    Ok(ExportedKey {
        kty: JWK_KTY.to_string(),
        alg: Some(JWK_ALG.to_string()),
        k: Some(URL_SAFE_NO_PAD.encode(key.material())),
        key_ops: Some(key.usages().to_vec()),
        ext: true,
    })
}

/// Import a JWK as an AES-GCM key.
///
/// When `usages` is `None` the JWK's `key_ops` are used, falling back to
/// both usages.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyMaterial`] if:
/// - `kty` is not `oct` or `alg` names another algorithm
/// - `k` is missing, not base64url, or not 256 bits
/// - the requested usages exceed the JWK's `key_ops`
/// - `extractable` is requested for a JWK marked `ext: false`
pub fn import_key(
    exported: &ExportedKey,
    usages: Option<KeyUsages>,
    extractable: bool,
) -> Result<SymmetricKey> {
    if exported.kty != JWK_KTY {
        return Err(CipherError::InvalidKeyMaterial(format!(
            "unsupported key type '{}'",
            exported.kty
        )));
    }

    if let Some(alg) = &exported.alg {
        if alg != JWK_ALG {
            return Err(CipherError::InvalidKeyMaterial(format!(
                "unsupported algorithm '{alg}', expected {JWK_ALG}"
            )));
        }
    }

    let embedded = exported.usages();
    let usages = usages.or(embedded).unwrap_or_default();

    if let Some(allowed) = embedded {
        if !usages.is_subset_of(allowed) {
            return Err(CipherError::InvalidKeyMaterial(
                "requested usages exceed key_ops".into(),
            ));
        }
    }

    if extractable && !exported.ext {
        return Err(CipherError::InvalidKeyMaterial(
            "cannot import non-extractable jwk as extractable".into(),
        ));
    }

    let encoded = exported
        .k
        .as_deref()
        .ok_or_else(|| CipherError::InvalidKeyMaterial("missing key material".into()))?;

    let raw = Zeroizing::new(
        URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| CipherError::InvalidKeyMaterial(format!("invalid base64url: {e}")))?,
    );

    let material: [u8; KEY_LEN] = raw.as_slice().try_into().map_err(|_| {
        CipherError::InvalidKeyMaterial(format!(
            "expected {} bit key, got {} bits",
            KEY_LEN * 8,
            raw.len() * 8
        ))
    })?;

    SymmetricKey::new(Zeroizing::new(material), extractable, usages)
}
