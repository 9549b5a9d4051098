use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::{ALGORITHM, KEY_LEN};
use crate::error::{CipherError, Result};

/// A single operation a key may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyUsage {
    Encrypt,
    Decrypt,
}

impl KeyUsage {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyUsage::Encrypt => "encrypt",
            KeyUsage::Decrypt => "decrypt",
        }
    }
}

impl fmt::Display for KeyUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of permitted [`KeyUsage`]s. Defaults to both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsages {
    encrypt: bool,
    decrypt: bool,
}

impl KeyUsages {
    pub const ALL: Self = Self {
        encrypt: true,
        decrypt: true,
    };
    pub const ENCRYPT: Self = Self {
        encrypt: true,
        decrypt: false,
    };
    pub const DECRYPT: Self = Self {
        encrypt: false,
        decrypt: true,
    };
    pub const NONE: Self = Self {
        encrypt: false,
        decrypt: false,
    };

    pub fn allows(&self, usage: KeyUsage) -> bool {
        match usage {
            KeyUsage::Encrypt => self.encrypt,
            KeyUsage::Decrypt => self.decrypt,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.encrypt && !self.decrypt
    }

    /// `true` if every usage in `self` is also in `other`.
    pub fn is_subset_of(&self, other: KeyUsages) -> bool {
        (!self.encrypt || other.encrypt) && (!self.decrypt || other.decrypt)
    }

    /// Usages in canonical order (encrypt, then decrypt).
    pub fn to_vec(&self) -> Vec<KeyUsage> {
        let mut out = Vec::with_capacity(2);
        if self.encrypt {
            out.push(KeyUsage::Encrypt);
        }
        if self.decrypt {
            out.push(KeyUsage::Decrypt);
        }
        out
    }
}

impl Default for KeyUsages {
    fn default() -> Self {
        Self::ALL
    }
}

impl FromIterator<KeyUsage> for KeyUsages {
    fn from_iter<I: IntoIterator<Item = KeyUsage>>(iter: I) -> Self {
        iter.into_iter().fold(KeyUsages::NONE, |mut acc, usage| {
            match usage {
                KeyUsage::Encrypt => acc.encrypt = true,
                KeyUsage::Decrypt => acc.decrypt = true,
            }
            acc
        })
    }
}

/// Creation options for derived and raw-imported keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyOptions {
    /// Whether the key material may later be exported (default `false`).
    pub extractable: bool,
    /// Operations the key may be used for (default both).
    pub usages: KeyUsages,
}

impl Default for KeyOptions {
    fn default() -> Self {
        Self {
            extractable: false,
            usages: KeyUsages::ALL,
        }
    }
}

impl KeyOptions {
    pub fn extractable(mut self, extractable: bool) -> Self {
        self.extractable = extractable;
        self
    }

    pub fn usages(mut self, usages: KeyUsages) -> Self {
        self.usages = usages;
        self
    }
}

struct KeyInner {
    material: Zeroizing<[u8; KEY_LEN]>,
    extractable: bool,
    usages: KeyUsages,
}

/// Handle to an immutable AES-256-GCM key.
///
/// Clones share the same material; the bytes are wiped when the last clone
/// is dropped.
#[derive(Clone)]
pub struct SymmetricKey {
    inner: Arc<KeyInner>,
}

impl SymmetricKey {
    pub(crate) fn new(
        material: Zeroizing<[u8; KEY_LEN]>,
        extractable: bool,
        usages: KeyUsages,
    ) -> Result<Self> {
        if usages.is_empty() {
            return Err(CipherError::InvalidKeyMaterial(
                "key must allow at least one usage".into(),
            ));
        }
        Ok(Self {
            inner: Arc::new(KeyInner {
                material,
                extractable,
                usages,
            }),
        })
    }

    /// Imports 32 raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKeyMaterial`] if `bytes` is not exactly
    /// [`KEY_LEN`] long or `options` grants no usage.
    pub fn from_raw(bytes: &[u8], options: KeyOptions) -> Result<Self> {
        let raw: &[u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            CipherError::InvalidKeyMaterial(format!(
                "expected {KEY_LEN} key bytes, got {}",
                bytes.len()
            ))
        })?;
        Self::new(Zeroizing::new(*raw), options.extractable, options.usages)
    }

    pub fn algorithm(&self) -> &'static str {
        ALGORITHM
    }

    pub fn extractable(&self) -> bool {
        self.inner.extractable
    }

    pub fn usages(&self) -> KeyUsages {
        self.inner.usages
    }

    /// Fails with [`CipherError::CipherOperationFailed`] unless `usage` is
    /// permitted.
    pub(crate) fn require(&self, usage: KeyUsage) -> Result<()> {
        if self.inner.usages.allows(usage) {
            Ok(())
        } else {
            Err(CipherError::CipherOperationFailed(format!(
                "key lacks '{usage}' usage"
            )))
        }
    }

    /// Raw material for the cipher and for export. Callers check
    /// extractability themselves.
    pub(crate) fn material(&self) -> &[u8; KEY_LEN] {
        &self.inner.material
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("algorithm", &ALGORITHM)
            .field("extractable", &self.inner.extractable)
            .field("usages", &self.inner.usages)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_both_usages_not_extractable() {
        let opts = KeyOptions::default();
        assert!(!opts.extractable);
        assert_eq!(opts.usages, KeyUsages::ALL);
    }

    #[test]
    fn usages_collect_from_iterator() {
        let usages: KeyUsages = [KeyUsage::Decrypt].into_iter().collect();
        assert_eq!(usages, KeyUsages::DECRYPT);
        assert_eq!(usages.to_vec(), vec![KeyUsage::Decrypt]);
        assert!(usages.is_subset_of(KeyUsages::ALL));
        assert!(!KeyUsages::ALL.is_subset_of(usages));
    }

    #[test]
    fn raw_import_checks_length() {
        assert!(SymmetricKey::from_raw(&[0u8; 16], KeyOptions::default()).is_err());
        assert!(SymmetricKey::from_raw(&[0u8; KEY_LEN], KeyOptions::default()).is_ok());
    }

    #[test]
    fn empty_usages_rejected() {
        let opts = KeyOptions::default().usages(KeyUsages::NONE);
        match SymmetricKey::from_raw(&[0u8; KEY_LEN], opts) {
            Err(CipherError::InvalidKeyMaterial(_)) => {}
            other => panic!("expected InvalidKeyMaterial, got: {other:?}"),
        }
    }

    #[test]
    fn require_enforces_usage() {
        let key = SymmetricKey::from_raw(
            &[1u8; KEY_LEN],
            KeyOptions::default().usages(KeyUsages::ENCRYPT),
        )
        .unwrap();

        assert!(key.require(KeyUsage::Encrypt).is_ok());
        assert!(matches!(
            key.require(KeyUsage::Decrypt),
            Err(CipherError::CipherOperationFailed(_))
        ));
    }

    #[test]
    fn debug_does_not_print_material() {
        let key = SymmetricKey::from_raw(&[0x5a; KEY_LEN], KeyOptions::default()).unwrap();
        let dbg = format!("{key:?}");
        assert!(dbg.contains("AES-GCM"));
        assert!(!dbg.contains("material"));
        assert!(!dbg.contains("[90, 90"));
    }
}
