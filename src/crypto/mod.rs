//! Cryptographic primitives behind the envelope API.
//!
//! Synchronous building blocks: AES-256-GCM sealing, PBKDF2 derivation,
//! key handles and JWK import/export. The crate root wraps them in async
//! functions for use from a runtime.

pub mod aead;
pub mod jwk;
pub mod kdf;
pub mod key;

pub use aead::{generate_nonce, open, seal};
pub use jwk::{ExportedKey, export_key, import_key};
pub use kdf::{KdfParams, derive_key, derive_key_bytes};
pub use key::{KeyOptions, KeyUsage, KeyUsages, SymmetricKey};

/// Algorithm name carried by every key.
pub const ALGORITHM: &str = "AES-GCM";
/// JWK `alg` value for 256-bit AES-GCM.
pub const JWK_ALG: &str = "A256GCM";
/// Length of the nonce (16 bytes, wider than the usual 12).
pub const NONCE_LEN: usize = 16;
/// Length of the encryption key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of the GCM authentication tag (16 bytes).
pub const TAG_LEN: usize = 16;
/// PBKDF2-SHA256 iteration count; also the lowest accepted value.
pub const PBKDF2_ITERATIONS: u32 = 600_000;
/// Shortest salt accepted for derivation (64 bits).
pub const MIN_SALT_LEN: usize = 8;
