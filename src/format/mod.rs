//! Wire framing for encrypted payloads.
//!
//! Envelope format:
//! ```text
//! NONCE (16) | CIPHERTEXT_LEN (varint) | CIPHERTEXT + TAG (CIPHERTEXT_LEN)
//! ```
//!
//! The layout is persisted and exchanged between peers, so it must never
//! change. Parsing is strict: nothing may follow the declared ciphertext.

use crate::crypto::NONCE_LEN;
use crate::error::{CipherError, Result};

pub mod varint;

use varint::{MAX_VARINT_LEN, read_var_uint, write_var_uint};

/// A nonce and the ciphertext (tag included) it was sealed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl Envelope {
    /// Creates an envelope from its components.
    pub fn new(nonce: [u8; NONCE_LEN], ciphertext: Vec<u8>) -> Self {
        Self { nonce, ciphertext }
    }

    /// Returns the per-message nonce.
    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    /// Returns the ciphertext with its trailing authentication tag.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Splits the envelope into nonce and ciphertext.
    pub fn into_parts(self) -> ([u8; NONCE_LEN], Vec<u8>) {
        (self.nonce, self.ciphertext)
    }

    /// Serializes the envelope to its wire form.
    pub fn to_bytes(&self) -> Vec<u8> {
        serialize(&self.nonce, &self.ciphertext)
    }

    /// Parses an envelope from its wire form.
    ///
    /// # Errors
    ///
    /// See [`deserialize`].
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        deserialize(data)
    }
}

/// Frames `nonce` and `ciphertext` into a single byte sequence.
pub fn serialize(nonce: &[u8; NONCE_LEN], ciphertext: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(NONCE_LEN + MAX_VARINT_LEN + ciphertext.len());

    buf.extend_from_slice(nonce);
    write_var_uint(&mut buf, ciphertext.len() as u64);
    buf.extend_from_slice(ciphertext);

    buf
}

/// Parses a framed envelope.
///
/// # Errors
///
/// Returns [`CipherError::MalformedEnvelope`] if:
/// - fewer than 16 bytes are available for the nonce
/// - the length prefix is truncated or overflows
/// - the declared length exceeds the remaining input
/// - bytes remain after the declared ciphertext
pub fn deserialize(data: &[u8]) -> Result<Envelope> {
    if data.len() < NONCE_LEN {
        return Err(CipherError::MalformedEnvelope("too short for nonce"));
    }

    let (nonce_bytes, rest) = data.split_at(NONCE_LEN);
    let nonce: [u8; NONCE_LEN] = nonce_bytes
        .try_into()
        .map_err(|_| CipherError::MalformedEnvelope("invalid nonce length"))?;

    let (declared, prefix_len) = read_var_uint(rest)
        .ok_or(CipherError::MalformedEnvelope("truncated length prefix"))?;
    let body = &rest[prefix_len..];

    let len = usize::try_from(declared)
        .map_err(|_| CipherError::MalformedEnvelope("ciphertext length overflows"))?;

    if len > body.len() {
        return Err(CipherError::MalformedEnvelope(
            "declared ciphertext length exceeds input",
        ));
    }
    if len < body.len() {
        return Err(CipherError::MalformedEnvelope(
            "trailing bytes after ciphertext",
        ));
    }

    Ok(Envelope::new(nonce, body.to_vec()))
}
