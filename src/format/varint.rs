//! Unsigned LEB128 integers used for the ciphertext length prefix.
//!
//! ```text
//! 0x7f        -> 127
//! 0x80 0x01   -> 128
//! 0xac 0x02   -> 300
//! ```

/// Longest valid encoding of a `u64` (ceil(64 / 7)).
pub const MAX_VARINT_LEN: usize = 10;

const CONTINUATION: u8 = 0x80;
const PAYLOAD: u8 = 0x7f;

/// Appends `value` to `buf`, least significant group first.
pub fn write_var_uint(buf: &mut Vec<u8>, mut value: u64) {
    while value > u64::from(PAYLOAD) {
        buf.push((value as u8 & PAYLOAD) | CONTINUATION);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Reads one integer from the start of `data`.
///
/// Returns the value and the number of bytes consumed, or `None` when the
/// input ends mid-integer or the value does not fit in 64 bits.
pub fn read_var_uint(data: &[u8]) -> Option<(u64, usize)> {
    let mut value: u64 = 0;

    for (i, &byte) in data.iter().enumerate().take(MAX_VARINT_LEN) {
        let group = u64::from(byte & PAYLOAD);
        let shift = 7 * i as u32;

        // Tenth byte may only carry the single remaining bit.
        if i == MAX_VARINT_LEN - 1 && group > 1 {
            return None;
        }
        value |= group << shift;

        if byte & CONTINUATION == 0 {
            return Some((value, i + 1));
        }
    }

    None
}
