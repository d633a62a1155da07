//! Primitive byte encoding shared by the entry, transaction and commit codecs.
//!
//! Integers on the wire are big-endian. Amounts use the ledger's base-128
//! varint: most significant 7-bit group first, high bit set on every byte
//! except the last.

use crate::error::{CoreError, Result};

/// Largest value a 6-byte millisecond timestamp can carry.
pub const MAX_MILLI_TIMESTAMP: i64 = (1 << 48) - 1;

/// Longest varint a `u64` can need (ceil(64 / 7)).
pub const MAX_VARINT_LEN: usize = 10;

/// Concatenate two byte slices.
pub fn concat(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    out.extend_from_slice(a);
    out.extend_from_slice(b);
    out
}

/// Append a single byte to a byte slice.
pub fn concat_byte(a: &[u8], b: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(a.len() + 1);
    out.extend_from_slice(a);
    out.push(b);
    out
}

/// Encode a value as a big-endian 16-bit integer.
pub fn to_fixed_width16(value: u64) -> Result<[u8; 2]> {
    let narrowed = u16::try_from(value)
        .map_err(|_| CoreError::Encoding(format!("{value} does not fit in 16 bits")))?;
    Ok(narrowed.to_be_bytes())
}

/// Encode a millisecond epoch as the low 6 bytes of its big-endian form.
pub fn to_milli_timestamp(millis: i64) -> Result<[u8; 6]> {
    if !(0..=MAX_MILLI_TIMESTAMP).contains(&millis) {
        return Err(CoreError::Encoding(format!(
            "timestamp {millis} does not fit in 48 bits"
        )));
    }
    let full = (millis as u64).to_be_bytes();
    let mut out = [0u8; 6];
    out.copy_from_slice(&full[2..]);
    Ok(out)
}

/// Decode a 6-byte millisecond timestamp.
pub fn from_milli_timestamp(bytes: &[u8; 6]) -> i64 {
    let mut full = [0u8; 8];
    full[2..].copy_from_slice(bytes);
    u64::from_be_bytes(full) as i64
}

/// Encode an unsigned integer as a varint (smallest encoding).
pub fn encode_varint(value: u64) -> Vec<u8> {
    if value == 0 {
        return vec![0];
    }

    let mut groups = Vec::with_capacity(MAX_VARINT_LEN);
    let mut rest = value;
    while rest > 0 {
        groups.push((rest & 0x7f) as u8);
        rest >>= 7;
    }
    groups.reverse();

    let last = groups.len() - 1;
    for group in &mut groups[..last] {
        *group |= 0x80;
    }
    groups
}

/// Decode a varint from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed. Rejects padded
/// (non-minimal) encodings and values that overflow `u64`.
pub fn decode_varint(bytes: &[u8]) -> Result<(u64, usize)> {
    if bytes.first() == Some(&0x80) {
        return Err(CoreError::Decoding("varint has a leading zero group".into()));
    }

    let mut value: u64 = 0;
    for (i, &b) in bytes.iter().enumerate().take(MAX_VARINT_LEN) {
        if value >> 57 != 0 {
            return Err(CoreError::Decoding("varint overflows u64".into()));
        }
        value = (value << 7) | u64::from(b & 0x7f);
        if b & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(CoreError::Decoding("unterminated varint".into()))
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Forward-only cursor over an encoded record.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Take the next `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| {
                CoreError::Decoding(format!(
                    "need {n} bytes at offset {}, have {}",
                    self.pos,
                    self.buf.len() - self.pos
                ))
            })?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Take the next `N` bytes as an array.
    pub fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u16_be(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.array::<2>()?))
    }

    pub fn varint(&mut self) -> Result<u64> {
        let (value, used) = decode_varint(&self.buf[self.pos..])?;
        self.pos += used;
        Ok(value)
    }

    /// Everything not yet consumed.
    pub fn rest(&mut self) -> &'a [u8] {
        let slice = &self.buf[self.pos..];
        self.pos = self.buf.len();
        slice
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}
