//! VarInt codec: 7 data bits per byte, high bit set while more bytes follow,
//! least-significant group first.

use std::io::{ErrorKind, Read};

use crate::error::{DiscoveryError, Result};

/// Longest valid encoding of a 32-bit value.
pub const MAX_VARINT_LEN: usize = 5;

const SEGMENT_BITS: u32 = 0x7F;
const CONTINUE_BIT: u8 = 0x80;

/// Encode `value` into a fresh buffer.
pub fn encode(value: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_VARINT_LEN);
    encode_into(&mut out, value);
    out
}

/// Append the encoding of `value` to `out`.
pub fn encode_into(out: &mut Vec<u8>, mut value: u32) {
    while value & !SEGMENT_BITS != 0 {
        out.push((value & SEGMENT_BITS) as u8 | CONTINUE_BIT);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Incremental decoder fed one byte at a time.
///
/// Shared by the blocking [`decode`] and the async reader in
/// [`crate::stream`] so both reject over-long input identically.
#[derive(Debug, Default, Clone)]
pub struct VarIntDecoder {
    value: u32,
    consumed: usize,
}

impl VarIntDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next byte. Returns `Some(value)` once the terminating byte
    /// arrives.
    pub fn push(&mut self, byte: u8) -> Result<Option<u32>> {
        if self.consumed >= MAX_VARINT_LEN {
            return Err(DiscoveryError::MalformedVarInt);
        }
        self.value |= (u32::from(byte) & SEGMENT_BITS) << (7 * self.consumed);
        self.consumed += 1;

        if byte & CONTINUE_BIT == 0 {
            return Ok(Some(self.value));
        }
        if self.consumed == MAX_VARINT_LEN {
            return Err(DiscoveryError::MalformedVarInt);
        }
        Ok(None)
    }

    /// Bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

/// Decode a VarInt from a blocking reader, one byte per read call.
pub fn decode<R: Read>(reader: &mut R) -> Result<u32> {
    let mut decoder = VarIntDecoder::new();
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => return Err(DiscoveryError::StreamClosed),
            Ok(_) => {
                if let Some(value) = decoder.push(byte[0])? {
                    return Ok(value);
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}
