//! Reads framed fields from an async byte stream.
//!
//! Sockets may hand back any number of bytes per read, down to one, so both
//! readers loop until their field is complete.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{DiscoveryError, Result};
use crate::varint::VarIntDecoder;

/// Read one VarInt, issuing a single-byte read per iteration.
pub async fn read_varint<R>(stream: &mut R) -> Result<u32>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut decoder = VarIntDecoder::new();
    let mut byte = [0u8; 1];
    loop {
        if stream.read(&mut byte).await? == 0 {
            return Err(DiscoveryError::StreamClosed);
        }
        if let Some(value) = decoder.push(byte[0])? {
            return Ok(value);
        }
    }
}

/// Read exactly `len` bytes, failing with `ShortRead` if the stream closes
/// first.
pub async fn read_exact<R>(stream: &mut R, len: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        let n = stream.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Err(DiscoveryError::ShortRead {
                expected: len,
                received: filled,
            });
        }
        filled += n;
    }
    Ok(buf)
}
