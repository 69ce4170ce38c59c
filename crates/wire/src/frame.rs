// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Drift Contributors

//! Length-prefixed framing: 8-byte big-endian length, then the payload.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::WireError;

/// Upper bound on a single frame. A corrupt length prefix must not make
/// us allocate the advertised size blindly.
pub const MAX_FRAME_LEN: u64 = 64 * 1024 * 1024;

/// Write one length-prefixed frame.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    let len = payload.len() as u64;
    if len > MAX_FRAME_LEN {
        return Err(WireError::Oversized(len));
    }
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame.
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, WireError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 8];
    reader.read_exact(&mut prefix).await?;
    let len = u64::from_be_bytes(prefix);
    if len > MAX_FRAME_LEN {
        return Err(WireError::Oversized(len));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
