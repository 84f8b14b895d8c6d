//! Async envelope I/O over any byte stream.
//!
//! The header is read in full (13 bytes) before the body; the announced body
//! length is checked against the payload limit before anything is allocated.

use std::io;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use zbxbridge_core::{
    error::{BridgeError, Result},
    protocol::frame::{FrameHeader, HEADER_LEN},
};

pub async fn read_header<R>(r: &mut R) -> Result<FrameHeader>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; HEADER_LEN];
    r.read_exact(&mut buf).await.map_err(|e| read_error("header", e))?;
    FrameHeader::parse(&buf)
}

pub async fn read_body<R>(r: &mut R, header: &FrameHeader, max_payload: usize) -> Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let len = header.checked_len(max_payload)?;
    let mut body = vec![0u8; len];
    r.read_exact(&mut body).await.map_err(|e| read_error("body", e))?;
    Ok(Bytes::from(body))
}

pub async fn write_frame<W>(w: &mut W, frame: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    w.write_all(frame)
        .await
        .map_err(|e| BridgeError::Io(format!("write response failed: {e}")))?;
    w.flush()
        .await
        .map_err(|e| BridgeError::Io(format!("flush response failed: {e}")))
}

fn read_error(part: &str, e: io::Error) -> BridgeError {
    match e.kind() {
        io::ErrorKind::UnexpectedEof => BridgeError::Framing(format!("short read of {part}")),
        _ => BridgeError::Framing(format!("reading {part} failed: {e}")),
    }
}
