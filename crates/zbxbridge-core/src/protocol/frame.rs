//! `ZBXD` envelope parsing and encoding (panic-free).
//!
//! Layout: `ZBXD` | version `0x01` | payload length (u64 LE) | payload.
//!
//! Parsing rules:
//! - Never index (`buf[0]`), always use `Buf` and `remaining()` checks.
//! - Never `unwrap()` / `expect()` / `panic!()` in production paths.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{BridgeError, Result};

/// Protocol magic.
pub const MAGIC: &[u8; 4] = b"ZBXD";
/// The only supported protocol version (plain, uncompressed).
pub const VERSION: u8 = 0x01;
/// Magic + version + u64 length.
pub const HEADER_LEN: usize = 13;

/// Parsed envelope header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Announced payload length in bytes.
    pub payload_len: u64,
}

impl FrameHeader {
    /// Parse the fixed 13-byte header. Bytes past the header are ignored.
    pub fn parse(mut buf: &[u8]) -> Result<Self> {
        if buf.remaining() < HEADER_LEN {
            return Err(BridgeError::Framing(format!(
                "header too short: {} of {HEADER_LEN} bytes",
                buf.remaining()
            )));
        }

        let mut magic = [0u8; 4];
        buf.copy_to_slice(&mut magic);
        if &magic != MAGIC {
            return Err(BridgeError::Framing("bad magic".into()));
        }

        let version = buf.get_u8();
        if version != VERSION {
            return Err(BridgeError::Framing(format!(
                "unsupported protocol version/flags: {version:#04x}"
            )));
        }

        Ok(Self {
            payload_len: buf.get_u64_le(),
        })
    }

    /// Payload length as `usize`, refusing anything above `max`.
    pub fn checked_len(&self, max: usize) -> Result<usize> {
        match usize::try_from(self.payload_len) {
            Ok(n) if n <= max => Ok(n),
            _ => Err(BridgeError::Framing(format!(
                "payload length {} exceeds limit {max}",
                self.payload_len
            ))),
        }
    }
}

/// Decode a complete envelope held in memory and return its payload.
///
/// Trailing bytes after the announced payload are ignored.
pub fn decode_frame(mut buf: Bytes) -> Result<Bytes> {
    let header = FrameHeader::parse(&buf)?;
    buf.advance(HEADER_LEN);

    let len = header.checked_len(buf.remaining()).map_err(|_| {
        BridgeError::Framing(format!(
            "body too short: {} of {} bytes",
            buf.remaining(),
            header.payload_len
        ))
    })?;

    Ok(buf.copy_to_bytes(len))
}

/// Wrap `payload` in an envelope with a freshly computed length.
pub fn encode_frame(payload: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(HEADER_LEN + payload.len());
    out.put_slice(MAGIC);
    out.put_u8(VERSION);
    out.put_u64_le(payload.len() as u64);
    out.put_slice(payload);
    out.freeze()
}

/// Body of the summary reply sent after a request has been dispatched.
pub fn response_body(processed: usize, failed: usize, total: usize, seconds: f64) -> String {
    format!(
        r#"{{"response": "success", "info": "processed: {processed}; failed: {failed}; total: {total}; seconds spent: {seconds:.6}"}}"#
    )
}

/// Full summary reply, envelope included.
pub fn encode_response(processed: usize, failed: usize, total: usize, seconds: f64) -> Bytes {
    encode_frame(response_body(processed, failed, total, seconds).as_bytes())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn response_body_matches_sender_expectations() {
        assert_eq!(
            response_body(3, 1, 4, 0.0),
            r#"{"response": "success", "info": "processed: 3; failed: 1; total: 4; seconds spent: 0.000000"}"#
        );
    }

    #[test]
    fn response_length_field_matches_body() {
        let frame = encode_response(3, 1, 4, 0.0);
        let header = FrameHeader::parse(&frame).unwrap();
        assert_eq!(header.payload_len as usize, frame.len() - HEADER_LEN);

        let payload = decode_frame(frame).unwrap();
        assert_eq!(payload.len() as u64, header.payload_len);
    }

    #[test]
    fn oversized_length_is_refused() {
        let mut raw = BytesMut::new();
        raw.put_slice(MAGIC);
        raw.put_u8(VERSION);
        raw.put_u64_le(u64::MAX);
        let header = FrameHeader::parse(&raw).unwrap();
        let err = header.checked_len(1024).unwrap_err();
        assert_eq!(err.kind().as_str(), "FRAMING");
    }
}
