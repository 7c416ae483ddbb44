//! HTTP/2 frame wire format (RFC 7540 §4.1):
//!
//! ```text
//! +-----------------------------------------------+
//! |                 Length (24)                   |
//! +---------------+---------------+---------------+
//! |   Type (8)    |   Flags (8)   |
//! +-+-------------+---------------+-------------------------------+
//! |R|                 Stream Identifier (31)                      |
//! +=+=============================================================+
//! |                   Frame Payload (0...)                     ...
//! +---------------------------------------------------------------+
//! ```
//!
//! The stream identifier is read as the full 4 bytes big-endian with the
//! reserved top bit masked off, and the 24-bit length is reassembled
//! explicitly rather than relying on host byte order.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::Http2Error;

/// Frame types (RFC 7540 §11.2).
pub mod frame_type {
    pub const DATA: u8 = 0x0;
    pub const HEADERS: u8 = 0x1;
    pub const PRIORITY: u8 = 0x2;
    pub const RST_STREAM: u8 = 0x3;
    pub const SETTINGS: u8 = 0x4;
    pub const PUSH_PROMISE: u8 = 0x5;
    pub const PING: u8 = 0x6;
    pub const GOAWAY: u8 = 0x7;
    pub const WINDOW_UPDATE: u8 = 0x8;
    pub const CONTINUATION: u8 = 0x9;
    pub const ALTSVC: u8 = 0xA;
    pub const ORIGIN: u8 = 0xC;
}

/// Upper bound on an accepted frame payload.
///
/// The wire format allows up to 2^24 - 1 octets, which would let a peer
/// force an arbitrarily large allocation if taken at face value. This
/// server caps it at the RFC 7540 §4.2 default `SETTINGS_MAX_FRAME_SIZE`.
pub const MAX_FRAME_LENGTH: u32 = 16_384;

/// A single HTTP/2 frame with its payload already read into memory.
#[derive(Debug, Clone)]
pub struct Frame {
    pub frame_type: u8,
    pub flags: u8,
    pub stream_id: u32,
    pub payload: Bytes,
}

impl Frame {
    /// Read one frame from `reader`.
    pub async fn read<R>(reader: &mut R) -> Result<Self, Http2Error>
    where
        R: AsyncRead + Unpin,
    {
        let mut header = [0u8; 9];
        reader.read_exact(&mut header).await?;

        let length = u32::from_be_bytes([0, header[0], header[1], header[2]]);
        let frame_type = header[3];
        let flags = header[4];
        let stream_id = u32::from_be_bytes([header[5], header[6], header[7], header[8]]) & 0x7FFF_FFFF;

        if length > MAX_FRAME_LENGTH {
            return Err(Http2Error::FrameTooLarge { length });
        }

        let mut payload = BytesMut::zeroed(length as usize);
        reader.read_exact(&mut payload).await?;

        Ok(Self {
            frame_type,
            flags,
            stream_id,
            payload: payload.freeze(),
        })
    }

    /// Write this frame to `writer`.
    pub async fn write<W>(&self, writer: &mut W) -> Result<(), Http2Error>
    where
        W: AsyncWrite + Unpin,
    {
        let length = self.payload.len() as u32;
        let mut header = [0u8; 9];
        header[0] = (length >> 16) as u8;
        header[1] = (length >> 8) as u8;
        header[2] = length as u8;
        header[3] = self.frame_type;
        header[4] = self.flags;
        header[5..9].copy_from_slice(&(self.stream_id & 0x7FFF_FFFF).to_be_bytes());

        writer.write_all(&header).await?;
        if !self.payload.is_empty() {
            writer.write_all(&self.payload).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn round_trips_through_write_and_read() {
        let frame = Frame {
            frame_type: frame_type::SETTINGS,
            flags: 0,
            stream_id: 0,
            payload: Bytes::from_static(b"\x00\x03\x00\x00\x00\x64"),
        };

        let mut buf = Vec::new();
        frame.write(&mut buf).await.unwrap();

        let mut cursor = Cursor::new(buf);
        let read_back = Frame::read(&mut cursor).await.unwrap();
        assert_eq!(read_back.frame_type, frame_type::SETTINGS);
        assert_eq!(read_back.payload, frame.payload);
    }

    #[tokio::test]
    async fn masks_reserved_bit_from_stream_id() {
        let mut header = vec![0u8, 0, 0, frame_type::PRIORITY, 0];
        // Reserved bit set, stream id 5.
        header.extend_from_slice(&(0x8000_0005u32).to_be_bytes());
        let mut cursor = Cursor::new(header);
        let frame = Frame::read(&mut cursor).await.unwrap();
        assert_eq!(frame.stream_id, 5);
    }

    #[tokio::test]
    async fn rejects_oversized_frame() {
        let mut header = vec![0xFFu8, 0xFF, 0xFF, frame_type::DATA, 0, 0, 0, 0, 0];
        let mut cursor = Cursor::new(std::mem::take(&mut header));
        let err = Frame::read(&mut cursor).await.unwrap_err();
        assert!(matches!(err, Http2Error::FrameTooLarge { .. }));
    }
}
