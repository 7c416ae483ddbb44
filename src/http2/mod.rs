//! HTTP/2 session handling: the connection preface, frame codec, and
//! per-frame-type control dispatch.
//!
//! This server never handles request bodies over HTTP/2: `HEADERS`, `DATA`,
//! `PUSH_PROMISE`, `PING`, `CONTINUATION`, `ALTSVC` and `ORIGIN` frames are
//! read and discarded before dispatch reaches any per-type handler.

pub mod error;
pub mod frame;
pub mod frames;
pub mod stream;

use std::collections::HashMap;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Http2Error;
use error::ErrorCode;
use frame::{frame_type, Frame};
use stream::Stream;

/// The 24-byte sequence an HTTP/2 client must send before anything else.
pub const PREFACE: &[u8; 24] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// Default initial flow-control window (RFC 7540 §6.9.2).
const DEFAULT_INITIAL_WINDOW_SIZE: i64 = 65_535;

/// An HTTP/2 connection: the transport plus stream bookkeeping.
pub struct Session<S> {
    stream: S,
    streams: HashMap<u32, Stream>,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    #[must_use]
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            streams: HashMap::new(),
        }
    }

    /// Verify the client sent the expected connection preface.
    pub async fn check_preface(&mut self) -> Result<bool, Http2Error> {
        use tokio::io::AsyncReadExt;
        let mut buf = [0u8; 24];
        self.stream.read_exact(&mut buf).await?;
        Ok(&buf == PREFACE)
    }

    /// Send a (potentially empty) `SETTINGS` frame; this is the server's
    /// half of the preface exchange.
    pub async fn send_settings(&mut self) -> Result<(), Http2Error> {
        let frame = Frame {
            frame_type: frame_type::SETTINGS,
            flags: 0,
            stream_id: 0,
            payload: bytes::Bytes::new(),
        };
        frame.write(&mut self.stream).await
    }

    /// Send a `GOAWAY` frame closing out the whole connection.
    pub async fn send_goaway(&mut self, error_code: ErrorCode, debug_data: &[u8]) -> Result<(), Http2Error> {
        let mut payload = Vec::with_capacity(8 + debug_data.len());
        payload.extend_from_slice(&0u32.to_be_bytes());
        payload.extend_from_slice(&error_code.as_u32().to_be_bytes());
        payload.extend_from_slice(debug_data);

        let frame = Frame {
            frame_type: frame_type::GOAWAY,
            flags: 0,
            stream_id: 0,
            payload: bytes::Bytes::from(payload),
        };
        frame.write(&mut self.stream).await
    }

    /// Send an `RST_STREAM` frame ending a single stream without tearing
    /// down the whole session.
    pub async fn send_rst_stream(&mut self, stream_id: u32, error_code: ErrorCode) -> Result<(), Http2Error> {
        let frame = Frame {
            frame_type: frame_type::RST_STREAM,
            flags: 0,
            stream_id,
            payload: bytes::Bytes::copy_from_slice(&error_code.as_u32().to_be_bytes()),
        };
        frame.write(&mut self.stream).await
    }

    fn stream_entry(&mut self, stream_id: u32) -> &mut Stream {
        self.streams
            .entry(stream_id)
            .or_insert_with(|| Stream::new(DEFAULT_INITIAL_WINDOW_SIZE))
    }

    /// Drive the session: check the preface, exchange settings, then read
    /// and dispatch frames until the peer disconnects or a control frame
    /// forces the session to end.
    pub async fn run(&mut self) -> Result<(), Http2Error> {
        if !self.check_preface().await? {
            return Err(Http2Error::PrefaceMismatch);
        }

        self.send_settings().await?;

        loop {
            let frame = match Frame::read(&mut self.stream).await {
                Ok(frame) => frame,
                Err(Http2Error::Io(err)) if is_connection_closed(&err) => return Ok(()),
                Err(err) => return Err(err),
            };

            // Touch the stream table so idle streams referenced by control
            // frames (e.g. PRIORITY) exist for later bookkeeping.
            if frame.stream_id != 0 {
                self.stream_entry(frame.stream_id);
            }

            let keep_going = match frame.frame_type {
                frame_type::PRIORITY => frames::priority::handle(self, &frame).await?,
                frame_type::SETTINGS => frames::settings::handle(self, &frame).await?,
                frame_type::GOAWAY => frames::goaway::handle(self, &frame).await?,
                frame_type::WINDOW_UPDATE => frames::window_update::handle(self, &frame).await?,
                _ => true,
            };

            if !keep_going {
                return Err(Http2Error::SessionTerminated);
            }
        }
    }
}

fn is_connection_closed(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::BrokenPipe
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn rejects_mismatched_preface() {
        let (mut client, server) = duplex(256);
        let mut session = Session::new(server);

        tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            let _ = client.write_all(b"not the preface at all!!").await;
        });

        let accepted = session.check_preface().await.unwrap();
        assert!(!accepted);
    }

    #[tokio::test]
    async fn accepts_canonical_preface() {
        let (mut client, server) = duplex(256);
        let mut session = Session::new(server);

        tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            let _ = client.write_all(PREFACE).await;
        });

        let accepted = session.check_preface().await.unwrap();
        assert!(accepted);
    }

    #[tokio::test]
    async fn run_ends_with_session_terminated_after_goaway() {
        let (mut client, server) = duplex(512);
        let mut session = Session::new(server);

        tokio::spawn(async move {
            use tokio::io::{AsyncReadExt, AsyncWriteExt};
            client.write_all(PREFACE).await.unwrap();

            // Consume the server's SETTINGS preface frame before sending GOAWAY.
            let mut settings_header = [0u8; 9];
            client.read_exact(&mut settings_header).await.unwrap();

            let mut goaway = Vec::new();
            goaway.extend_from_slice(&8u32.to_be_bytes()[1..4]); // length = 8
            goaway.push(frame_type::GOAWAY);
            goaway.push(0); // flags
            goaway.extend_from_slice(&0u32.to_be_bytes()); // stream 0
            goaway.extend_from_slice(&0u32.to_be_bytes()); // last-stream-id
            goaway.extend_from_slice(&0u32.to_be_bytes()); // error code NO_ERROR
            client.write_all(&goaway).await.unwrap();
        });

        let err = session.run().await.unwrap_err();
        assert!(matches!(err, Http2Error::SessionTerminated));
    }
}
