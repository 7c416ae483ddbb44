//! `WINDOW_UPDATE` frame handling (RFC 7540 §6.9).

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Http2Error;
use crate::http2::error::ErrorCode;
use crate::http2::frame::Frame;
use crate::http2::Session;

/// Validate a `WINDOW_UPDATE` frame.
///
/// A malformed length ends the session outright. A zero increment on the
/// connection (stream 0) is a protocol error that ends the session; a zero
/// increment on a stream resets only that stream and the session continues.
pub async fn handle<S>(session: &mut Session<S>, frame: &Frame) -> Result<bool, Http2Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if frame.payload.len() != 4 {
        return Ok(false);
    }

    let raw = u32::from_be_bytes([
        frame.payload[0],
        frame.payload[1],
        frame.payload[2],
        frame.payload[3],
    ]);
    let increment = raw & 0x7FFF_FFFF;

    if increment == 0 {
        if frame.stream_id == 0 {
            session
                .send_goaway(ErrorCode::ProtocolError, b"Window Size Increment was 0")
                .await?;
            return Ok(false);
        }

        session
            .send_rst_stream(frame.stream_id, ErrorCode::ProtocolError)
            .await?;
        return Ok(true);
    }

    Ok(true)
}
