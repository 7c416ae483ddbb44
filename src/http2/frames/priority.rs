//! `PRIORITY` frame handling (RFC 7540 §6.3).

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Http2Error;
use crate::http2::error::ErrorCode;
use crate::http2::frame::Frame;
use crate::http2::Session;

/// Validate a `PRIORITY` frame. Returns `Ok(true)` if the session should
/// continue, `Ok(false)` if a `GOAWAY` was sent and the session must end.
pub async fn handle<S>(session: &mut Session<S>, frame: &Frame) -> Result<bool, Http2Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if frame.stream_id == 0 {
        session
            .send_goaway(ErrorCode::ProtocolError, b"Priority on stream 0 is invalid")
            .await?;
        return Ok(false);
    }

    if frame.payload.len() != 5 {
        session
            .send_goaway(
                ErrorCode::FrameSizeError,
                b"Priority frames are 5 octets of length",
            )
            .await?;
        return Ok(false);
    }

    Ok(true)
}
