//! `GOAWAY` frame handling (RFC 7540 §6.8).

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Http2Error;
use crate::http2::frame::Frame;
use crate::http2::Session;

/// A peer-initiated `GOAWAY` always ends the session; its payload carries no
/// actionable information for a server that never initiates new streams.
pub async fn handle<S>(_session: &mut Session<S>, _frame: &Frame) -> Result<bool, Http2Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    Ok(false)
}
