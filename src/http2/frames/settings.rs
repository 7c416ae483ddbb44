//! `SETTINGS` frame handling (RFC 7540 §6.5).
//!
//! This server advertises no non-default settings and applies none of the
//! peer's either; it only needs to acknowledge the exchange happened.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Http2Error;
use crate::http2::frame::Frame;
use crate::http2::Session;

/// Accept a `SETTINGS` frame unconditionally.
pub async fn handle<S>(_session: &mut Session<S>, _frame: &Frame) -> Result<bool, Http2Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    Ok(true)
}
