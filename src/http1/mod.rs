//! The HTTP/1.1 request state machine: a byte-oriented parser, conditional
//! response assembly, and the keep-alive loop that drives both.
//!
//! Every read goes through the connection's buffered reader one logical
//! token at a time, via `tokio::io::BufReader` rather than a hand-rolled
//! ring buffer.

pub mod response;

use std::time::{Duration, Instant};

use tokio::io::{AsyncBufRead, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::cache::{FileCache, ENCODING_IDENTITY};
use crate::error::Http1Error;
use crate::statistics::Statistics;
use response::HitResponse;

const METHOD_MAX: usize = 64;
const TARGET_MAX: usize = 2048;
const HEADER_NAME_MAX: usize = 64;
const HEADER_VALUE_MAX: usize = 256;
/// The largest value an 8-bit header count can hold without wrapping.
const MAX_HEADERS: usize = 255;

/// A fully parsed HTTP/1.1 request line and header block.
#[derive(Debug)]
pub struct Request {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
}

impl Request {
    /// Case-insensitive header lookup, first match wins (transmission
    /// order), matching RFC 7230's name-comparison rule.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// RFC 7230 §3.2.6 `tchar`.
fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
        )
}

async fn read_byte<R: AsyncRead + Unpin>(reader: &mut R) -> Result<u8, Http1Error> {
    reader.read_u8().await.map_err(Http1Error::from)
}

async fn read_target<R: AsyncRead + Unpin>(reader: &mut R) -> Result<String, Http1Error> {
    let mut buf = Vec::with_capacity(64);
    loop {
        let b = read_byte(reader).await?;
        if b == b' ' {
            break;
        }
        if b == 0 {
            return Err(Http1Error::PathInvalid);
        }
        buf.push(b);
        if buf.len() > TARGET_MAX {
            return Err(Http1Error::PathTooLong);
        }
    }
    String::from_utf8(buf).map_err(|_| Http1Error::PathInvalid)
}

/// Read exactly 8 bytes and apply a deliberately lenient version check:
/// the literal must look like `HTTP/x.y`, but either digit being `1` is
/// accepted regardless of the other (so `HTTP/1.0`, `HTTP/1.1`, and even
/// the nonsensical `HTTP/0.1`/`HTTP/9.1` all pass). A candidate for
/// tightening later, kept lenient for now.
async fn read_version<R: AsyncRead + Unpin>(reader: &mut R) -> Result<(), Http1Error> {
    let mut version = [0u8; 8];
    reader.read_exact(&mut version).await?;

    if &version[0..5] != b"HTTP/" {
        return Err(Http1Error::VersionInvalid);
    }
    if version[6] != b'.' {
        return Err(Http1Error::VersionInvalid);
    }
    if version[5] != b'1' && version[7] != b'1' {
        return Err(Http1Error::VersionUnsupported);
    }

    Ok(())
}

async fn read_headers<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<(String, String)>, Http1Error> {
    let mut headers = Vec::new();

    loop {
        let first = read_byte(reader).await?;
        if first == b'\r' {
            if read_byte(reader).await? != b'\n' {
                return Err(Http1Error::HeaderInvalidName);
            }
            break;
        }
        if first == b':' {
            return Err(Http1Error::HeaderEmptyName);
        }
        if !is_token_char(first) {
            return Err(Http1Error::HeaderInvalidName);
        }

        let mut name = vec![first];
        loop {
            let b = read_byte(reader).await?;
            if b == b':' {
                break;
            }
            if !is_token_char(b) {
                return Err(Http1Error::HeaderInvalidName);
            }
            name.push(b);
            if name.len() > HEADER_NAME_MAX {
                return Err(Http1Error::HeaderNameTooLong);
            }
        }

        // Consume OWS = *( SP / HTAB ) before the field-value.
        let mut b = read_byte(reader).await?;
        while b == b' ' || b == b'\t' {
            b = read_byte(reader).await?;
        }

        let mut value = Vec::new();
        loop {
            if b == b'\r' {
                if read_byte(reader).await? != b'\n' {
                    return Err(Http1Error::HeaderInvalidValue);
                }
                break;
            }
            if b != b' ' && b != b'\t' && !(0x21..=0x7E).contains(&b) {
                return Err(Http1Error::HeaderInvalidValue);
            }
            value.push(b);
            if value.len() > HEADER_VALUE_MAX {
                return Err(Http1Error::HeaderValueTooLong);
            }
            b = read_byte(reader).await?;
        }

        while matches!(value.last(), Some(b' ') | Some(b'\t')) {
            value.pop();
        }
        if value.is_empty() {
            return Err(Http1Error::HeaderEmptyValue);
        }

        let name = String::from_utf8(name).map_err(|_| Http1Error::HeaderInvalidName)?;
        let value = String::from_utf8(value).map_err(|_| Http1Error::HeaderInvalidValue)?;
        headers.push((name, value));

        if headers.len() > MAX_HEADERS {
            return Err(Http1Error::TooManyHeaders);
        }
    }

    Ok(headers)
}

/// Per-phase timings recorded for one request, observational only — they
/// never influence control flow.
#[derive(Debug, Default, Clone, Copy)]
struct PhaseTimings {
    buffering: Duration,
    read_method: Duration,
    read_target: Duration,
    read_version: Duration,
    read_headers: Duration,
    handling: Duration,
}

/// Parse one request off `reader`. The "buffering" timing bucket covers
/// waiting for the first byte of the method.
async fn parse_request<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<(Request, PhaseTimings), Http1Error> {
    let mut timings = PhaseTimings::default();

    let buffering_start = Instant::now();
    let first_method_byte = read_byte(reader).await?;
    timings.buffering = buffering_start.elapsed();

    let read_method_start = Instant::now();
    let mut method_buf = Vec::with_capacity(16);
    let mut b = first_method_byte;
    loop {
        if b == b' ' {
            break;
        }
        if !is_token_char(b) {
            return Err(Http1Error::MethodInvalid);
        }
        method_buf.push(b);
        if method_buf.len() > METHOD_MAX {
            return Err(Http1Error::MethodTooLong);
        }
        b = read_byte(reader).await?;
    }
    let method = String::from_utf8(method_buf).map_err(|_| Http1Error::MethodInvalid)?;
    timings.read_method = read_method_start.elapsed();

    let read_target_start = Instant::now();
    let target = read_target(reader).await?;
    timings.read_target = read_target_start.elapsed();

    let read_version_start = Instant::now();
    read_version(reader).await?;
    // CRLF is consumed but not validated — a lenient no-op.
    let mut crlf = [0u8; 2];
    reader.read_exact(&mut crlf).await?;
    timings.read_version = read_version_start.elapsed();

    let read_headers_start = Instant::now();
    let headers = read_headers(reader).await?;
    timings.read_headers = read_headers_start.elapsed();

    Ok((
        Request {
            method,
            target,
            headers,
        },
        timings,
    ))
}

fn accepts_brotli(request: &Request) -> bool {
    // Both the `br` and `gzip` preference bits are applied unconditionally
    // regardless of what `Accept-Encoding` actually says; no real content
    // negotiation is performed.
    let _ = request.header("accept-encoding");
    true
}

async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, head: &str, body: &[u8]) -> Result<(), Http1Error> {
    writer.write_all(head.as_bytes()).await?;
    if !body.is_empty() {
        writer.write_all(body).await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Handle one request: cache lookup, conditional check, response
/// assembly. Returns `Ok(true)` if the connection should stay open for
/// another request, `Ok(false)` if this response closes the connection.
async fn handle_request<W: AsyncWrite + Unpin>(
    writer: &mut W,
    request: &Request,
    cache: &FileCache,
    product: &str,
) -> Result<bool, Http1Error> {
    let Some(hit) = cache.lookup(&request.target, accepts_brotli(request)) else {
        tracing::debug!(path = %request.target, not_found = true, "request miss");
        write_response(writer, &response::render_not_found(product), &[]).await?;
        return Ok(false);
    };

    let last_modified = response::format_date(hit.modified);
    let is_unchanged = request
        .header("if-modified-since")
        .is_some_and(|value| value == last_modified);

    if is_unchanged {
        tracing::debug!(path = %request.target, client_cached = true, "request not modified");
        write_response(writer, &response::render_not_modified(product), &[]).await?;
        return Ok(true);
    }

    let compressed = hit.encoding != ENCODING_IDENTITY;
    let hit_response = HitResponse {
        encoding: hit.encoding,
        media_type: hit.media_type,
        media_charset: hit.media_charset,
        modified: hit.modified,
        body: hit.data,
    };
    let head = response::render_hit_headers(&hit_response, product);
    tracing::debug!(
        path = %request.target,
        compressed,
        encoding = hit_response.encoding,
        "request served"
    );
    write_response(writer, &head, &hit_response.body).await?;
    Ok(true)
}

/// Drive the keep-alive loop for one connection: parse a request, handle
/// it, and repeat until any phase fails.
///
/// `io` is handed back to the caller once the loop ends, whatever the
/// reason, so a caller wrapping a TLS stream can still run its own
/// teardown sequence on the unwrapped connection.
pub async fn serve<S>(mut io: S, cache: &FileCache, product: &str, statistics: &Statistics) -> S
where
    S: AsyncBufRead + AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let parsed = parse_request(&mut io).await;

        let (request, timings) = match parsed {
            Ok(pair) => pair,
            Err(err) => {
                if err.is_recoverable() {
                    tracing::debug!(error = %err, "request parse error");
                    // Every parse error funnels into the same canned 404,
                    // then the connection closes. A cache miss is treated
                    // the same way below.
                    let _ = write_response(&mut io, &response::render_not_found(product), &[]).await;
                }
                return io;
            }
        };

        statistics.notify_request();

        let handling_start = Instant::now();
        let keep_alive = handle_request(&mut io, &request, cache, product).await;
        let handling = handling_start.elapsed();

        match keep_alive {
            Ok(true) => {
                tracing::debug!(
                    path = %request.target,
                    buffering_us = timings.buffering.as_micros(),
                    read_method_us = timings.read_method.as_micros(),
                    read_target_us = timings.read_target.as_micros(),
                    read_version_us = timings.read_version.as_micros(),
                    read_headers_us = timings.read_headers.as_micros(),
                    handling_us = handling.as_micros(),
                    "request timings"
                );
            }
            Ok(false) | Err(_) => return io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn parses_simple_get() {
        let raw = b"GET /index.html HTTP/1.1\r\nHost: example\r\n\r\n";
        let mut cursor = Cursor::new(raw.to_vec());
        let (request, _) = parse_request(&mut cursor).await.unwrap();
        assert_eq!(request.method, "GET");
        assert_eq!(request.target, "/index.html");
        assert_eq!(request.header("host"), Some("example"));
        assert_eq!(request.header("HOST"), Some("example"));
    }

    #[tokio::test]
    async fn rejects_invalid_method_character() {
        let raw = b"GE\x01T / HTTP/1.1\r\n\r\n";
        let mut cursor = Cursor::new(raw.to_vec());
        let err = parse_request(&mut cursor).await.unwrap_err();
        assert!(matches!(err, Http1Error::MethodInvalid));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn accepts_lenient_version() {
        let raw = b"GET / HTTP/1.0\r\n\r\n";
        let mut cursor = Cursor::new(raw.to_vec());
        let (request, _) = parse_request(&mut cursor).await.unwrap();
        assert_eq!(request.target, "/");
    }

    #[tokio::test]
    async fn rejects_unsupported_version() {
        let raw = b"GET / HTTP/2.2\r\n\r\n";
        let mut cursor = Cursor::new(raw.to_vec());
        let err = parse_request(&mut cursor).await.unwrap_err();
        assert!(matches!(err, Http1Error::VersionUnsupported));
    }

    #[tokio::test]
    async fn rejects_empty_header_value() {
        let raw = b"GET / HTTP/1.1\r\nX-Empty: \r\n\r\n";
        let mut cursor = Cursor::new(raw.to_vec());
        let err = parse_request(&mut cursor).await.unwrap_err();
        assert!(matches!(err, Http1Error::HeaderEmptyValue));
    }

    #[tokio::test]
    async fn rejects_empty_header_name() {
        let raw = b"GET / HTTP/1.1\r\n: value\r\n\r\n";
        let mut cursor = Cursor::new(raw.to_vec());
        let err = parse_request(&mut cursor).await.unwrap_err();
        assert!(matches!(err, Http1Error::HeaderEmptyName));
    }

    #[tokio::test]
    async fn trims_trailing_whitespace_from_header_value() {
        let raw = b"GET / HTTP/1.1\r\nX-Pad: value  \t \r\n\r\n";
        let mut cursor = Cursor::new(raw.to_vec());
        let (request, _) = parse_request(&mut cursor).await.unwrap();
        assert_eq!(request.header("x-pad"), Some("value"));
    }

    #[tokio::test]
    async fn serve_writes_404_for_a_missing_path() {
        let content = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        let cache = FileCache::build(content.path(), cache_dir.path()).unwrap();
        let statistics = Statistics::new();

        let request = b"GET /missing.html HTTP/1.1\r\n\r\n".to_vec();
        let io = tokio::io::BufReader::new(Cursor::new(request));
        let mut io = tokio_test_io::ReadWrite::new(io);

        let _ = serve(&mut io, &cache, "rampart", &statistics).await;
        let written = io.written();
        assert!(written.starts_with(b"HTTP/1.1 404 Not Found"));
    }

    /// Minimal in-test adapter giving a `Cursor`-backed reader a no-op,
    /// observable `AsyncWrite` half, since `Cursor<Vec<u8>>` alone only
    /// implements one side.
    mod tokio_test_io {
        use std::pin::Pin;
        use std::task::{Context, Poll};
        use tokio::io::{AsyncBufRead, AsyncRead, AsyncWrite, ReadBuf};

        pub struct ReadWrite<R> {
            reader: R,
            written: Vec<u8>,
        }

        impl<R> ReadWrite<R> {
            pub fn new(reader: R) -> Self {
                Self {
                    reader,
                    written: Vec::new(),
                }
            }

            pub fn written(&self) -> &[u8] {
                &self.written
            }
        }

        impl<R: AsyncRead + Unpin> AsyncRead for ReadWrite<R> {
            fn poll_read(
                mut self: Pin<&mut Self>,
                cx: &mut Context<'_>,
                buf: &mut ReadBuf<'_>,
            ) -> Poll<std::io::Result<()>> {
                Pin::new(&mut self.reader).poll_read(cx, buf)
            }
        }

        impl<R: AsyncBufRead + Unpin> AsyncBufRead for ReadWrite<R> {
            fn poll_fill_buf(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<&[u8]>> {
                Pin::new(&mut self.get_mut().reader).poll_fill_buf(cx)
            }

            fn consume(mut self: Pin<&mut Self>, amt: usize) {
                Pin::new(&mut self.reader).consume(amt);
            }
        }

        impl<R: Unpin> AsyncWrite for ReadWrite<R> {
            fn poll_write(
                mut self: Pin<&mut Self>,
                _cx: &mut Context<'_>,
                buf: &[u8],
            ) -> Poll<std::io::Result<usize>> {
                self.written.extend_from_slice(buf);
                Poll::Ready(Ok(buf.len()))
            }

            fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
                Poll::Ready(Ok(()))
            }

            fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
                Poll::Ready(Ok(()))
            }
        }
    }
}
