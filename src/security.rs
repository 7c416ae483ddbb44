//! TLS context setup, ALPN negotiation, and per-connection handshake.
//!
//! Built on `rama-boring`/`rama-boring-tokio`. `SslAcceptor` plays the role
//! of a process-wide `SSL_CTX`; the ALPN selection callback below preserves
//! the "first `h2` wins immediately, `http/1.1` only wins if nothing better
//! was offered" behaviour.

use std::path::Path;
use std::time::Duration;

use rama_boring::ssl::{AlpnError, SslAcceptor, SslFiletype, SslMethod, SslVersion};
use rama_boring_tokio::SslStream;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::SecurityError;
use crate::options::ServerConfig;

/// How long the server waits for the first byte of a TLS handshake before
/// giving up on an idle connection.
const HANDSHAKE_READINESS_TIMEOUT: Duration = Duration::from_millis(300);

const ALPN_HTTP1: &[u8] = b"http/1.1";
const ALPN_HTTP2: &[u8] = b"h2";

/// Protocol negotiated over ALPN for one connection.
///
/// A peer that didn't use ALPN at all and one that negotiated `http/1.1`
/// both end up running the HTTP/1.1 handler, so there is no separate
/// `None` variant here — callers never need to distinguish them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiatedProtocol {
    Http1,
    Http2,
}

/// Build the process-wide TLS acceptor: certificate material, cipher
/// configuration, and the ALPN callback.
pub fn build_acceptor(config: &ServerConfig) -> Result<SslAcceptor, SecurityError> {
    let mut builder =
        SslAcceptor::builder(SslMethod::tls()).map_err(|err| SecurityError::Context(Box::new(err)))?;

    builder
        .set_min_proto_version(Some(SslVersion::TLS1_2))
        .map_err(|err| SecurityError::Context(Box::new(err)))?;

    builder
        .set_cipher_list(&config.tls_cipher_list)
        .map_err(|err| SecurityError::Cipher(Box::new(err)))?;
    builder
        .set_ciphersuites(&config.tls_cipher_suites)
        .map_err(|err| SecurityError::Cipher(Box::new(err)))?;

    load_certificate_material(&mut builder, &config.tls_cert, &config.tls_chain, &config.tls_key)?;

    builder.set_alpn_select_callback(|_ssl, client_protocols| select_alpn(client_protocols));

    Ok(builder.build())
}

fn load_certificate_material(
    builder: &mut rama_boring::ssl::SslAcceptorBuilder,
    cert: &Path,
    chain: &Path,
    key: &Path,
) -> Result<(), SecurityError> {
    builder
        .set_certificate_file(cert, SslFiletype::PEM)
        .map_err(|source| SecurityError::Material {
            what: "certificate",
            source: Box::new(source),
        })?;

    // One call is sufficient for the chain to be presented during the
    // handshake.
    builder
        .set_certificate_chain_file(chain)
        .map_err(|source| SecurityError::Material {
            what: "certificate chain",
            source: Box::new(source),
        })?;

    builder
        .set_private_key_file(key, SslFiletype::PEM)
        .map_err(|source| SecurityError::Material {
            what: "private key",
            source: Box::new(source),
        })?;

    Ok(())
}

/// Walk the client's ALPN protocol list (wire format: repeated
/// `[len:u8][bytes]`), preferring `h2` over `http/1.1` the moment it is
/// seen, falling back to `http/1.1` only once the whole list has been
/// scanned with no `h2` present.
fn select_alpn(client_protocols: &[u8]) -> Result<&'static [u8], AlpnError> {
    let mut pos = 0usize;
    let mut http1_seen = false;

    while pos < client_protocols.len() {
        let len = client_protocols[pos] as usize;
        pos += 1;

        if len == 0 || pos + len > client_protocols.len() {
            return Err(AlpnError::ALERT_FATAL);
        }

        let candidate = &client_protocols[pos..pos + len];
        if candidate == ALPN_HTTP2 {
            return Ok(ALPN_HTTP2);
        }
        if candidate == ALPN_HTTP1 {
            http1_seen = true;
        }

        pos += len;
    }

    if http1_seen {
        Ok(ALPN_HTTP1)
    } else {
        Err(AlpnError::ALERT_FATAL)
    }
}

/// Perform the TLS handshake on an accepted TCP connection, waiting for the
/// peer to send something first so a purely idle socket does not tie up a
/// worker slot forever.
pub async fn accept(
    acceptor: &SslAcceptor,
    socket: TcpStream,
) -> Result<(SslStream<TcpStream>, NegotiatedProtocol), SecurityError> {
    tokio::time::timeout(HANDSHAKE_READINESS_TIMEOUT, socket.readable())
        .await
        .map_err(|_| SecurityError::Handshake("idle before handshake data arrived".into()))?
        .map_err(|err| SecurityError::Handshake(Box::new(err)))?;

    let stream = rama_boring_tokio::accept(acceptor, socket)
        .await
        .map_err(|err| SecurityError::Handshake(Box::new(err)))?;

    let protocol = match stream.ssl().selected_alpn_protocol() {
        Some(proto) if proto == ALPN_HTTP2 => NegotiatedProtocol::Http2,
        _ => NegotiatedProtocol::Http1,
    };

    Ok((stream, protocol))
}

/// Tear down a TLS endpoint: probe for a still-sending peer and, if found,
/// send a close-notify before releasing it.
pub async fn destroy(mut stream: SslStream<TcpStream>) {
    let mut probe = [0u8; 1];
    if matches!(stream.read(&mut probe).await, Ok(n) if n > 0) {
        let _ = stream.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_alpn(protocols: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for proto in protocols {
            out.push(proto.len() as u8);
            out.extend_from_slice(proto);
        }
        out
    }

    #[test]
    fn select_alpn_prefers_h2_even_when_listed_second() {
        let wire = encode_alpn(&[b"http/1.1", b"h2"]);
        assert_eq!(select_alpn(&wire).unwrap(), ALPN_HTTP2);
    }

    #[test]
    fn select_alpn_falls_back_to_http1() {
        let wire = encode_alpn(&[b"http/1.1"]);
        assert_eq!(select_alpn(&wire).unwrap(), ALPN_HTTP1);
    }

    #[test]
    fn select_alpn_rejects_when_neither_offered() {
        let wire = encode_alpn(&[b"spdy/3.1"]);
        assert!(select_alpn(&wire).is_err());
    }

    #[test]
    fn select_alpn_rejects_malformed_length() {
        let wire = vec![200u8, b'h', b'2'];
        assert!(select_alpn(&wire).is_err());
    }
}
