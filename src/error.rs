//! Per-subsystem error types.
//!
//! Each subsystem gets its own small `enum` rather than a single catch-all
//! error, so callers can match on the cases that matter to them and let the
//! rest flow through [`rama_error::BoxError`] at the boundary.

use std::fmt;

use rama_error::BoxError;

/// Errors raised while building or looking things up in the file cache.
#[derive(Debug)]
pub enum CacheError {
    /// Walking the content root failed.
    Walk(BoxError),
    /// A cache entry could not be read from disk.
    Read { path: String, source: std::io::Error },
    /// Recursive directory creation under the artifact cache root failed.
    CreateArtifactDir(std::io::Error),
    /// Brotli compression produced no usable output.
    Compress(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Walk(err) => write!(f, "failed to walk content root: {err}"),
            Self::Read { path, source } => write!(f, "failed to read '{path}': {source}"),
            Self::CreateArtifactDir(err) => {
                write!(f, "failed to create artifact cache directory: {err}")
            }
            Self::Compress(msg) => write!(f, "compression failed: {msg}"),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Walk(err) => Some(err.as_ref()),
            Self::Read { source, .. } => Some(source),
            Self::CreateArtifactDir(err) => Some(err),
            Self::Compress(_) => None,
        }
    }
}

/// Errors raised while setting up the TLS layer.
#[derive(Debug)]
pub enum SecurityError {
    /// Constructing the `boring` [`rama_boring::ssl::SslAcceptorBuilder`] failed.
    Context(BoxError),
    /// Loading the certificate, chain or private key file failed.
    Material { what: &'static str, source: BoxError },
    /// Setting the cipher list or ciphersuites string failed.
    Cipher(BoxError),
    /// The handshake itself (including ALPN negotiation) failed.
    Handshake(BoxError),
}

impl fmt::Display for SecurityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Context(err) => write!(f, "failed to build TLS context: {err}"),
            Self::Material { what, source } => {
                write!(f, "failed to load {what}: {source}")
            }
            Self::Cipher(err) => write!(f, "failed to configure ciphers: {err}"),
            Self::Handshake(err) => write!(f, "TLS handshake failed: {err}"),
        }
    }
}

impl std::error::Error for SecurityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Context(err) | Self::Cipher(err) | Self::Handshake(err) => Some(err.as_ref()),
            Self::Material { source, .. } => Some(source.as_ref()),
        }
    }
}

/// Errors surfaced while parsing or responding to an HTTP/1.1 request.
///
/// Every variant other than [`Http1Error::Io`] corresponds to a message the
/// peer sent that this server refuses to process further; the caller decides
/// whether the connection can still be kept alive.
#[derive(Debug)]
pub enum Http1Error {
    Io(std::io::Error),
    MethodInvalid,
    MethodTooLong,
    PathInvalid,
    PathTooLong,
    VersionInvalid,
    VersionUnsupported,
    HeaderInvalidName,
    HeaderNameTooLong,
    HeaderEmptyName,
    HeaderInvalidValue,
    HeaderEmptyValue,
    HeaderValueTooLong,
    TooManyHeaders,
}

impl Http1Error {
    /// Whether this error still allows the connection to stay open
    /// (a well-formed error response was sent) or whether it must be torn
    /// down immediately.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

impl fmt::Display for Http1Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::MethodInvalid => write!(f, "invalid method token"),
            Self::MethodTooLong => write!(f, "method token too long"),
            Self::PathInvalid => write!(f, "invalid request-target"),
            Self::PathTooLong => write!(f, "request-target too long"),
            Self::VersionInvalid => write!(f, "malformed HTTP version"),
            Self::VersionUnsupported => write!(f, "unsupported HTTP version"),
            Self::HeaderInvalidName => write!(f, "invalid header field-name"),
            Self::HeaderNameTooLong => write!(f, "header field-name too long"),
            Self::HeaderEmptyName => write!(f, "empty header field-name"),
            Self::HeaderInvalidValue => write!(f, "invalid header field-value"),
            Self::HeaderEmptyValue => write!(f, "empty header field-value"),
            Self::HeaderValueTooLong => write!(f, "header field-value too long"),
            Self::TooManyHeaders => write!(f, "too many header fields"),
        }
    }
}

impl From<std::io::Error> for Http1Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl std::error::Error for Http1Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors surfaced while driving an HTTP/2 session.
#[derive(Debug)]
pub enum Http2Error {
    Io(std::io::Error),
    PrefaceMismatch,
    FrameTooLarge { length: u32 },
    SessionTerminated,
}

impl fmt::Display for Http2Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::PrefaceMismatch => write!(f, "connection preface did not match"),
            Self::FrameTooLarge { length } => write!(f, "frame length {length} rejected"),
            Self::SessionTerminated => write!(f, "session was terminated"),
        }
    }
}

impl From<std::io::Error> for Http2Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl std::error::Error for Http2Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors raised while binding sockets or managing the worker slot table.
#[derive(Debug)]
pub enum SchedulerError {
    Bind { port: u16, source: std::io::Error },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind { port, source } => write!(f, "failed to bind port {port}: {source}"),
        }
    }
}

impl std::error::Error for SchedulerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bind { source, .. } => Some(source),
        }
    }
}
