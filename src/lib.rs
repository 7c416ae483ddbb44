//! A static-content HTTPS server: an in-memory precompressed file cache
//! served over HTTP/1.1 and HTTP/2, fronted by TLS with ALPN protocol
//! selection, admission-controlled by a fixed-capacity worker scheduler,
//! plus a plaintext `:80` redirector.

pub mod cache;
pub mod error;
pub mod http1;
pub mod http2;
pub mod io;
pub mod options;
pub mod product;
pub mod redirect;
pub mod scheduler;
pub mod security;
pub mod statistics;

use std::sync::Arc;

use rama_boring::ssl::SslAcceptor;
use rama_core::graceful::ShutdownGuard;
use rama_error::BoxError;
use tokio::net::TcpStream;

use cache::FileCache;
use options::ServerConfig;
use scheduler::Scheduler;
use statistics::Statistics;

/// Everything the running process needs, built once at startup and shared
/// by every connection worker for the rest of the process's life.
///
/// Workers only ever borrow from a `Server`; nothing here is ever handed
/// out for ownership, so there is no cycle to reason about.
pub struct Server {
    config: ServerConfig,
    cache: FileCache,
    acceptor: SslAcceptor,
    statistics: Statistics,
}

impl Server {
    /// Build a server: walk and precompress the content root, then build
    /// the TLS acceptor from the configured certificate material.
    ///
    /// The content-root walk touches the filesystem repeatedly and can be
    /// slow for large sites, so callers are expected to run this inside
    /// [`tokio::task::spawn_blocking`] rather than on an async worker
    /// thread directly.
    pub fn build(config: ServerConfig) -> Result<Self, BoxError> {
        let cache = FileCache::build(&config.content_root, &config.cache_root)?;
        let acceptor = security::build_acceptor(&config)?;

        Ok(Self {
            config,
            cache,
            acceptor,
            statistics: Statistics::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    #[must_use]
    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Run the plaintext-to-HTTPS redirector until `guard` is cancelled.
    ///
    /// Every accepted connection is admitted onto `scheduler` just like an
    /// HTTPS connection would be: a slow or hostile peer on port 80 still
    /// only costs one worker slot, never an unbounded thread.
    pub async fn serve_redirect(
        self: Arc<Self>,
        listener: tokio::net::TcpListener,
        scheduler: Scheduler,
        guard: ShutdownGuard,
    ) {
        loop {
            let accepted = tokio::select! {
                _ = guard.cancelled() => return,
                accepted = listener.accept() => accepted,
            };

            let (socket, _) = match accepted {
                Ok(pair) => pair,
                Err(err) => {
                    tracing::warn!(error = %err, "redirect accept() failed");
                    continue;
                }
            };

            let server = Arc::clone(&self);
            if !scheduler.admit(socket, move |socket| async move {
                redirect::handle(
                    socket,
                    &server.config.hostname,
                    &server.config.product_name,
                    &server.statistics,
                )
                .await;
            }) {
                tracing::debug!("redirect worker pool full, connection dropped");
            }
        }
    }

    /// Run the HTTPS listener until `guard` is cancelled: accept, hand off
    /// to a worker slot, perform the TLS handshake, then dispatch to the
    /// negotiated protocol's connection loop.
    pub async fn serve_https(
        self: Arc<Self>,
        listener: tokio::net::TcpListener,
        scheduler: Scheduler,
        guard: ShutdownGuard,
    ) {
        loop {
            let accepted = tokio::select! {
                _ = guard.cancelled() => return,
                accepted = listener.accept() => accepted,
            };

            let (socket, peer_addr) = match accepted {
                Ok(pair) => pair,
                Err(err) => {
                    tracing::warn!(error = %err, "https accept() failed");
                    continue;
                }
            };

            let server = Arc::clone(&self);
            if !scheduler.admit(socket, move |socket| async move {
                server.handle_connection(socket, peer_addr).await;
            }) {
                tracing::debug!("https worker pool full, connection dropped");
            }
        }
    }

    async fn handle_connection(&self, socket: TcpStream, peer_addr: std::net::SocketAddr) {
        let (stream, protocol) = match security::accept(&self.acceptor, socket).await {
            Ok(pair) => pair,
            Err(err) => {
                tracing::debug!(peer = %peer_addr, error = %err, "tls handshake failed");
                return;
            }
        };

        match protocol {
            security::NegotiatedProtocol::Http1 => {
                let buffered = tokio::io::BufReader::new(stream);
                let buffered =
                    http1::serve(buffered, &self.cache, &self.config.product_name, &self.statistics).await;
                security::destroy(buffered.into_inner()).await;
            }
            security::NegotiatedProtocol::Http2 => {
                let mut session = http2::Session::new(stream);
                if let Err(err) = session.run().await {
                    tracing::debug!(peer = %peer_addr, error = %err, "http/2 session ended");
                }
            }
        }
    }
}
