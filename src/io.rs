//! Low level socket setup shared by the redirector and the HTTPS listener.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;

use crate::error::SchedulerError;

/// Bind a `TcpListener` on `0.0.0.0:port` with `SO_REUSEADDR` set and the
/// listen backlog sized for a busy edge listener.
///
/// The backlog is sized generously since `tokio`'s accept loop is not
/// thread-per-connection bound, unlike a single-backlog-slot listener.
pub fn bind_listener(port: u16) -> Result<TcpListener, SchedulerError> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
        .map_err(|source| SchedulerError::Bind { port, source })?;

    socket
        .set_reuse_address(true)
        .map_err(|source| SchedulerError::Bind { port, source })?;
    socket
        .set_nonblocking(true)
        .map_err(|source| SchedulerError::Bind { port, source })?;

    let addr: SocketAddr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port).into();
    socket
        .bind(&addr.into())
        .map_err(|source| SchedulerError::Bind { port, source })?;
    socket
        .listen(1024)
        .map_err(|source| SchedulerError::Bind { port, source })?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener).map_err(|source| SchedulerError::Bind { port, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_listener_picks_an_ephemeral_port() {
        let listener = bind_listener(0).unwrap();
        let addr = listener.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
    }
}
