//! The plaintext `:80` service: every request, regardless of method or
//! headers, is answered with a `301` pointing at the HTTPS host. Grounded
//! on `redir/server.c`'s accept loop and `redir/client.c`'s per-connection
//! handler, minus the thread-per-connection machinery `Scheduler` already
//! generalizes away.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::http1::response::format_date;
use crate::statistics::Statistics;

/// How long a redirector connection may sit idle before its first byte
/// arrives.
const READINESS_TIMEOUT: Duration = Duration::from_millis(10);

const MAX_PATH_LEN: usize = 2048;

fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
        )
}

/// Skip the request method up to (and including) the separating space,
/// then read the request-target up to the next space.
///
/// Returns `None` on any I/O error, an empty method, a target byte `< 0x20`
/// or equal to `0x7F`, or a path that never terminates within
/// [`MAX_PATH_LEN`] bytes — every case simply gives up on the connection.
/// Rejecting control bytes (in particular `\r`/`\n`) keeps a hostile
/// target from being interpolated into the `Location` header as a
/// CRLF-delimited line of its own.
async fn read_path(socket: &mut TcpStream) -> Option<String> {
    let mut first = [0u8; 1];
    loop {
        socket.read_exact(&mut first).await.ok()?;
        if first[0] == b' ' {
            break;
        }
        if !is_token_char(first[0]) {
            return None;
        }
    }

    let mut path = Vec::with_capacity(32);
    loop {
        socket.read_exact(&mut first).await.ok()?;
        if first[0] == b' ' {
            return String::from_utf8(path).ok();
        }
        if first[0] < 0x20 || first[0] == 0x7F {
            return None;
        }
        path.push(first[0]);
        if path.len() > MAX_PATH_LEN {
            return None;
        }
    }
}

/// Handle one plaintext connection end to end: wait for it to become
/// readable, parse just enough of the request line to recover the path,
/// then answer with a `301` to the same path under the canonical HTTPS
/// host.
pub async fn handle(mut socket: TcpStream, hostname: &str, product: &str, statistics: &Statistics) {
    if tokio::time::timeout(READINESS_TIMEOUT, socket.readable())
        .await
        .is_err()
    {
        return;
    }

    let Some(path) = read_path(&mut socket).await else {
        return;
    };

    statistics.notify_request();

    let body = format!(
        "HTTP/1.1 301 Moved Permanently\r\n\
         Connection: close\r\n\
         Content-Length: 0\r\n\
         Date: {date}\r\n\
         Location: https://{hostname}{path}\r\n\
         Server: {product}\r\n\
         \r\n",
        date = format_date(std::time::SystemTime::now()),
    );

    let _ = socket.write_all(body.as_bytes()).await;
    let _ = socket.shutdown().await;
}
