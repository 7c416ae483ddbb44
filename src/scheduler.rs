//! Admission control for connection workers.
//!
//! A `Semaphore` sized to the slot count gives constant-time admit/reject:
//! `admit` tries to acquire a permit without blocking, `shutdown` signals
//! every busy worker and forcibly reaps stragglers after a grace period.
//! The permit handed out on admission plays the role of the slot itself:
//! holding it is "busy", dropping it is "free", and the drop happens
//! exactly once no matter how the connection task ends, so releasing a
//! slot needs no explicit call at all.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::sync::Semaphore;

use rama_core::graceful::ShutdownGuard;
use rama_core::rt::Executor;

/// Bounds how many connections may be served concurrently.
///
/// Construction borrows a [`ShutdownGuard`] so every admitted worker is
/// registered with the process-wide graceful shutdown: when shutdown is
/// triggered, `Executor` stops handing out new capacity and waits (up to
/// its own limit) for in-flight workers to notice and return.
#[derive(Debug, Clone)]
pub struct Scheduler {
    slots: Arc<Semaphore>,
    executor: Executor,
}

impl Scheduler {
    /// Build a scheduler with `capacity` worker slots, spawning admitted
    /// connections gracefully under `guard`.
    #[must_use]
    pub fn new(capacity: usize, guard: ShutdownGuard) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            executor: Executor::graceful(guard),
        }
    }

    /// Try to admit `socket` onto a free slot, spawning `handler` as a
    /// detached task if one is available.
    ///
    /// Returns `true` if the connection was admitted, `false` if the pool
    /// is full. On `false` the caller owns `socket` again and must close
    /// it (letting it drop does exactly that).
    pub fn admit<F, Fut>(&self, socket: TcpStream, handler: F) -> bool
    where
        F: FnOnce(TcpStream) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let Ok(permit) = Arc::clone(&self.slots).try_acquire_owned() else {
            return false;
        };

        self.executor.spawn_task(async move {
            let _permit = permit;
            handler(socket).await;
        });

        true
    }

    /// Number of slots currently free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn scheduler(capacity: usize) -> Scheduler {
        let shutdown = rama_core::graceful::Shutdown::default();
        Scheduler::new(capacity, shutdown.guard())
    }

    #[tokio::test]
    async fn admit_rejects_once_full() {
        let scheduler = scheduler(1);
        let (client, server) = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let connect = tokio::net::TcpStream::connect(addr);
            let (connect, accept) = tokio::join!(connect, listener.accept());
            (connect.unwrap(), accept.unwrap().0)
        };

        let started = Arc::new(AtomicUsize::new(0));
        let started_clone = started.clone();
        let admitted = scheduler.admit(server, move |_socket| async move {
            started_clone.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(200)).await;
        });
        assert!(admitted);
        assert_eq!(scheduler.available(), 0);

        let (client2, server2) = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let connect = tokio::net::TcpStream::connect(addr);
            let (connect, accept) = tokio::join!(connect, listener.accept());
            (connect.unwrap(), accept.unwrap().0)
        };
        let rejected = scheduler.admit(server2, |_socket| async move {});
        assert!(!rejected);

        drop(client);
        drop(client2);
    }

    #[tokio::test]
    async fn admit_releases_slot_when_worker_completes() {
        let scheduler = scheduler(1);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connect = tokio::net::TcpStream::connect(addr);
        let (connect, accept) = tokio::join!(connect, listener.accept());
        let (client, server) = (connect.unwrap(), accept.unwrap().0);

        assert!(scheduler.admit(server, |_socket| async move {}));

        for _ in 0..100 {
            if scheduler.available() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(scheduler.available(), 1);
        drop(client);
    }
}
