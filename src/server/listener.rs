// ABOUTME: Binds the listening socket and runs the accept loop, gating admission by semaphore

use super::admission::Admission;
use super::context::ServerContext;
use super::worker;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Binds `0.0.0.0:port` (`None`, empty, or `"0"` picks an ephemeral one).
/// Tokio's listener sets `SO_REUSEADDR` before binding, matching the
/// reference's explicit `setsockopt`. A malformed or out-of-range port
/// string is not validated up front (see [`crate::server::config`]); it
/// is handed straight through to the bind attempt here, the same way the
/// original passes any non-`"0"` port to `getaddrinfo`/`bind` in
/// `check_port` and lets that call fail.
pub async fn bind(port: Option<&str>) -> std::io::Result<TcpListener> {
    let port = match port {
        None => 0,
        Some(s) => s
            .parse::<u16>()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?,
    };
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr).await
}

/// Accepts connections forever, acquiring an admission slot before each
/// `accept` when bounded — matching the reference's `sem_wait` ahead of
/// `accept` in its acceptor loop, so the backpressure shows up before a
/// socket is even pulled off the kernel's queue.
pub async fn run_acceptor(listener: TcpListener, ctx: Arc<ServerContext>, admission: Arc<Admission>) -> ! {
    loop {
        let slot = admission.acquire().await;
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                // Counted here, right after accept, so an accepted
                // connection is never briefly missing from both
                // currentClients and completedClients while its worker
                // task is still waiting to be scheduled.
                ctx.stats.client_connected();
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    worker::run_connection(stream, peer_addr, ctx, slot).await;
                });
            }
            Err(err) => {
                tracing::error!(error = %err, "accept failed");
                drop(slot);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ephemeral_port_binds_successfully() {
        let listener = bind(None).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn malformed_port_is_a_bind_error_not_a_panic() {
        assert!(bind(Some("not-a-port")).await.is_err());
        assert!(bind(Some("99999")).await.is_err());
    }
}
