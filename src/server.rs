//! Probe server lifecycle.
//!
//! `serve`/`start` block until the server is shut down. `shutdown` can be
//! called from any task holding a reference to the same server (share it
//! behind an `Arc`).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::{create_router, ProbePaths};
use crate::error::ServerError;
use crate::probes::Probes;

/// Probe server options.
#[derive(Debug, Clone)]
pub struct ServerOpts {
    /// Address to listen on.
    pub addr: SocketAddr,
    /// Tracker backing the probe routes.
    pub probes: Arc<Probes>,
    /// Health probe path (default: /healthz).
    pub health_path: Option<String>,
    /// Readiness probe path (default: /readyz).
    pub ready_path: Option<String>,
    /// Startup probe path (default: /startedz).
    pub startup_path: Option<String>,
}

impl ServerOpts {
    /// Options with default probe paths.
    pub fn new(addr: SocketAddr, probes: Arc<Probes>) -> Self {
        Self {
            addr,
            probes,
            health_path: None,
            ready_path: None,
            startup_path: None,
        }
    }
}

/// HTTP server exposing the startup, readiness and health probes.
#[derive(Debug)]
pub struct ProbeServer {
    addr: SocketAddr,
    paths: ProbePaths,
    router: Router,
    /// Set once shutdown is requested.
    stop: watch::Sender<bool>,
    /// Number of running accept loops.
    active: watch::Sender<usize>,
}

impl ProbeServer {
    /// Build a server. Fails if the probe paths cannot be routed.
    pub fn new(opts: ServerOpts) -> Result<Self, ServerError> {
        let paths = ProbePaths::resolve(opts.health_path, opts.ready_path, opts.startup_path);
        paths.validate()?;

        let router = create_router(opts.probes, &paths);
        let (stop, _) = watch::channel(false);
        let (active, _) = watch::channel(0);

        Ok(Self {
            addr: opts.addr,
            paths,
            router,
            stop,
            active,
        })
    }

    /// Configured listen address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Resolved probe paths.
    pub fn paths(&self) -> &ProbePaths {
        &self.paths
    }

    /// True while at least one accept loop is running.
    pub fn is_serving(&self) -> bool {
        self.active_serves() > 0
    }

    /// Number of `serve` calls currently running.
    pub fn active_serves(&self) -> usize {
        *self.active.borrow()
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        TcpListener::bind(self.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.addr,
                source,
            })
    }

    /// Bind and serve until shut down.
    pub async fn start(&self) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shut down.
    ///
    /// Returns `Ok(())` once a graceful shutdown has drained, and
    /// [`ServerError::Closed`] if shutdown was requested before serving began.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        self.active.send_modify(|n| *n += 1);
        let mut stop = self.stop.subscribe();
        if *stop.borrow() {
            self.active.send_modify(|n| *n -= 1);
            return Err(ServerError::Closed);
        }

        match listener.local_addr() {
            Ok(addr) => info!(%addr, "Probe server listening"),
            Err(e) => warn!("Probe server listening on unknown address: {}", e),
        }

        let result = axum::serve(listener, self.router.clone())
            .with_graceful_shutdown(async move {
                let _ = stop.wait_for(|stopped| *stopped).await;
            })
            .await;

        self.active.send_modify(|n| *n -= 1);
        info!("Probe server stopped");
        result.map_err(ServerError::Serve)
    }

    /// Stop accepting connections and wait up to `deadline` for in-flight
    /// requests to finish.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), ServerError> {
        info!(?deadline, "Shutting down probe server");
        self.stop.send_replace(true);

        let mut active = self.active.subscribe();
        // The sender lives in `self`, so the wait only ends once every
        // accept loop has drained.
        let drained = tokio::time::timeout(deadline, async move {
            let _ = active.wait_for(|n| *n == 0).await;
        })
        .await;

        if drained.is_err() {
            warn!(?deadline, "Probe server did not drain before deadline");
            return Err(ServerError::ShutdownTimeout(deadline));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::task::JoinHandle;

    fn local_opts() -> ServerOpts {
        ServerOpts::new(
            SocketAddr::from(([127, 0, 0, 1], 0)),
            Arc::new(Probes::default()),
        )
    }

    #[test]
    fn new_resolves_default_paths() {
        let server = ProbeServer::new(local_opts()).unwrap();
        assert_eq!(server.paths(), &ProbePaths::default());
    }

    #[test]
    fn new_rejects_duplicate_paths() {
        let mut opts = local_opts();
        opts.ready_path = Some("/startedz".to_string());
        assert!(matches!(
            ProbeServer::new(opts),
            Err(ServerError::InvalidPath { .. })
        ));
    }

    #[tokio::test]
    async fn shutdown_before_start_is_ok() {
        let server = ProbeServer::new(local_opts()).unwrap();
        assert!(!server.is_serving());
        server.shutdown(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn serve_after_shutdown_is_closed() {
        let server = ProbeServer::new(local_opts()).unwrap();
        server.shutdown(Duration::from_secs(1)).await.unwrap();

        let listener = server.bind().await.unwrap();
        assert!(matches!(
            server.serve(listener).await,
            Err(ServerError::Closed)
        ));
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut opts = local_opts();
        opts.addr = taken.local_addr().unwrap();
        let server = ProbeServer::new(opts).unwrap();

        let err = server.start().await.unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));
    }

    #[tokio::test]
    async fn graceful_shutdown_ends_serve() {
        let server = Arc::new(ProbeServer::new(local_opts()).unwrap());
        let listener = server.bind().await.unwrap();

        let running = Arc::clone(&server);
        let handle = tokio::spawn(async move { running.serve(listener).await });

        while !server.is_serving() {
            tokio::task::yield_now().await;
        }
        server.shutdown(Duration::from_secs(5)).await.unwrap();
        handle.await.unwrap().unwrap();
        assert!(!server.is_serving());
    }

    type ServeHandle = JoinHandle<Result<(), ServerError>>;

    async fn spawn_serve(server: &Arc<ProbeServer>) -> (SocketAddr, ServeHandle) {
        let listener = server.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();
        let running = Arc::clone(server);
        let handle = tokio::spawn(async move { running.serve(listener).await });
        (addr, handle)
    }

    /// Open a connection and send only part of a request head.
    async fn half_sent_request(addr: SocketAddr) -> TcpStream {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /healthz HTTP/1.1\r\nHost: local\r\n")
            .await
            .unwrap();
        // Give the accept loop time to pick the connection up.
        tokio::time::sleep(Duration::from_millis(100)).await;
        stream
    }

    #[tokio::test]
    async fn shutdown_deadline_exceeded_by_pending_request() {
        let server = Arc::new(ProbeServer::new(local_opts()).unwrap());
        let (addr, handle) = spawn_serve(&server).await;
        let stream = half_sent_request(addr).await;

        let err = server
            .shutdown(Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::ShutdownTimeout(d) if d == Duration::from_millis(300)));
        assert!(TcpStream::connect(addr).await.is_err());

        drop(stream);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn in_flight_request_completes_during_shutdown() {
        let server = Arc::new(ProbeServer::new(local_opts()).unwrap());
        let (addr, handle) = spawn_serve(&server).await;
        let mut stream = half_sent_request(addr).await;

        let stopping = Arc::clone(&server);
        let shutdown =
            tokio::spawn(async move { stopping.shutdown(Duration::from_secs(5)).await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(TcpStream::connect(addr).await.is_err());

        stream.write_all(b"\r\n").await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        assert!(response.starts_with(b"HTTP/1.1 200"));

        shutdown.await.unwrap().unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn shutdown_waits_for_every_serve() {
        let server = Arc::new(ProbeServer::new(local_opts()).unwrap());
        let (_, first) = spawn_serve(&server).await;
        let (second_addr, second) = spawn_serve(&server).await;
        while server.active_serves() < 2 {
            tokio::task::yield_now().await;
        }
        let stream = half_sent_request(second_addr).await;

        // The idle loop finishes right away; the other is still draining.
        let err = server
            .shutdown(Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::ShutdownTimeout(_)));
        first.await.unwrap().unwrap();
        assert_eq!(server.active_serves(), 1);

        drop(stream);
        second.await.unwrap().unwrap();
        assert_eq!(server.active_serves(), 0);
    }
}
