use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use axum::{Router, routing::get};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::config::IngestConfig;
use crate::handlers::{self, FileServerState};

pub fn build_app(data_dir: impl Into<PathBuf>) -> Router {
    let state = FileServerState::new(data_dir);
    Router::new()
        .route("/status", get(handlers::status))
        .fallback(handlers::serve_file)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
}

/// Static file server exposing the data directory to the FHIR server.
pub struct FileServer {
    addr: SocketAddr,
    app: Router,
    shutdown_timeout: Duration,
}

impl FileServer {
    pub fn new(addr: SocketAddr, data_dir: impl Into<PathBuf>, shutdown_timeout: Duration) -> Self {
        Self {
            addr,
            app: build_app(data_dir),
            shutdown_timeout,
        }
    }

    pub fn from_config(cfg: &IngestConfig) -> anyhow::Result<Self> {
        let addr = cfg.addr().map_err(anyhow::Error::msg)?;
        Ok(Self::new(addr, cfg.data_dir.clone(), cfg.shutdown_timeout()))
    }

    /// Bind and serve in a background task until `cancel` fires.
    pub async fn spawn(self, cancel: CancellationToken) -> anyhow::Result<RunningServer> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("file server listening on {}", local_addr);
        for url in serving_urls(local_addr) {
            tracing::info!("Serving NDJSON files at {url}");
        }

        let Self {
            app,
            shutdown_timeout,
            ..
        } = self;
        let signal = cancel.clone();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { signal.cancelled().await })
                .await
        });

        Ok(RunningServer {
            local_addr,
            handle,
            cancel,
            shutdown_timeout,
        })
    }
}

pub struct RunningServer {
    local_addr: SocketAddr,
    handle: JoinHandle<std::io::Result<()>>,
    cancel: CancellationToken,
    shutdown_timeout: Duration,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Resolves when the server stops on its own (cancellation or error).
    pub async fn wait(self) -> anyhow::Result<()> {
        self.handle.await??;
        Ok(())
    }

    /// Stop accepting connections and let in-flight downloads drain, up to
    /// the shutdown timeout.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.cancel.cancel();
        let mut handle = self.handle;
        match tokio::time::timeout(self.shutdown_timeout, &mut handle).await {
            Ok(joined) => {
                joined??;
                tracing::info!("file server stopped");
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.shutdown_timeout.as_millis() as u64,
                    "file server did not drain in time, aborting"
                );
                handle.abort();
            }
        }
        Ok(())
    }
}

/// Base URLs under which the server can be reached from other hosts.
///
/// A wildcard bind expands to every global-unicast interface address.
pub fn serving_urls(local_addr: SocketAddr) -> Vec<String> {
    let port = local_addr.port();
    if !local_addr.ip().is_unspecified() {
        return vec![base_url(local_addr.ip(), port)];
    }
    let interfaces = match get_if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces,
        Err(e) => {
            tracing::warn!(error = %e, "Could not list network interfaces");
            return Vec::new();
        }
    };
    interfaces
        .iter()
        .map(|interface| interface.ip())
        .filter(|ip| is_global_unicast(*ip))
        .map(|ip| base_url(ip, port))
        .collect()
}

fn base_url(ip: IpAddr, port: u16) -> String {
    match ip {
        IpAddr::V4(v4) => format!("http://{v4}:{port}/"),
        IpAddr::V6(v6) => format!("http://[{v6}]:{port}/"),
    }
}

fn is_global_unicast(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_loopback()
                || v4.is_unspecified()
                || v4.is_link_local()
                || v4.is_multicast()
                || v4.is_broadcast())
        }
        IpAddr::V6(v6) => {
            !(v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_multicast()
                || v6.is_unicast_link_local())
        }
    }
}
