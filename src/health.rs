use anyhow::Result;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// Standalone probe server, started before the dashboard server so liveness
/// answers while the app is still binding.
#[derive(Clone, Default)]
pub struct HealthServer {
    ready: Arc<AtomicBool>,
}

impl HealthServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub async fn serve(&self, port: u16, ready_tx: oneshot::Sender<()>) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await?;

        info!(port = port, "Health server listening");

        // Signal that the probe listener is bound
        let _ = ready_tx.send(());

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let ready = self.ready.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let ready = ready.clone();
                    async move { handle_probe(req, ready) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    debug!(
                        error = %err,
                        remote_addr = %remote_addr,
                        "Health server connection error"
                    );
                }
            });
        }
    }
}

fn handle_probe(
    req: Request<hyper::body::Incoming>,
    ready: Arc<AtomicBool>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (status, body) = match (req.method(), req.uri().path()) {
        // Liveness: the process is up
        (&Method::GET, "/healthz") => (StatusCode::OK, "ok"),
        // Readiness: the dashboard server is bound and serving
        (&Method::GET, "/readyz") => {
            if ready.load(Ordering::SeqCst) {
                (StatusCode::OK, "ok")
            } else {
                (StatusCode::SERVICE_UNAVAILABLE, "not ready")
            }
        }
        _ => (StatusCode::NOT_FOUND, "not found"),
    };

    Ok(text_response(status, body))
}

fn text_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    // Static header and body, the builder cannot fail
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_flag_transitions() {
        let server = HealthServer::new();
        assert!(!server.is_ready());
        server.set_ready(true);
        assert!(server.is_ready());
        server.set_ready(false);
        assert!(!server.is_ready());
    }

    #[test]
    fn test_ready_flag_shared_across_clones() {
        let server = HealthServer::new();
        let clone = server.clone();
        clone.set_ready(true);
        assert!(server.is_ready());
    }
}
