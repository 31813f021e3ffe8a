//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{header::LOCATION, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use hurrah::config::{GatewayConfig, RouteConfig};
use hurrah::http::middleware::MiddlewareChain;
use hurrah::{GatewayServer, Shutdown};

/// Serve `app` on an ephemeral loopback port.
pub async fn start_backend(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// A backend answering every request with a fixed body.
pub fn fixed_backend(body: &'static str) -> Router {
    Router::new().fallback(move || async move { body })
}

/// A backend echoing `"<METHOD> <path?query> <body>"` plus selected request headers.
pub fn echo_backend() -> Router {
    Router::new().fallback(|method: Method, uri: Uri, headers: HeaderMap, body: String| async move {
        let mut echoed = HeaderMap::new();
        for name in ["x-forwarded-for", "x-forwarded-host", "host", "x-custom"] {
            if let Some(value) = headers.get(name) {
                let key = format!("x-echo-{}", name);
                echoed.insert(
                    axum::http::HeaderName::try_from(key).unwrap(),
                    value.clone(),
                );
            }
        }
        (echoed, format!("{} {} {}", method, uri, body))
    })
}

/// A backend that waits `delay` before answering.
pub fn slow_backend(delay: Duration) -> Router {
    Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        "late"
    })
}

/// A backend answering every request with `status`.
pub fn status_backend(status: StatusCode) -> Router {
    Router::new().fallback(move || async move {
        (status, [("x-backend", HeaderValue::from_static("status"))]).into_response()
    })
}

/// A backend redirecting every request to `location` with 302.
pub fn redirect_backend(location: &'static str) -> Router {
    Router::new().fallback(move || async move {
        (StatusCode::FOUND, [(LOCATION, location)]).into_response()
    })
}

/// A backend whose responses carry hop-by-hop headers next to an end-to-end one.
pub fn hop_by_hop_backend() -> Router {
    Router::new().fallback(|| async {
        (
            [
                ("connection", "x-hop"),
                ("x-hop", "1"),
                ("keep-alive", "timeout=5"),
                ("proxy-authenticate", "Basic"),
                ("x-end-to-end", "kept"),
            ],
            "hops",
        )
    })
}

/// A backend that sends `first`, then waits for `release` before sending `second`.
///
/// The second chunk only exists after the caller has seen the first one, so a
/// buffering proxy never completes the response.
pub fn streaming_backend(
    first: &'static str,
    second: &'static str,
    release: Arc<Notify>,
) -> Router {
    Router::new().fallback(move || {
        let release = release.clone();
        async move {
            let (tx, rx) = mpsc::channel::<Result<Bytes, Infallible>>(1);
            tokio::spawn(async move {
                let _ = tx.send(Ok(Bytes::from_static(first.as_bytes()))).await;
                release.notified().await;
                let _ = tx.send(Ok(Bytes::from_static(second.as_bytes()))).await;
            });
            Body::from_stream(futures_util::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|chunk| (chunk, rx))
            }))
        }
    })
}

/// A raw keep-alive backend answering every request with `200 ok`.
///
/// Returns the address and the number of TCP connections accepted so far.
pub async fn start_keep_alive_backend() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut pending = Vec::new();
                let mut buf = [0u8; 1024];
                loop {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => pending.extend_from_slice(&buf[..n]),
                    }
                    while let Some(end) = pending.windows(4).position(|w| w == b"\r\n\r\n") {
                        pending.drain(..end + 4);
                        let response = "HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok";
                        if socket.write_all(response.as_bytes()).await.is_err() {
                            return;
                        }
                    }
                }
            });
        }
    });

    (addr, accepted)
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn route(path: &str, backend: SocketAddr) -> RouteConfig {
    RouteConfig::new(path, format!("http://{}", backend))
}

pub fn config(routes: Vec<RouteConfig>) -> GatewayConfig {
    GatewayConfig {
        routes,
        ..Default::default()
    }
}

/// A gateway serving on an ephemeral port until stopped.
pub struct TestGateway {
    pub addr: SocketAddr,
    shutdown: Shutdown,
    handle: JoinHandle<std::io::Result<()>>,
}

impl TestGateway {
    pub async fn start(config: GatewayConfig) -> Self {
        Self::start_with(config, MiddlewareChain::new()).await
    }

    pub async fn start_with(config: GatewayConfig, extra: MiddlewareChain) -> Self {
        let server = GatewayServer::with_middleware(config, extra).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let handle = tokio::spawn(server.run(listener, shutdown.clone()));

        Self {
            addr,
            shutdown,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server and its monitors to stop.
    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("gateway did not stop")
            .unwrap()
            .unwrap();
    }
}

/// HTTP client that relays redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
