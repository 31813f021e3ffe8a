//! Health monitor lifecycle against live backends.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, routing::get, Router};
use tokio::sync::Notify;
use url::Url;

use common::*;
use hurrah::health::HealthMonitor;
use hurrah::Shutdown;

/// A backend whose `/health` answers `status` and counts probes.
fn counting_backend(status: StatusCode, probes: Arc<AtomicUsize>, second: Arc<Notify>) -> Router {
    Router::new().route(
        "/health",
        get(move || {
            let probes = probes.clone();
            let second = second.clone();
            async move {
                if probes.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
                    second.notify_one();
                }
                status
            }
        }),
    )
}

async fn run_until_second_probe(status: StatusCode) -> usize {
    let probes = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(Notify::new());
    let backend = start_backend(counting_backend(status, probes.clone(), second.clone())).await;

    let url = Url::parse(&format!("http://{}/health", backend)).unwrap();
    let monitor = HealthMonitor::new(
        "/svc",
        url,
        Duration::from_secs(1),
        Duration::from_millis(200),
    )
    .unwrap();

    let shutdown = Shutdown::new();
    let handle = monitor.spawn(shutdown.subscribe());

    tokio::time::timeout(Duration::from_secs(5), second.notified())
        .await
        .expect("second probe never arrived");
    shutdown.trigger();

    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("monitor did not stop")
        .unwrap();

    probes.load(Ordering::SeqCst)
}

#[tokio::test]
async fn test_monitor_stops_on_shutdown() {
    assert_eq!(run_until_second_probe(StatusCode::OK).await, 2);
}

#[tokio::test]
async fn test_monitor_keeps_probing_unhealthy_backend() {
    assert_eq!(
        run_until_second_probe(StatusCode::SERVICE_UNAVAILABLE).await,
        2
    );
}

#[tokio::test]
async fn test_gateway_stops_its_monitors() {
    let probes = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(Notify::new());
    let app = counting_backend(StatusCode::OK, probes.clone(), second.clone());
    let backend = start_backend(app).await;

    let mut checked = route("/svc", backend);
    checked.health_check_path = Some("/health".into());
    checked.health_check_interval = Some(1);
    let gateway = TestGateway::start(config(vec![checked])).await;

    tokio::time::timeout(Duration::from_secs(5), second.notified())
        .await
        .expect("second probe never arrived");
    gateway.stop().await;

    assert_eq!(probes.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_checks_reuse_the_pooled_connection() {
    let (backend, accepted) = start_keep_alive_backend().await;
    let url = Url::parse(&format!("http://{}/health", backend)).unwrap();
    let monitor =
        HealthMonitor::new("/svc", url, Duration::from_secs(1), Duration::from_secs(1)).unwrap();

    for _ in 0..3 {
        monitor.probe().await.unwrap();
        // Let the client hand the drained connection back to its pool.
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}
