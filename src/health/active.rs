//! Active health checking.
//!
//! # Responsibilities
//! - Periodically GET the route's health check URL
//! - Read the body to the end so the pooled connection is reused next tick
//! - Classify the backend as up iff the status is exactly 200
//! - Log every outcome and every up/down transition
//!
//! # Lifecycle
//! ```text
//! Running ──(shutdown broadcast, checked between probes)──▶ Stopped
//! ```
//! An in-flight probe is never interrupted; it is bounded by the route timeout.

use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{header::USER_AGENT, Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use url::Url;

use crate::config::ValidationError;
use crate::health::state::{HealthState, Status};
use crate::observability::metrics;
use crate::proxy::{build_client, BackendClient, ClientError};
use crate::routing::RouteSpec;

const USER_AGENT_VALUE: &str = concat!("hurrah-health-check/", env!("CARGO_PKG_VERSION"));

/// Why a single probe failed.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to build health check request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("health check timed out after {0:?}")]
    Timeout(Duration),

    #[error("health check request failed: {0}")]
    Connect(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read health check body: {0}")]
    Body(#[from] hyper::Error),

    #[error("unexpected status {0}")]
    UnexpectedStatus(StatusCode),
}

/// Why a monitor could not be built for a route.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    HealthCheck(#[from] ValidationError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Probes one route's backend until shutdown.
#[derive(Debug)]
pub struct HealthMonitor {
    route: String,
    url: Url,
    timeout: Duration,
    interval: Duration,
    client: BackendClient,
}

impl HealthMonitor {
    pub fn new(
        route: impl Into<String>,
        url: Url,
        timeout: Duration,
        interval: Duration,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            route: route.into(),
            url,
            timeout,
            interval,
            client: build_client(timeout)?,
        })
    }

    /// Build the monitor for a route, if it has a health check path.
    pub fn for_route(spec: &RouteSpec) -> Option<Result<Self, MonitorError>> {
        let url = match spec.health_check_url()? {
            Ok(url) => url,
            Err(e) => return Some(Err(e.into())),
        };
        Some(
            Self::new(
                spec.path.clone(),
                url,
                spec.timeout,
                spec.health_check_interval,
            )
            .map_err(MonitorError::from),
        )
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run the monitor on its own task.
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Probe every interval until `shutdown` fires or its sender is dropped.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            route = %self.route,
            url = %self.url,
            interval_ms = self.interval.as_millis() as u64,
            "Health monitor starting"
        );

        // First probe one interval after start.
        let mut ticker = time::interval_at(time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut state = HealthState::new();

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {
                    let outcome = self.probe().await;
                    self.observe(&mut state, outcome);
                }
            }
        }

        tracing::info!(
            route = %self.route,
            url = %self.url,
            probes = state.probes(),
            "Health monitor stopped"
        );
    }

    /// Issue one GET against the health check URL.
    pub async fn probe(&self) -> Result<(), ProbeError> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(self.url.as_str())
            .header(USER_AGENT, USER_AGENT_VALUE)
            .body(Body::empty())?;

        let exchange = async {
            let response = self.client.request(request).await?;
            let status = response.status();
            response.into_body().collect().await?;
            Ok::<_, ProbeError>(status)
        };
        let status = time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ProbeError::Timeout(self.timeout))??;

        match status {
            StatusCode::OK => Ok(()),
            status => Err(ProbeError::UnexpectedStatus(status)),
        }
    }

    fn observe(&self, state: &mut HealthState, outcome: Result<(), ProbeError>) {
        match &outcome {
            Ok(()) => tracing::info!(route = %self.route, url = %self.url, "Backend is healthy"),
            Err(e) => tracing::error!(
                route = %self.route,
                url = %self.url,
                error = %e,
                "Backend health check failed"
            ),
        }

        let healthy = outcome.is_ok();
        metrics::record_probe(&self.route, healthy);

        if let Some(transition) = state.record(healthy, Instant::now()) {
            match transition.to {
                Status::Up => tracing::info!(
                    route = %self.route,
                    from = %transition.from,
                    "Backend is up"
                ),
                _ => tracing::warn!(
                    route = %self.route,
                    from = %transition.from,
                    "Backend is down"
                ),
            }
        }
    }
}
