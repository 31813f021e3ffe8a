//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the route table and dispatcher (fail fast on bad config)
//! - Create the Axum router with tower-http layers (request id, tracing)
//! - Dispatch every request to its route pipeline
//! - Spawn per-route health monitors
//! - Serve until the shutdown broadcast fires

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header::LOCATION, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{ConfigError, GatewayConfig};
use crate::health::HealthMonitor;
use crate::http::middleware::MiddlewareChain;
use crate::lifecycle::Shutdown;
use crate::routing::{Dispatch, Dispatcher, RouteTable};

/// Application state injected into the dispatch handler.
#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    config: GatewayConfig,
    table: RouteTable,
    dispatcher: Arc<Dispatcher>,
    router: Router,
}

impl GatewayServer {
    /// Create a server for the given configuration.
    ///
    /// Fails without serving anything if any route is invalid.
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        Self::with_middleware(config, MiddlewareChain::new())
    }

    /// Like [`GatewayServer::new`], appending `extra` stages to every route pipeline.
    pub fn with_middleware(
        config: GatewayConfig,
        extra: MiddlewareChain,
    ) -> Result<Self, ConfigError> {
        let table = RouteTable::from_config(&config.routes)?;
        let dispatcher = Arc::new(Dispatcher::new(&table, &extra)?);
        let router = Self::build_router(dispatcher.clone());

        Ok(Self {
            config,
            table,
            dispatcher,
            router,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(dispatcher: Arc<Dispatcher>) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(AppState { dispatcher })
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: Shutdown,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.dispatcher.len(),
            "Starting the server"
        );

        let monitors = self.spawn_health_monitors(&shutdown);

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.signalled())
            .await;

        // Monitors listen on the same broadcast; fire it in case serving failed.
        shutdown.trigger();
        for monitor in monitors {
            if let Err(e) = monitor.await {
                tracing::error!(error = %e, "Health monitor task failed");
            }
        }

        tracing::info!("HTTP server stopped");
        served
    }

    fn spawn_health_monitors(&self, shutdown: &Shutdown) -> Vec<JoinHandle<()>> {
        self.dispatcher
            .bindings()
            .iter()
            .filter_map(|binding| match HealthMonitor::for_route(binding.spec())? {
                Ok(monitor) => Some(monitor.spawn(shutdown.subscribe())),
                Err(e) => {
                    tracing::error!(
                        route = %binding.spec().path,
                        error = %e,
                        "Health monitor disabled for route"
                    );
                    None
                }
            })
            .collect()
    }

    pub fn route_table(&self) -> &RouteTable {
        &self.table
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Fallback handler: every request is dispatched by path.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);

    match state.dispatcher.dispatch(&path, query.as_deref()) {
        Dispatch::Matched(binding) => binding.serve(request, client_addr).await,
        Dispatch::Redirect(location) => {
            (StatusCode::MOVED_PERMANENTLY, [(LOCATION, location)]).into_response()
        }
        Dispatch::NotFound => {
            tracing::debug!(path = %path, "No route matched");
            (StatusCode::NOT_FOUND, "404 page not found").into_response()
        }
    }
}
