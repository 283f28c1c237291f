//! HTTP API server for the transport order service.
//!
//! Exposes the order creation saga, reconciliation and deal updates as REST
//! endpoints, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use crm::{CrmClient, FileFetcher, Notifier};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::OrderStore;
use saga::{ReconciliationUpdater, RemoteDealUpdater, SagaCoordinator, SagaSettings};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: OrderStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders/reconcile", post(routes::orders::reconcile::<S>))
        .route("/orders/remote", put(routes::orders::update_remote::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the saga and update flows around the given collaborators.
pub fn create_state<S: OrderStore + Clone + 'static>(
    store: S,
    crm: Arc<dyn CrmClient>,
    fetcher: Arc<dyn FileFetcher>,
    notifier: Arc<dyn Notifier>,
    settings: SagaSettings,
) -> Arc<AppState<S>> {
    let saga_coordinator =
        SagaCoordinator::new(store.clone(), Arc::clone(&crm), fetcher, notifier, settings);

    Arc::new(AppState {
        saga_coordinator,
        reconciler: ReconciliationUpdater::new(store),
        deal_updater: RemoteDealUpdater::new(crm),
    })
}
