//! HTTP API server with observability for the fulfillment engine.
//!
//! Provides REST endpoints for checkout, the order workflow and stock
//! maintenance, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use fulfillment::{CheckoutCoordinator, InMemoryCatalog, OrderWorkflowService, StockService};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/checkout", post(routes::orders::checkout::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route(
            "/orders/cancel-requests",
            get(routes::orders::cancel_requests::<S>),
        )
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S>).delete(routes::orders::retire::<S>),
        )
        .route("/orders/{id}/audit", get(routes::orders::audit::<S>))
        .route("/orders/{id}/confirm", post(routes::orders::confirm::<S>))
        .route("/orders/{id}/ship", post(routes::orders::ship::<S>))
        .route("/orders/{id}/complete", post(routes::orders::complete::<S>))
        .route(
            "/orders/{id}/cancel-request",
            post(routes::orders::request_cancel::<S>),
        )
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route(
            "/orders/{id}/cancel/approve",
            post(routes::orders::approve_cancel::<S>),
        )
        .route(
            "/orders/{id}/cancel/reject",
            post(routes::orders::reject_cancel::<S>),
        )
        .route("/stock", post(routes::stock::create::<S>))
        .route("/stock/{id}", get(routes::stock::get::<S>))
        .route("/stock/{id}/adjust", post(routes::stock::adjust::<S>))
        .route("/stock/{id}/audit", get(routes::stock::audit::<S>))
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

/// Creates the application state around a store and an in-memory catalog.
pub fn create_default_state<S: Store + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    let catalog = InMemoryCatalog::new();
    Arc::new(AppState {
        checkout: CheckoutCoordinator::new(store.clone(), catalog.clone()),
        workflow: OrderWorkflowService::new(store.clone()),
        stock: StockService::new(store.clone()),
        catalog,
        store,
    })
}
