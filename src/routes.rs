//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /{code}`               - Resolve a short link (public)
//! - `POST /{code}`               - Resolve with a password from the prompt form (public)
//! - `POST /convert/{variant_id}` - A/B conversion beacon (public)
//! - `GET  /health`               - Health check: DB, cache, click queue (public)
//! - `/api/*`                     - Owner API (Bearer token required)
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Rate limiting** - Per-IP token bucket (configurable for proxy deployments)
//! - **Authentication** - Bearer token on the owner API
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::handlers::{
    convert_handler, health_handler, password_submit_handler, redirect_handler,
};
use crate::api::middleware::rate_limit::{self, Policy};
use crate::api::middleware::{auth, tracing};
use crate::state::AppState;
use axum::routing::{get, post};
use axum::{Router, middleware};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Constructs the application router with all routes and middleware.
///
/// # Arguments
///
/// - `state` - shared application state injected into all handlers
/// - `behind_proxy` - when `true`, rate limiting reads client IP from
///   `X-Forwarded-For` / `X-Real-IP` headers instead of the peer socket address;
///   enable only when the service runs behind a trusted reverse proxy
pub fn app_router(state: AppState, behind_proxy: bool) -> NormalizePath<Router> {
    let api_router = rate_limit::apply(
        api::routes::protected_routes()
            .route_layer(middleware::from_fn_with_state(state.clone(), auth::layer)),
        Policy::Strict,
        behind_proxy,
    );

    let public_router = rate_limit::apply(
        Router::new()
            .route("/{code}", get(redirect_handler).post(password_submit_handler))
            .route("/convert/{variant_id}", post(convert_handler)),
        Policy::Public,
        behind_proxy,
    );

    let router = Router::new()
        .merge(public_router)
        .route("/health", get(health_handler))
        .nest("/api", api_router)
        .with_state(state)
        .layer(tracing::layer());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}
