//! Owner API route configuration.
//!
//! All endpoints require Bearer token authentication via
//! [`crate::api::middleware::auth`].

use crate::api::handlers::{
    add_variant_handler, create_experiment_handler, create_target_handler,
    delete_target_handler, delete_variant_handler, experiment_stats_handler,
    list_targets_handler, reset_experiment_handler, stop_experiment_handler,
    update_variant_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, patch, post},
};

/// All owner API routes.
///
/// # Endpoints
///
/// - `GET    /links/{code}/targets`          - List targeting rules
/// - `POST   /links/{code}/targets`          - Add a targeting rule
/// - `DELETE /targets/{id}`                  - Remove a targeting rule
/// - `POST   /links/{code}/experiment`       - Start an A/B test
/// - `GET    /links/{code}/experiment/stats` - Statistics of the live test
/// - `POST   /experiments/{id}/variants`     - Add a variant
/// - `POST   /experiments/{id}/reset`        - Zero all counters
/// - `POST   /experiments/{id}/stop`         - Deactivate the test
/// - `PATCH  /variants/{id}`                 - Update a variant
/// - `DELETE /variants/{id}`                 - Remove a variant (keeps at least two)
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/links/{code}/targets",
            get(list_targets_handler).post(create_target_handler),
        )
        .route("/targets/{id}", delete(delete_target_handler))
        .route("/links/{code}/experiment", post(create_experiment_handler))
        .route(
            "/links/{code}/experiment/stats",
            get(experiment_stats_handler),
        )
        .route("/experiments/{id}/variants", post(add_variant_handler))
        .route("/experiments/{id}/reset", post(reset_experiment_handler))
        .route("/experiments/{id}/stop", post(stop_experiment_handler))
        .route(
            "/variants/{id}",
            patch(update_variant_handler).delete(delete_variant_handler),
        )
}
