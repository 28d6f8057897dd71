//! Handlers for A/B test management and reporting.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use validator::Validate;

use crate::api::dto::experiments::{
    CreateExperimentRequest, UpdateVariantRequest, VariantInput,
};
use crate::application::services::ExperimentReport;
use crate::domain::entities::{AbTest, AbVariant, NewAbVariant};
use crate::error::AppError;
use crate::state::AppState;

/// Starts an A/B test on a link.
///
/// # Endpoint
///
/// `POST /api/links/{code}/experiment`
///
/// # Request Body
///
/// ```json
/// {
///   "name": "landing-page",
///   "variants": [
///     { "name": "control", "url": "https://example.com/a", "weight": 50 },
///     { "name": "new",     "url": "https://example.com/b", "weight": 50 }
///   ]
/// }
/// ```
///
/// # Errors
///
/// - 400 for fewer than two variants or invalid variants
/// - 404 if the link does not exist
/// - 409 if the link already has a live test
pub async fn create_experiment_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<CreateExperimentRequest>,
) -> Result<(StatusCode, Json<AbTest>), AppError> {
    payload.validate()?;

    let variants = payload.variants.into_iter().map(NewAbVariant::from).collect();
    let test = state
        .experiment_service
        .create_test(&code, &payload.name, variants)
        .await?;

    Ok((StatusCode::CREATED, Json(test)))
}

/// Statistical summary of the live test, with the sample-size plan.
///
/// # Endpoint
///
/// `GET /api/links/{code}/experiment/stats`
pub async fn experiment_stats_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ExperimentReport>, AppError> {
    let report = state.experiment_service.report(&code).await?;
    Ok(Json(report))
}

/// `POST /api/experiments/{id}/variants`
pub async fn add_variant_handler(
    Path(test_id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<VariantInput>,
) -> Result<(StatusCode, Json<AbVariant>), AppError> {
    payload.validate()?;

    let variant = state
        .experiment_service
        .add_variant(test_id, payload.into())
        .await?;

    Ok((StatusCode::CREATED, Json(variant)))
}

/// `PATCH /api/variants/{id}`
pub async fn update_variant_handler(
    Path(variant_id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateVariantRequest>,
) -> Result<Json<AbVariant>, AppError> {
    payload.validate()?;

    let variant = state
        .experiment_service
        .update_variant(variant_id, payload.into())
        .await?;

    Ok(Json(variant))
}

/// Deletes a variant.
///
/// # Endpoint
///
/// `DELETE /api/variants/{id}`
///
/// # Errors
///
/// Returns 400 Bad Request if the test would be left with fewer than two variants.
pub async fn delete_variant_handler(
    Path(variant_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.experiment_service.delete_variant(variant_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Zeroes click and conversion counters of every variant.
///
/// `POST /api/experiments/{id}/reset`
pub async fn reset_experiment_handler(
    Path(test_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.experiment_service.reset(test_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/experiments/{id}/stop`
pub async fn stop_experiment_handler(
    Path(test_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.experiment_service.stop(test_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
