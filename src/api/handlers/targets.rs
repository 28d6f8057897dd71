//! Handlers for targeting rule management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use validator::Validate;

use crate::api::dto::targets::CreateTargetRequest;
use crate::domain::entities::LinkTarget;
use crate::error::AppError;
use crate::state::AppState;

/// Lists all rules of a link in evaluation order.
///
/// # Endpoint
///
/// `GET /api/links/{code}/targets`
pub async fn list_targets_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<LinkTarget>>, AppError> {
    let targets = state.target_service.list(&code).await?;
    Ok(Json(targets))
}

/// Adds a targeting rule to a link.
///
/// # Endpoint
///
/// `POST /api/links/{code}/targets`
///
/// # Errors
///
/// - 400 for an invalid value or URL
/// - 404 if the link does not exist
/// - 409 if the link already has a rule with this type and value
pub async fn create_target_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<CreateTargetRequest>,
) -> Result<(StatusCode, Json<LinkTarget>), AppError> {
    payload.validate()?;

    let target = state
        .target_service
        .create(
            &code,
            payload.target_type,
            &payload.value,
            &payload.target_url,
            payload.priority,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(target)))
}

/// `DELETE /api/targets/{id}`
pub async fn delete_target_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.target_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
