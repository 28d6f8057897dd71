//! Conversion beacon for A/B variants.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use crate::error::AppError;
use crate::state::AppState;

/// Records one conversion for a variant.
///
/// # Endpoint
///
/// `POST /convert/{variant_id}`
///
/// Public, so landing pages can call it directly. The counter is incremented
/// atomically in storage, and only while the test is live and the variant has
/// more clicks than conversions.
///
/// # Errors
///
/// - 404 Not Found if the variant does not exist
/// - 409 Conflict if the test is stopped or the variant has no unconverted click
pub async fn convert_handler(
    Path(variant_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state
        .experiment_service
        .record_conversion(variant_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
