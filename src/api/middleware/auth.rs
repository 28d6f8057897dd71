//! Bearer token authentication middleware.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_auth::AuthBearer;
use serde_json::json;

use crate::{error::AppError, state::AppState};

/// Authenticates owner API requests using Bearer tokens.
///
/// # Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// The token is hashed with the server signing secret and looked up among
/// non-revoked tokens; `last_used_at` is refreshed on success.
///
/// # Errors
///
/// Responds `401 Unauthorized` with `WWW-Authenticate: Bearer` if the header is
/// missing or malformed, or the token is unknown or revoked.
pub async fn layer(State(st): State<AppState>, req: Request, next: Next) -> Response {
    let (mut parts, body) = req.into_parts();

    let token = match AuthBearer::from_request_parts(&mut parts, &()).await {
        Ok(AuthBearer(token)) => token,
        Err(_) => {
            return challenge(AppError::unauthorized(
                "Unauthorized",
                json!({"reason": "Authorization header is missing or invalid"}),
            ));
        }
    };

    if let Err(e) = st.auth_service.authenticate(&token).await {
        return challenge(e);
    }

    next.run(Request::from_parts(parts, body)).await
}

fn challenge(error: AppError) -> Response {
    let is_auth_failure = matches!(error, AppError::Unauthorized { .. });
    let mut response = error.into_response();

    if is_auth_failure {
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }

    response
}
