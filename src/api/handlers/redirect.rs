//! Handlers for resolving short links.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use std::net::SocketAddr;

use crate::api::dto::redirect::PasswordForm;
use crate::application::services::Visit;
use crate::domain::decision::{Decision, ResolveErrorKind};
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::request::{client_ip, collect_headers, referrer, user_agent};

/// Password prompt served with `401` for protected links.
#[derive(Template, WebTemplate)]
#[template(path = "password.html")]
struct PasswordTemplate {
    code: String,
    invalid: bool,
}

/// Resolves a short code or alias.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Responses
///
/// - **307** redirect to the resolved destination
/// - **200** cloaked HTML page
/// - **401** password prompt
/// - **404** unknown code
/// - **410** inactive or expired link
/// - **500** storage failure
///
/// The click is queued for the background worker; the response never waits for it.
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let visit = visit_from_request(code, &headers, addr, None);
    respond(&state, visit).await
}

/// Resolves a password-protected link with the password from the prompt form.
///
/// # Endpoint
///
/// `POST /{code}` with form body `password=...`
///
/// A wrong password re-renders the prompt with an error message.
pub async fn password_submit_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Form(form): Form<PasswordForm>,
) -> Response {
    let visit = visit_from_request(code, &headers, addr, Some(form.password));
    respond(&state, visit).await
}

fn visit_from_request(
    code: String,
    headers: &HeaderMap,
    addr: SocketAddr,
    password: Option<String>,
) -> Visit {
    Visit {
        code,
        user_agent: user_agent(headers).map(str::to_string),
        headers: collect_headers(headers),
        password,
        ip: client_ip(headers, Some(addr)),
        referrer: referrer(headers).map(str::to_string),
    }
}

async fn respond(state: &AppState, visit: Visit) -> Response {
    let decision = state.resolver.resolve(&visit).await;

    match decision {
        Decision::Redirect { url } => Redirect::temporary(&url).into_response(),
        Decision::Cloaked { html, content_type } => {
            (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], html).into_response()
        }
        Decision::PasswordRequired => {
            let page = PasswordTemplate {
                invalid: visit.password.is_some(),
                code: visit.code,
            };
            (StatusCode::UNAUTHORIZED, page).into_response()
        }
        Decision::Error { kind } => error_for(kind, &visit.code).into_response(),
    }
}

fn error_for(kind: ResolveErrorKind, code: &str) -> AppError {
    match kind {
        ResolveErrorKind::NotFound => {
            AppError::not_found("Short link not found", json!({ "code": code }))
        }
        ResolveErrorKind::Expired => {
            AppError::gone("Short link is no longer available", json!({ "code": code }))
        }
        ResolveErrorKind::Internal => AppError::internal("Internal server error", json!({})),
    }
}
