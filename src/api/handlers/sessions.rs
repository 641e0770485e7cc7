//! Session endpoints: login, logout, current session.

use axum::{
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use super::bearer_token;
use crate::domain::DomainError;
use crate::session::{SecurityContext, SessionManager};

/// Login payload. Not `Debug`: the secret must never end up in a log line.
#[derive(ToSchema, Deserialize)]
pub struct LoginForm {
    name: String,
    secret: String,
}

#[utoipa::path(
    post,
    path = "/sessions",
    request_body = LoginForm,
    responses(
        (status = 200, description = "Authenticated; session token issued", body = SecurityContext),
        (status = 401, description = "Account does not exist or secret does not match"),
    ),
    tag = "sessions"
)]
pub async fn login(
    sessions: Extension<Arc<SessionManager>>,
    payload: Option<Json<LoginForm>>,
) -> impl IntoResponse {
    let Some(Json(form)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "bad request body" })),
        )
            .into_response();
    };

    match sessions.login(&form.name, &form.secret).await {
        Ok(context) => {
            let mut headers = HeaderMap::new();
            if let Ok(value) = HeaderValue::from_str(&context.token) {
                headers.insert("Authentication", value);
            }
            (StatusCode::OK, headers, Json(context)).into_response()
        }
        // One 401 for both causes so the wire does not reveal whether the
        // account exists.
        Err(DomainError::AccountNotFound | DomainError::AuthenticationFailure) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "account not exist or secret is not match" })),
        )
            .into_response(),
        Err(err) => {
            error!("login failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/sessions",
    responses(
        (status = 204, description = "Session deleted; absent tokens are a no-op"),
    ),
    tag = "sessions"
)]
pub async fn logout(
    headers: HeaderMap,
    sessions: Extension<Arc<SessionManager>>,
) -> impl IntoResponse {
    if let Some(token) = bearer_token(&headers) {
        sessions.logout(&token);
    }
    StatusCode::NO_CONTENT
}

#[utoipa::path(
    get,
    path = "/sessions/me",
    responses(
        (status = 200, description = "Current session", body = SecurityContext),
        (status = 401, description = "No valid session token presented"),
    ),
    tag = "sessions"
)]
pub async fn me(headers: HeaderMap, sessions: Extension<Arc<SessionManager>>) -> impl IntoResponse {
    match bearer_token(&headers).and_then(|token| sessions.current_session(&token)) {
        Some(context) => (StatusCode::OK, Json(context)).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "authentication is required" })),
        )
            .into_response(),
    }
}
