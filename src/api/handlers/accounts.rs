//! Account creation endpoint.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use super::valid_email;
use crate::domain::{AccountCreateRequest, AccountService, DomainError};
use crate::session::SessionManager;

/// Creation payload. Not `Debug`: the secret must never end up in a log line.
#[derive(ToSchema, Deserialize)]
pub struct AccountCreateForm {
    name: String,
    email: String,
    secret: String,
    register_token: String,
}

#[utoipa::path(
    post,
    path = "/accounts",
    request_body = AccountCreateForm,
    responses(
        (status = 201, description = "Account created"),
        (status = 400, description = "Malformed payload or invalid registration token"),
        (status = 409, description = "Account name or email is already occupied"),
    ),
    tag = "accounts"
)]
pub async fn create(
    service: Extension<Arc<AccountService>>,
    sessions: Extension<Arc<SessionManager>>,
    payload: Option<Json<AccountCreateForm>>,
) -> impl IntoResponse {
    let Some(Json(form)) = payload else {
        return bad_request("bad request body");
    };

    if form.name.is_empty() || form.secret.is_empty() || !valid_email(&form.email) {
        return bad_request("bad request body");
    }

    // The token is consumed before any account work: a replayed token must
    // not authorize a second creation attempt for the same email.
    if !sessions.consume_registration_token(&form.email, &form.register_token) {
        return bad_request("register.token.is.invalid");
    }

    let request = AccountCreateRequest {
        name: form.name,
        email: form.email,
        secret: form.secret,
    };

    match service.create_account(request).await {
        Ok(account) => (StatusCode::CREATED, Json(json!({ "user": account }))).into_response(),
        Err(err @ (DomainError::NameOccupied | DomainError::EmailOccupied)) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
        Err(err) => {
            error!("failed to create account: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "failed to create account" })),
            )
                .into_response()
        }
    }
}

fn bad_request(message: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message })),
    )
        .into_response()
}
