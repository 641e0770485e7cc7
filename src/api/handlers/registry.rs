//! Pre-registration endpoints: occupancy checks and registration tokens.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use super::valid_email;
use crate::domain::AccountStore;
use crate::session::SessionManager;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct EmailQuery {
    email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct EmailOccupiedInfo {
    email: String,
    occupied: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct NameQuery {
    name: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct NameOccupiedInfo {
    name: String,
    occupied: bool,
}

#[utoipa::path(
    post,
    path = "/registry/emails",
    request_body = EmailQuery,
    responses(
        (status = 200, description = "Occupancy info for the email", body = EmailOccupiedInfo),
    ),
    tag = "registry"
)]
pub async fn email_occupied(
    accounts: Extension<Arc<dyn AccountStore>>,
    payload: Option<Json<EmailQuery>>,
) -> impl IntoResponse {
    let Some(Json(query)) = payload else {
        return bad_request();
    };

    match accounts.is_email_occupied(&query.email).await {
        Ok(occupied) => (
            StatusCode::OK,
            Json(EmailOccupiedInfo {
                email: query.email,
                occupied,
            }),
        )
            .into_response(),
        Err(err) => internal_error(&err),
    }
}

#[utoipa::path(
    post,
    path = "/registry/names",
    request_body = NameQuery,
    responses(
        (status = 200, description = "Occupancy info for the account name", body = NameOccupiedInfo),
    ),
    tag = "registry"
)]
pub async fn name_occupied(
    accounts: Extension<Arc<dyn AccountStore>>,
    payload: Option<Json<NameQuery>>,
) -> impl IntoResponse {
    let Some(Json(query)) = payload else {
        return bad_request();
    };

    match accounts.is_name_occupied(&query.name).await {
        Ok(occupied) => (
            StatusCode::OK,
            Json(NameOccupiedInfo {
                name: query.name,
                occupied,
            }),
        )
            .into_response(),
        Err(err) => internal_error(&err),
    }
}

#[utoipa::path(
    post,
    path = "/registry/email_register_tokens",
    request_body = EmailQuery,
    responses(
        (status = 200, description = "Registration token issued for the email"),
        (status = 400, description = "Malformed email"),
        (status = 409, description = "Email already belongs to an account"),
    ),
    tag = "registry"
)]
pub async fn acquire_register_token(
    accounts: Extension<Arc<dyn AccountStore>>,
    sessions: Extension<Arc<SessionManager>>,
    payload: Option<Json<EmailQuery>>,
) -> impl IntoResponse {
    let Some(Json(query)) = payload else {
        return bad_request();
    };
    if !valid_email(&query.email) {
        return bad_request();
    }

    match accounts.is_email_occupied(&query.email).await {
        Ok(true) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "account email is occupied" })),
        )
            .into_response(),
        Ok(false) => {
            // The token travels out of band (registration email); the
            // response only confirms which address it was issued for.
            let _token = sessions.issue_registration_token(&query.email);
            (StatusCode::OK, Json(json!({ "email": query.email }))).into_response()
        }
        Err(err) => internal_error(&err),
    }
}

fn bad_request() -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "bad request body" })),
    )
        .into_response()
}

fn internal_error(err: &anyhow::Error) -> axum::response::Response {
    error!("registry query failed: {err}");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}
