use axum::response::{IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::GIT_COMMIT_HASH;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    service_name: String,
    description: String,
    version: String,
    build: String,
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service identity and build metadata", body = ServiceInfo)
    ),
    tag = "meta"
)]
pub async fn root() -> impl IntoResponse {
    Json(ServiceInfo {
        service_name: env!("CARGO_PKG_NAME").to_string(),
        description: env!("CARGO_PKG_DESCRIPTION").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build: GIT_COMMIT_HASH.to_string(),
    })
}
