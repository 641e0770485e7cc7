//! Domain entities and request payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A user account. `name` and `email` are unique across all accounts; the id
/// comes from the id generator, never from the database.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub create_time: DateTime<Utc>,
    pub last_update_time: DateTime<Utc>,
}

/// Input for account creation. The secret is the only field that must never
/// be logged or persisted in cleartext.
#[derive(Debug, Clone)]
pub struct AccountCreateRequest {
    pub name: String,
    pub email: String,
    pub secret: String,
}

/// Records that an account is reachable through a provider. For the internal
/// provider the provider-side id mirrors the account id as a string.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityBinding {
    pub account_id: u64,
    pub provider_id: String,
    pub provider_account_id: String,
    pub create_time: DateTime<Utc>,
}
