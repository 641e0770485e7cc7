//! Persistence contracts consumed by the domain layer.
//!
//! Durability and querying belong to the implementations; the domain only
//! relies on the semantics spelled out here.

use anyhow::Result;
use async_trait::async_trait;

use super::entity::Account;

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn is_name_occupied(&self, name: &str) -> Result<bool>;
    async fn is_email_occupied(&self, email: &str) -> Result<bool>;
    /// `Ok(None)` when no account carries the name.
    async fn find_by_name(&self, name: &str) -> Result<Option<Account>>;
    async fn save(&self, account: &Account) -> Result<()>;
    async fn count(&self) -> Result<u64>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Persist the hashed secret for an account, replacing any prior digest
    /// (credential rotation). At most one credential row per account.
    async fn save(&self, account_id: u64, hashed_secret: &str) -> Result<()>;
    /// Whether the stored digest equals `hashed_secret`. A missing credential
    /// row is a plain mismatch, not an error.
    async fn matches(&self, account_id: u64, hashed_secret: &str) -> Result<bool>;
}

#[async_trait]
pub trait BindingStore: Send + Sync {
    async fn save(
        &self,
        account_id: u64,
        provider_id: &str,
        provider_account_id: &str,
    ) -> Result<()>;
}
