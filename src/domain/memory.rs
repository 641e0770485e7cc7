//! In-memory store implementations.
//!
//! Used by the test suite and handy for running the service without a
//! database. Same contracts as the Postgres stores, including the uniqueness
//! backstop on save.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::entity::{Account, IdentityBinding};
use super::store::{AccountStore, BindingStore, CredentialStore};

#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<Vec<Account>>,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn is_name_occupied(&self, name: &str) -> Result<bool> {
        let accounts = self
            .accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(accounts.iter().any(|account| account.name == name))
    }

    async fn is_email_occupied(&self, email: &str) -> Result<bool> {
        let accounts = self
            .accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(accounts.iter().any(|account| account.email == email))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Account>> {
        let accounts = self
            .accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(accounts.iter().find(|account| account.name == name).cloned())
    }

    async fn save(&self, account: &Account) -> Result<()> {
        let mut accounts = self
            .accounts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if accounts
            .iter()
            .any(|existing| existing.name == account.name || existing.email == account.email)
        {
            return Err(anyhow!("account name or email was taken concurrently"));
        }
        accounts.push(account.clone());
        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        let accounts = self
            .accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(accounts.len() as u64)
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    credentials: RwLock<HashMap<u64, String>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn save(&self, account_id: u64, hashed_secret: &str) -> Result<()> {
        self.credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(account_id, hashed_secret.to_string());
        Ok(())
    }

    async fn matches(&self, account_id: u64, hashed_secret: &str) -> Result<bool> {
        let credentials = self
            .credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(credentials
            .get(&account_id)
            .is_some_and(|stored| stored == hashed_secret))
    }
}

#[derive(Default)]
pub struct MemoryBindingStore {
    bindings: RwLock<Vec<IdentityBinding>>,
}

impl MemoryBindingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded bindings, for assertions.
    #[must_use]
    pub fn bindings(&self) -> Vec<IdentityBinding> {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl BindingStore for MemoryBindingStore {
    async fn save(
        &self,
        account_id: u64,
        provider_id: &str,
        provider_account_id: &str,
    ) -> Result<()> {
        self.bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(IdentityBinding {
                account_id,
                provider_id: provider_id.to_string(),
                provider_account_id: provider_account_id.to_string(),
                create_time: Utc::now(),
            });
        Ok(())
    }
}
