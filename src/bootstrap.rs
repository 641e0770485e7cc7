//! First-run provisioning.

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use crate::domain::{Account, AccountCreateRequest, AccountService};

const ADMIN_NAME: &str = "admin";
const ADMIN_EMAIL: &str = "admin@identigo.local";

/// Create the default admin account when the account store is empty.
///
/// Returns `None` when any account already exists; the default admin is only
/// ever provisioned on a fresh store.
///
/// # Errors
/// Propagates store and creation failures; startup should abort on them.
pub async fn create_initial_account(
    service: &AccountService,
    admin_secret: &SecretString,
) -> Result<Option<Account>> {
    let count = service
        .accounts()
        .count()
        .await
        .context("failed to count accounts for bootstrap")?;
    if count > 0 {
        info!("accounts exist, skipping default admin creation");
        return Ok(None);
    }

    let account = service
        .create_account(AccountCreateRequest {
            name: ADMIN_NAME.to_string(),
            email: ADMIN_EMAIL.to_string(),
            secret: admin_secret.expose_secret().to_string(),
        })
        .await
        .context("failed to create the default admin account")?;

    info!(account_id = account.id, "default admin account created");

    Ok(Some(account))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::memory::{MemoryAccountStore, MemoryBindingStore, MemoryCredentialStore};
    use crate::idgen::IdWorker;
    use std::sync::Arc;

    fn service() -> AccountService {
        AccountService::new(
            Arc::new(IdWorker::new(0, 0).expect("valid worker")),
            Arc::new(MemoryAccountStore::new()),
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(MemoryBindingStore::new()),
        )
    }

    #[tokio::test]
    async fn creates_admin_on_empty_store() {
        let service = service();
        let secret = SecretString::from("admin123");

        let created = create_initial_account(&service, &secret)
            .await
            .expect("bootstrap")
            .expect("admin created");
        assert_eq!(created.name, ADMIN_NAME);

        service
            .authenticate(ADMIN_NAME, "admin123")
            .await
            .expect("admin can log in");
    }

    #[tokio::test]
    async fn skips_when_accounts_exist() {
        let service = service();
        service
            .create_account(AccountCreateRequest {
                name: "ann".to_string(),
                email: "ann@example.com".to_string(),
                secret: "s1".to_string(),
            })
            .await
            .expect("create");

        let result = create_initial_account(&service, &SecretString::from("admin123"))
            .await
            .expect("bootstrap");
        assert!(result.is_none());
    }
}
