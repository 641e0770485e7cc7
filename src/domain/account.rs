//! Account creation and authentication orchestration.

use std::sync::Arc;
use tracing::{error, info, instrument};

use super::entity::{Account, AccountCreateRequest};
use super::error::DomainError;
use super::hasher::hash_credential;
use super::store::{AccountStore, BindingStore, CredentialStore};
use crate::idgen::IdWorker;

/// Provider namespace for password-based login. The only provider in scope;
/// its provider-side account id mirrors the account id as a string.
pub const INTERNAL_PROVIDER_ID: &str = "internal";

/// Orchestrates the id generator, credential hasher, and the three stores.
pub struct AccountService {
    id_worker: Arc<IdWorker>,
    accounts: Arc<dyn AccountStore>,
    credentials: Arc<dyn CredentialStore>,
    bindings: Arc<dyn BindingStore>,
}

impl AccountService {
    #[must_use]
    pub fn new(
        id_worker: Arc<IdWorker>,
        accounts: Arc<dyn AccountStore>,
        credentials: Arc<dyn CredentialStore>,
        bindings: Arc<dyn BindingStore>,
    ) -> Self {
        Self {
            id_worker,
            accounts,
            credentials,
            bindings,
        }
    }

    #[must_use]
    pub fn accounts(&self) -> &Arc<dyn AccountStore> {
        &self.accounts
    }

    /// Create an account with its credential and internal provider binding.
    ///
    /// The three writes are not atomic: a store failure after the account row
    /// is saved can leave it without a credential or binding. The uniqueness
    /// pre-checks are advisory; the account store's own constraint is the
    /// backstop against creation races.
    ///
    /// # Errors
    /// `NameOccupied` / `EmailOccupied` on conflicts, `IdAllocation` when the
    /// generator fails, `Store` for anything the backing stores report.
    #[instrument(skip(self, request), fields(name = %request.name, email = %request.email))]
    pub async fn create_account(
        &self,
        request: AccountCreateRequest,
    ) -> Result<Account, DomainError> {
        if self.accounts.is_name_occupied(&request.name).await? {
            return Err(DomainError::NameOccupied);
        }
        if self.accounts.is_email_occupied(&request.email).await? {
            return Err(DomainError::EmailOccupied);
        }

        let account_id = self.id_worker.next_id().map_err(|err| {
            error!("failed to allocate account id: {err}");
            DomainError::IdAllocation(err)
        })?;

        let now = chrono::Utc::now();
        let account = Account {
            id: account_id,
            name: request.name,
            email: request.email,
            create_time: now,
            last_update_time: now,
        };

        self.accounts.save(&account).await?;

        let hashed = hash_credential(request.secret.as_bytes());
        self.credentials.save(account_id, &hashed).await?;
        self.bindings
            .save(
                account_id,
                INTERNAL_PROVIDER_ID,
                &account_id.to_string(),
            )
            .await?;

        info!(account_id, "account created");

        Ok(account)
    }

    /// Authenticate a name/secret pair against the internal provider.
    ///
    /// # Errors
    /// `AccountNotFound` when no account carries the name;
    /// `AuthenticationFailure` for any credential mismatch, including a
    /// missing credential row — the two mismatch causes are indistinguishable
    /// on purpose.
    #[instrument(skip(self, secret))]
    pub async fn authenticate(&self, name: &str, secret: &str) -> Result<Account, DomainError> {
        let account = self
            .accounts
            .find_by_name(name)
            .await?
            .ok_or(DomainError::AccountNotFound)?;

        let hashed = hash_credential(secret.as_bytes());
        if self.credentials.matches(account.id, &hashed).await? {
            Ok(account)
        } else {
            Err(DomainError::AuthenticationFailure)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::memory::{MemoryAccountStore, MemoryBindingStore, MemoryCredentialStore};

    struct Fixture {
        service: AccountService,
        bindings: Arc<MemoryBindingStore>,
    }

    fn fixture() -> Fixture {
        let bindings = Arc::new(MemoryBindingStore::new());
        let service = AccountService::new(
            Arc::new(IdWorker::new(0, 0).expect("valid worker")),
            Arc::new(MemoryAccountStore::new()),
            Arc::new(MemoryCredentialStore::new()),
            Arc::clone(&bindings) as Arc<dyn BindingStore>,
        );
        Fixture { service, bindings }
    }

    fn request(name: &str, email: &str, secret: &str) -> AccountCreateRequest {
        AccountCreateRequest {
            name: name.to_string(),
            email: email.to_string(),
            secret: secret.to_string(),
        }
    }

    #[tokio::test]
    async fn create_then_authenticate_roundtrip() {
        let fixture = fixture();
        let created = fixture
            .service
            .create_account(request("ann", "ann@example.com", "s1"))
            .await
            .expect("create");

        let authenticated = fixture
            .service
            .authenticate("ann", "s1")
            .await
            .expect("authenticate");
        assert_eq!(authenticated.id, created.id);
        assert_eq!(created.create_time, created.last_update_time);
    }

    #[tokio::test]
    async fn create_records_internal_binding() {
        let fixture = fixture();
        let created = fixture
            .service
            .create_account(request("ann", "ann@example.com", "s1"))
            .await
            .expect("create");

        let bindings = fixture.bindings.bindings();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].account_id, created.id);
        assert_eq!(bindings[0].provider_id, INTERNAL_PROVIDER_ID);
        assert_eq!(bindings[0].provider_account_id, created.id.to_string());
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected() {
        let fixture = fixture();
        fixture
            .service
            .create_account(request("ann", "ann@example.com", "s1"))
            .await
            .expect("create");

        let err = fixture
            .service
            .create_account(request("ann", "other@example.com", "s2"))
            .await
            .expect_err("duplicate name");
        assert!(matches!(err, DomainError::NameOccupied));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let fixture = fixture();
        fixture
            .service
            .create_account(request("ann", "ann@example.com", "s1"))
            .await
            .expect("create");

        let err = fixture
            .service
            .create_account(request("bob", "ann@example.com", "s2"))
            .await
            .expect_err("duplicate email");
        assert!(matches!(err, DomainError::EmailOccupied));
    }

    #[tokio::test]
    async fn wrong_secret_is_a_uniform_failure() {
        let fixture = fixture();
        fixture
            .service
            .create_account(request("ann", "ann@example.com", "s1"))
            .await
            .expect("create");

        let err = fixture
            .service
            .authenticate("ann", "s1x")
            .await
            .expect_err("wrong secret");
        assert!(matches!(err, DomainError::AuthenticationFailure));
    }

    #[tokio::test]
    async fn unknown_name_is_not_found() {
        let fixture = fixture();
        let err = fixture
            .service
            .authenticate("nobody", "s1")
            .await
            .expect_err("unknown name");
        assert!(matches!(err, DomainError::AccountNotFound));
    }

    #[tokio::test]
    async fn resaving_a_credential_rotates_it() {
        let fixture = fixture();
        let created = fixture
            .service
            .create_account(request("ann", "ann@example.com", "old"))
            .await
            .expect("create");

        // Rotation goes straight through the credential store contract.
        let rotated = hash_credential(b"new");
        fixture
            .service
            .credentials
            .save(created.id, &rotated)
            .await
            .expect("rotate");

        assert!(matches!(
            fixture.service.authenticate("ann", "old").await,
            Err(DomainError::AuthenticationFailure)
        ));
        fixture
            .service
            .authenticate("ann", "new")
            .await
            .expect("rotated secret");
    }
}
