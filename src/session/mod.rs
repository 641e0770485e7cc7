//! Session and registration-token protocol.
//!
//! Two independent expiring caches back the protocol: session tokens map to a
//! [`SecurityContext`], registration tokens are keyed by the candidate email.
//! Tokens are opaque UUIDv4 strings; expiry is a fixed offset from creation
//! (no sliding expiration).

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::cache::{ExpiringCache, SweeperHandle};
use crate::domain::{Account, AccountService, DomainError};

const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_REGISTER_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// The authenticated identity's display name carried inside a session.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub name: String,
}

/// What a session token resolves to.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SecurityContext {
    pub token: String,
    pub principal: Principal,
}

/// TTL and sweep cadence knobs for the two caches.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    session_ttl: Duration,
    register_token_ttl: Duration,
    sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_ttl: DEFAULT_SESSION_TTL,
            register_token_ttl: DEFAULT_REGISTER_TOKEN_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_register_token_ttl(mut self, ttl: Duration) -> Self {
        self.register_token_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

/// Sweeper handles for both caches, shut down together at server exit.
pub struct SessionSweepers {
    sessions: SweeperHandle,
    register_tokens: SweeperHandle,
}

impl SessionSweepers {
    pub async fn shutdown(self) {
        self.sessions.shutdown().await;
        self.register_tokens.shutdown().await;
    }
}

/// Login/logout/registration-token operations over the two caches.
pub struct SessionManager {
    accounts: Arc<AccountService>,
    sessions: ExpiringCache<String, SecurityContext>,
    register_tokens: ExpiringCache<String, String>,
    sweep_interval: Duration,
}

impl SessionManager {
    #[must_use]
    pub fn new(accounts: Arc<AccountService>, config: SessionConfig) -> Self {
        Self {
            accounts,
            sessions: ExpiringCache::new(config.session_ttl),
            register_tokens: ExpiringCache::new(config.register_token_ttl),
            sweep_interval: config.sweep_interval,
        }
    }

    /// Start the background sweepers for both caches.
    #[must_use]
    pub fn spawn_sweepers(&self) -> SessionSweepers {
        SessionSweepers {
            sessions: self.sessions.spawn_sweeper(self.sweep_interval, "sessions"),
            register_tokens: self
                .register_tokens
                .spawn_sweeper(self.sweep_interval, "register_tokens"),
        }
    }

    /// Issue a registration token for a candidate email.
    ///
    /// Idempotent while unexpired: re-requesting returns the existing token
    /// with its original deadline. The caller is responsible for checking
    /// that the email does not already belong to an account.
    pub fn issue_registration_token(&self, email: &str) -> String {
        if let Some(existing) = self.register_tokens.get(&email.to_string()) {
            return existing;
        }
        let token = Uuid::new_v4().to_string();
        self.register_tokens
            .insert(email.to_string(), token.clone());
        info!(email, "registration token issued");
        token
    }

    /// Redeem a registration token. Single use: a match deletes the entry, so
    /// a second presentation of the same token is denied.
    pub fn consume_registration_token(&self, email: &str, presented: &str) -> bool {
        match self.register_tokens.get(&email.to_string()) {
            Some(stored) if stored == presented => {
                self.register_tokens.remove(&email.to_string());
                true
            }
            _ => false,
        }
    }

    /// Authenticate and mint a session token.
    ///
    /// # Errors
    /// Propagates [`AccountService::authenticate`] errors unchanged.
    #[instrument(skip(self, secret))]
    pub async fn login(&self, name: &str, secret: &str) -> Result<SecurityContext, DomainError> {
        let account: Account = self.accounts.authenticate(name, secret).await?;

        let context = SecurityContext {
            token: Uuid::new_v4().to_string(),
            principal: Principal { name: account.name },
        };
        self.sessions
            .insert(context.token.clone(), context.clone());

        info!(account_id = account.id, "session created");

        Ok(context)
    }

    /// Delete a session token. An absent token is a no-op, not an error.
    pub fn logout(&self, token: &str) {
        self.sessions.remove(&token.to_string());
    }

    /// Pure lookup; never renews the TTL.
    #[must_use]
    pub fn current_session(&self, token: &str) -> Option<SecurityContext> {
        self.sessions.get(&token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::memory::{MemoryAccountStore, MemoryBindingStore, MemoryCredentialStore};
    use crate::domain::AccountCreateRequest;
    use crate::idgen::IdWorker;

    async fn manager_with_account(config: SessionConfig) -> SessionManager {
        let service = Arc::new(AccountService::new(
            Arc::new(IdWorker::new(0, 0).expect("valid worker")),
            Arc::new(MemoryAccountStore::new()),
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(MemoryBindingStore::new()),
        ));
        service
            .create_account(AccountCreateRequest {
                name: "ann".to_string(),
                email: "ann@example.com".to_string(),
                secret: "s1".to_string(),
            })
            .await
            .expect("create account");
        SessionManager::new(service, config)
    }

    #[tokio::test]
    async fn login_then_current_session_returns_principal() {
        let manager = manager_with_account(SessionConfig::default()).await;
        let context = manager.login("ann", "s1").await.expect("login");

        let current = manager.current_session(&context.token).expect("session");
        assert_eq!(current.principal.name, "ann");
        assert_eq!(current.token, context.token);
    }

    #[tokio::test]
    async fn logout_removes_the_session() {
        let manager = manager_with_account(SessionConfig::default()).await;
        let context = manager.login("ann", "s1").await.expect("login");

        manager.logout(&context.token);
        assert!(manager.current_session(&context.token).is_none());
        // Logging out an absent token is a no-op.
        manager.logout(&context.token);
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials() {
        let manager = manager_with_account(SessionConfig::default()).await;
        assert!(matches!(
            manager.login("ann", "wrong").await,
            Err(DomainError::AuthenticationFailure)
        ));
        assert!(matches!(
            manager.login("nobody", "s1").await,
            Err(DomainError::AccountNotFound)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn sessions_expire_without_logout() {
        let ttl = Duration::from_secs(10);
        let manager =
            manager_with_account(SessionConfig::default().with_session_ttl(ttl)).await;
        let context = manager.login("ann", "s1").await.expect("login");

        tokio::time::advance(ttl + Duration::from_millis(1)).await;
        assert!(manager.current_session(&context.token).is_none());
    }

    #[tokio::test]
    async fn registration_token_is_idempotent_until_consumed() {
        let manager = manager_with_account(SessionConfig::default()).await;

        let first = manager.issue_registration_token("new@example.com");
        let second = manager.issue_registration_token("new@example.com");
        assert_eq!(first, second);

        assert!(manager.consume_registration_token("new@example.com", &first));
        // Single use: the same token no longer authorizes anything.
        assert!(!manager.consume_registration_token("new@example.com", &first));

        // A fresh request now mints a different token.
        let third = manager.issue_registration_token("new@example.com");
        assert_ne!(first, third);
    }

    #[tokio::test]
    async fn registration_token_must_match() {
        let manager = manager_with_account(SessionConfig::default()).await;
        let token = manager.issue_registration_token("new@example.com");

        assert!(!manager.consume_registration_token("new@example.com", "not-the-token"));
        assert!(!manager.consume_registration_token("other@example.com", &token));
        // The mismatches above must not have consumed the real token.
        assert!(manager.consume_registration_token("new@example.com", &token));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_registration_token_is_rejected() {
        let ttl = Duration::from_secs(10);
        let manager =
            manager_with_account(SessionConfig::default().with_register_token_ttl(ttl)).await;
        let token = manager.issue_registration_token("new@example.com");

        tokio::time::advance(ttl + Duration::from_millis(1)).await;
        assert!(!manager.consume_registration_token("new@example.com", &token));
    }
}
