//! Postgres-backed store implementations.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::Instrument;

use super::entity::Account;
use super::store::{AccountStore, BindingStore, CredentialStore};

/// Ids are minted as u64 but stored in BIGINT columns. The generator never
/// sets the sign bit, so the conversions cannot fail in practice; they are
/// still checked rather than cast.
fn db_id(id: u64) -> Result<i64> {
    i64::try_from(id).with_context(|| format!("account id {id} does not fit BIGINT"))
}

fn domain_id(id: i64) -> Result<u64> {
    u64::try_from(id).with_context(|| format!("negative account id {id} in database"))
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn query_span(operation: &str, statement: &str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn is_name_occupied(&self, name: &str) -> Result<bool> {
        let query = "SELECT 1 FROM accounts WHERE name = $1 LIMIT 1";
        let row = sqlx::query(query)
            .bind(name)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to check account name occupancy")?;
        Ok(row.is_some())
    }

    async fn is_email_occupied(&self, email: &str) -> Result<bool> {
        let query = "SELECT 1 FROM accounts WHERE email = $1 LIMIT 1";
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to check account email occupancy")?;
        Ok(row.is_some())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Account>> {
        let query = "SELECT id, name, email, create_time, last_update_time \
                     FROM accounts WHERE name = $1";
        let row = sqlx::query(query)
            .bind(name)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to look up account by name")?;

        row.map(|row| {
            Ok(Account {
                id: domain_id(row.get("id"))?,
                name: row.get("name"),
                email: row.get("email"),
                create_time: row.get::<DateTime<Utc>, _>("create_time"),
                last_update_time: row.get::<DateTime<Utc>, _>("last_update_time"),
            })
        })
        .transpose()
    }

    async fn save(&self, account: &Account) -> Result<()> {
        let query = "INSERT INTO accounts (id, name, email, create_time, last_update_time) \
                     VALUES ($1, $2, $3, $4, $5)";
        let result = sqlx::query(query)
            .bind(db_id(account.id)?)
            .bind(&account.name)
            .bind(&account.email)
            .bind(account.create_time)
            .bind(account.last_update_time)
            .execute(&self.pool)
            .instrument(query_span("INSERT", query))
            .await;

        match result {
            Ok(_) => Ok(()),
            // A concurrent creation can slip past the pre-checks; the
            // database uniqueness constraint is the backstop.
            Err(err) if is_unique_violation(&err) => {
                Err(err).context("account name or email was taken concurrently")
            }
            Err(err) => Err(err).context("failed to save account"),
        }
    }

    async fn count(&self) -> Result<u64> {
        let query = "SELECT COUNT(*) AS count FROM accounts";
        let row = sqlx::query(query)
            .fetch_one(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to count accounts")?;
        domain_id(row.get::<i64, _>("count"))
    }
}

#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn save(&self, account_id: u64, hashed_secret: &str) -> Result<()> {
        let query = "INSERT INTO internal_identities (account_id, hashed_identity, create_time) \
                     VALUES ($1, $2, $3) \
                     ON CONFLICT (account_id) \
                     DO UPDATE SET hashed_identity = EXCLUDED.hashed_identity";
        sqlx::query(query)
            .bind(db_id(account_id)?)
            .bind(hashed_secret)
            .bind(Utc::now())
            .execute(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .context("failed to save credential")?;
        Ok(())
    }

    async fn matches(&self, account_id: u64, hashed_secret: &str) -> Result<bool> {
        let query = "SELECT 1 FROM internal_identities \
                     WHERE account_id = $1 AND hashed_identity = $2 LIMIT 1";
        let row = sqlx::query(query)
            .bind(db_id(account_id)?)
            .bind(hashed_secret)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to compare credential")?;
        Ok(row.is_some())
    }
}

#[derive(Clone)]
pub struct PgBindingStore {
    pool: PgPool,
}

impl PgBindingStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BindingStore for PgBindingStore {
    async fn save(
        &self,
        account_id: u64,
        provider_id: &str,
        provider_account_id: &str,
    ) -> Result<()> {
        let query = "INSERT INTO identity_bindings \
                     (account_id, provider_id, provider_account_id, create_time) \
                     VALUES ($1, $2, $3, $4)";
        sqlx::query(query)
            .bind(db_id(account_id)?)
            .bind(provider_id)
            .bind(provider_account_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .context("failed to save identity binding")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_id_roundtrip() {
        assert_eq!(db_id(10).expect("fits"), 10);
        assert_eq!(domain_id(10).expect("fits"), 10);
        // The sign bit is never set by the generator, but a corrupt row must
        // not wrap around silently.
        assert!(db_id(u64::MAX).is_err());
        assert!(domain_id(-1).is_err());
    }
}
