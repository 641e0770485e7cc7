use thiserror::Error;

use crate::idgen::IdError;

/// Domain error taxonomy.
///
/// `NameOccupied` / `EmailOccupied` are expected conflicts surfaced to the
/// caller verbatim. `AuthenticationFailure` is deliberately uniform: it never
/// says whether the credential row was missing or merely wrong.
/// `AccountNotFound` stays distinguishable from authentication failure at
/// this layer; the HTTP layer collapses both into one 401.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("account name is occupied")]
    NameOccupied,
    #[error("account email is occupied")]
    EmailOccupied,
    #[error("account does not exist")]
    AccountNotFound,
    #[error("account does not exist or credential does not match")]
    AuthenticationFailure,
    #[error("failed to allocate an account id")]
    IdAllocation(#[source] IdError),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
