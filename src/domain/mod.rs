//! Account domain: entities, store contracts, credential hashing, and the
//! create/authenticate orchestration.

pub mod account;
pub mod entity;
pub mod error;
pub mod hasher;
pub mod memory;
pub mod storage;
pub mod store;

pub use account::{AccountService, INTERNAL_PROVIDER_ID};
pub use entity::{Account, AccountCreateRequest, IdentityBinding};
pub use error::DomainError;
pub use store::{AccountStore, BindingStore, CredentialStore};
