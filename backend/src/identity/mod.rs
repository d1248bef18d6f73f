//! Identity provider abstraction.
//!
//! Owns account credentials and the bearer tokens that prove who a caller is.

mod local;

pub use local::LocalIdentityProvider;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A freshly issued bearer token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub uid: String,
    pub expires_in: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("The email address is already in use by another account.")]
    EmailExists,
    #[error("There is no user record corresponding to the provided identifier: {0}")]
    AccountNotFound(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    InvalidToken(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("Identity storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, IdentityError>;

/// Canonical form of an account email. Addresses differing only in case
/// name the same account.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register credentials and return the new account's uid.
    async fn create_account(&self, email: &str, password: &str, display_name: &str) -> Result<String>;

    /// Validate a bearer token and return the uid it was issued to.
    async fn verify_token(&self, token: &str) -> Result<String>;

    /// Look up an account by email, ignoring case.
    async fn account_by_email(&self, email: &str) -> Result<Account>;

    async fn list_accounts(&self) -> Result<Vec<Account>>;

    async fn delete_account(&self, uid: &str) -> Result<()>;

    /// Exchange email and password for a bearer token.
    async fn sign_in(&self, email: &str, password: &str) -> Result<IssuedToken>;
}
