//! Credential store boundary: username/password → principal.

use async_trait::async_trait;
use thiserror::Error;

use growthwatch_core::{DomainError, DomainResult, ManagerId};

use crate::Principal;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_USERNAME_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("username is already taken")]
    UsernameTaken,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("credential backend failure: {0}")]
    Backend(String),
}

/// Username/password authentication.
///
/// Implementations own password hashing; callers never see hashes.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// `Ok(None)` for unknown users and wrong passwords alike.
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Principal>, CredentialError>;

    async fn register(
        &self,
        username: &str,
        password: &str,
        manager_id: ManagerId,
    ) -> Result<(), CredentialError>;

    /// Drop the login belonging to a deleted manager.
    async fn forget(&self, manager_id: ManagerId) -> Result<(), CredentialError>;
}

/// Usernames are case-insensitive.
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

pub fn validate_registration(username: &str, password: &str) -> DomainResult<()> {
    let username = username.trim();
    if username.is_empty() {
        return Err(DomainError::validation("username is required"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(DomainError::validation(format!(
            "username must be at most {MAX_USERNAME_LEN} characters"
        )));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("username cannot contain whitespace"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_rules() {
        assert!(validate_registration("amara", "long-enough").is_ok());
        assert!(validate_registration("", "long-enough").is_err());
        assert!(validate_registration("two words", "long-enough").is_err());
        assert!(validate_registration("amara", "short").is_err());
    }

    #[test]
    fn usernames_are_case_insensitive() {
        assert_eq!(normalize_username("  Amara "), "amara");
    }
}
