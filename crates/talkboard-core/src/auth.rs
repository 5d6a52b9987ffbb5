//! Identity provider boundary for sign-in and sign-up.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;
use thiserror::Error;
use uuid::Uuid;

/// Minimum password length accepted by [`MemoryIdentityProvider`].
pub const MIN_PASSWORD_LEN: usize = 6;

/// Authentication errors. The display text is meant for the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("The email address is badly formatted.")]
    InvalidEmail,
    #[error("The password must be {0} characters long or more.")]
    WeakPassword(usize),
    #[error("The email address is already in use by another account.")]
    EmailInUse,
    #[error("There is no user record corresponding to this email.")]
    UserNotFound,
    #[error("The password is invalid.")]
    WrongPassword,
    #[error("Identity service error: {0}")]
    Service(String),
}

/// Result type for identity operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Boxed future for identity calls.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Email and password pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Opaque handle for a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserHandle {
    pub uid: String,
    pub email: String,
}

/// An external identity service.
pub trait IdentityProvider {
    /// Sign in an existing user.
    fn sign_in(&self, credentials: &Credentials) -> BoxFuture<'_, AuthResult<UserHandle>>;

    /// Register a new user.
    fn sign_up(&self, credentials: &Credentials) -> BoxFuture<'_, AuthResult<UserHandle>>;
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
}

struct StoredUser {
    uid: String,
    password: String,
}

/// In-memory identity provider for testing and local boards.
#[derive(Default)]
pub struct MemoryIdentityProvider {
    users: RwLock<HashMap<String, StoredUser>>,
}

impl MemoryIdentityProvider {
    /// Create a provider with no users.
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityProvider for MemoryIdentityProvider {
    fn sign_in(&self, credentials: &Credentials) -> BoxFuture<'_, AuthResult<UserHandle>> {
        let credentials = credentials.clone();
        Box::pin(async move {
            let users = self
                .users
                .read()
                .map_err(|e| AuthError::Service(format!("Lock error: {}", e)))?;
            let user = users
                .get(&credentials.email)
                .ok_or(AuthError::UserNotFound)?;
            if user.password != credentials.password {
                return Err(AuthError::WrongPassword);
            }
            Ok(UserHandle {
                uid: user.uid.clone(),
                email: credentials.email,
            })
        })
    }

    fn sign_up(&self, credentials: &Credentials) -> BoxFuture<'_, AuthResult<UserHandle>> {
        let credentials = credentials.clone();
        Box::pin(async move {
            if !is_valid_email(&credentials.email) {
                return Err(AuthError::InvalidEmail);
            }
            if credentials.password.chars().count() < MIN_PASSWORD_LEN {
                return Err(AuthError::WeakPassword(MIN_PASSWORD_LEN));
            }

            let mut users = self
                .users
                .write()
                .map_err(|e| AuthError::Service(format!("Lock error: {}", e)))?;
            if users.contains_key(&credentials.email) {
                return Err(AuthError::EmailInUse);
            }

            let uid = Uuid::new_v4().to_string();
            users.insert(
                credentials.email.clone(),
                StoredUser {
                    uid: uid.clone(),
                    password: credentials.password,
                },
            );
            log::info!("Registered user {}", credentials.email);
            Ok(UserHandle {
                uid,
                email: credentials.email,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::block_on;

    #[test]
    fn test_sign_up_then_sign_in() {
        let provider = MemoryIdentityProvider::new();
        let credentials = Credentials::new("ada@example.com", "secret1");

        let created = block_on(provider.sign_up(&credentials)).unwrap();
        let signed_in = block_on(provider.sign_in(&credentials)).unwrap();
        assert_eq!(created, signed_in);
        assert_eq!(signed_in.email, "ada@example.com");
    }

    #[test]
    fn test_wrong_password() {
        let provider = MemoryIdentityProvider::new();
        block_on(provider.sign_up(&Credentials::new("ada@example.com", "secret1"))).unwrap();

        let result = block_on(provider.sign_in(&Credentials::new("ada@example.com", "secret2")));
        assert_eq!(result, Err(AuthError::WrongPassword));
    }

    #[test]
    fn test_unknown_user() {
        let provider = MemoryIdentityProvider::new();
        let result = block_on(provider.sign_in(&Credentials::new("nobody@example.com", "secret1")));
        assert_eq!(result, Err(AuthError::UserNotFound));
    }

    #[test]
    fn test_sign_up_validation() {
        let provider = MemoryIdentityProvider::new();
        assert_eq!(
            block_on(provider.sign_up(&Credentials::new("not-an-email", "secret1"))),
            Err(AuthError::InvalidEmail)
        );
        assert_eq!(
            block_on(provider.sign_up(&Credentials::new("ada@example.com", "abc"))),
            Err(AuthError::WeakPassword(MIN_PASSWORD_LEN))
        );

        block_on(provider.sign_up(&Credentials::new("ada@example.com", "secret1"))).unwrap();
        assert_eq!(
            block_on(provider.sign_up(&Credentials::new("ada@example.com", "other12"))),
            Err(AuthError::EmailInUse)
        );
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a@b..co"));
        assert!(!is_valid_email("a@b@c.co"));
    }
}
