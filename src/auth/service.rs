//! Signup/signin orchestration.
//!
//! Composes the password hasher, the credential store, and the token
//! issuer through explicit constructor injection. Hashing and verification
//! are CPU-bound, so they run on the blocking pool instead of stalling the
//! request-acceptance path.

use std::sync::Arc;

use tokio::task;

use super::password::PasswordHasher;
use super::token::TokenIssuer;
use crate::store::{CredentialStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Signup with an email that is already registered.
    #[error("credentials taken")]
    CredentialsTaken,
    /// Signin with an unknown email or wrong password — the two cases are
    /// intentionally indistinguishable.
    #[error("credentials do not match")]
    CredentialsMismatch,
    #[error("internal auth failure: {0}")]
    Internal(String),
}

pub struct AuthService {
    hasher: PasswordHasher,
    issuer: Arc<TokenIssuer>,
    store: Arc<dyn CredentialStore>,
    /// Digest verified against when the email is unknown, so a signin miss
    /// costs the same as a wrong password.
    dummy_digest: String,
}

impl AuthService {
    pub fn new(
        hasher: PasswordHasher,
        issuer: Arc<TokenIssuer>,
        store: Arc<dyn CredentialStore>,
    ) -> anyhow::Result<Self> {
        let dummy_digest = hasher.hash("markstash.dummy.verification.subject")?;
        Ok(Self {
            hasher,
            issuer,
            store,
            dummy_digest,
        })
    }

    /// Register a new account and return its access token.
    pub async fn signup(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let digest = task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let account = self.store.create(email, &digest).map_err(|e| match e {
            StoreError::AlreadyExists => AuthError::CredentialsTaken,
            other => AuthError::Internal(other.to_string()),
        })?;

        tracing::info!(account_id = %account.id, "account created");
        Ok(self.issuer.issue(&account.id, &account.email))
    }

    /// Authenticate an existing account and return a fresh access token.
    pub async fn signin(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let account = self
            .store
            .find_by_email(email)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let hasher = self.hasher.clone();
        let password = password.to_string();
        match account {
            Some(account) => {
                let digest = account.password_hash.clone();
                let matches = task::spawn_blocking(move || hasher.verify(&digest, &password))
                    .await
                    .map_err(|e| AuthError::Internal(e.to_string()))?;
                if !matches {
                    return Err(AuthError::CredentialsMismatch);
                }
                Ok(self.issuer.issue(&account.id, &account.email))
            }
            None => {
                let dummy = self.dummy_digest.clone();
                task::spawn_blocking(move || hasher.verify(&dummy, &password))
                    .await
                    .map_err(|e| AuthError::Internal(e.to_string()))?;
                Err(AuthError::CredentialsMismatch)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    fn service() -> (AuthService, Arc<TokenIssuer>) {
        let issuer = Arc::new(TokenIssuer::new("test-signing-secret", 60));
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let service = AuthService::new(PasswordHasher::new(), Arc::clone(&issuer), store).unwrap();
        (service, issuer)
    }

    #[tokio::test]
    async fn signup_returns_valid_token() {
        let (service, issuer) = service();
        let token = service.signup("a@x.com", "secret1").await.unwrap();
        let claims = issuer.validate(&token).unwrap();
        assert_eq!(claims.email, "a@x.com");
    }

    #[tokio::test]
    async fn duplicate_signup_is_credentials_taken() {
        let (service, _) = service();
        service.signup("a@x.com", "secret1").await.unwrap();
        let result = service.signup("a@x.com", "secret2").await;
        assert!(matches!(result, Err(AuthError::CredentialsTaken)));
    }

    #[tokio::test]
    async fn signin_with_correct_password_succeeds() {
        let (service, issuer) = service();
        service.signup("a@x.com", "secret1").await.unwrap();

        let token = service.signin("a@x.com", "secret1").await.unwrap();
        assert!(issuer.validate(&token).is_ok());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_are_the_same_error() {
        let (service, _) = service();
        service.signup("a@x.com", "secret1").await.unwrap();

        let wrong_password = service.signin("a@x.com", "wrong").await;
        let unknown_email = service.signin("ghost@x.com", "secret1").await;

        assert!(matches!(wrong_password, Err(AuthError::CredentialsMismatch)));
        assert!(matches!(unknown_email, Err(AuthError::CredentialsMismatch)));
    }
}
