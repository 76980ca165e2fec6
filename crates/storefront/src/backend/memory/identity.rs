//! In-memory email/password identity provider.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{TimeDelta, Utc};
use uuid::Uuid;

use digital_mart_core::{Email, UserId};

use crate::backend::{BackendError, Identity, IdentityProvider, IssuedToken};
use crate::services::auth::AuthError;

/// Minimum password length accepted by the provider.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Default lifetime of an issued token.
pub const DEFAULT_TOKEN_TTL: TimeDelta = TimeDelta::hours(1);

struct Account {
    identity: Identity,
    password_hash: String,
}

struct TokenEntry {
    uid: UserId,
    expires_at: chrono::DateTime<Utc>,
}

#[derive(Default)]
struct IdentityState {
    accounts: HashMap<UserId, Account>,
    by_email: HashMap<Email, UserId>,
    tokens: HashMap<String, TokenEntry>,
}

/// In-memory identity provider.
///
/// Passwords are hashed with Argon2id; tokens are 256-bit random values,
/// base64url encoded, valid for a configurable TTL.
#[derive(Clone)]
pub struct MemoryIdentityProvider {
    state: Arc<RwLock<IdentityState>>,
    argon2: Argon2<'static>,
    token_ttl: TimeDelta,
    offline: Arc<AtomicBool>,
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentityProvider {
    /// Create a provider with production hashing parameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(IdentityState::default())),
            argon2: Argon2::default(),
            token_ttl: DEFAULT_TOKEN_TTL,
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use minimal Argon2 cost parameters.
    ///
    /// Only for development and tests: hashing becomes nearly free.
    #[must_use]
    pub fn with_fast_hashing(mut self) -> Self {
        if let Ok(params) = Params::new(Params::MIN_M_COST, Params::MIN_T_COST, 1, None) {
            self.argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        }
        self
    }

    /// Set how long issued tokens stay valid.
    #[must_use]
    pub const fn with_token_ttl(mut self, ttl: TimeDelta) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Simulate the provider being unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), AuthError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("identity provider is offline".to_owned()).into());
        }
        Ok(())
    }

    fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| AuthError::PasswordHash)
    }

    fn verify_password(&self, password: &str, hash: &str) -> Result<(), AuthError> {
        let parsed = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| AuthError::InvalidCredentials)
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

fn poisoned(operation: &'static str) -> AuthError {
    AuthError::Backend(BackendError::LockPoisoned(operation))
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn create_user(&self, email: &Email, password: &str) -> Result<Identity, AuthError> {
        self.check_online()?;
        validate_password(password)?;
        let password_hash = self.hash_password(password)?;

        let mut state = self.state.write().map_err(|_| poisoned("create_user"))?;
        if state.by_email.contains_key(email) {
            return Err(AuthError::UserAlreadyExists);
        }

        let identity = Identity {
            uid: UserId::new(Uuid::new_v4().simple().to_string()),
            email: email.clone(),
            display_name: None,
        };
        state
            .by_email
            .insert(email.clone(), identity.uid.clone());
        state.accounts.insert(
            identity.uid.clone(),
            Account {
                identity: identity.clone(),
                password_hash,
            },
        );
        Ok(identity)
    }

    async fn update_profile(
        &self,
        uid: &UserId,
        display_name: &str,
    ) -> Result<Identity, AuthError> {
        self.check_online()?;
        let mut state = self.state.write().map_err(|_| poisoned("update_profile"))?;
        let account = state.accounts.get_mut(uid).ok_or(AuthError::UserNotFound)?;
        account.identity.display_name = Some(display_name.to_owned());
        Ok(account.identity.clone())
    }

    async fn sign_in(&self, email: &Email, password: &str) -> Result<Identity, AuthError> {
        self.check_online()?;
        let (identity, hash) = {
            let state = self.state.read().map_err(|_| poisoned("sign_in"))?;
            let account = state
                .by_email
                .get(email)
                .and_then(|uid| state.accounts.get(uid))
                .ok_or(AuthError::InvalidCredentials)?;
            (account.identity.clone(), account.password_hash.clone())
        };

        self.verify_password(password, &hash)?;
        Ok(identity)
    }

    async fn issue_token(&self, uid: &UserId) -> Result<IssuedToken, AuthError> {
        self.check_online()?;
        let mut state = self.state.write().map_err(|_| poisoned("issue_token"))?;
        if !state.accounts.contains_key(uid) {
            return Err(AuthError::UserNotFound);
        }

        let issued = IssuedToken {
            token: generate_token(),
            expires_at: Utc::now() + self.token_ttl,
        };
        state.tokens.insert(
            issued.token.clone(),
            TokenEntry {
                uid: uid.clone(),
                expires_at: issued.expires_at,
            },
        );
        Ok(issued)
    }

    async fn verify_token(&self, token: &str) -> Result<Identity, AuthError> {
        self.check_online()?;
        let mut state = self.state.write().map_err(|_| poisoned("verify_token"))?;
        let uid = match state.tokens.get(token) {
            Some(entry) if entry.expires_at > Utc::now() => entry.uid.clone(),
            Some(_) => {
                state.tokens.remove(token);
                return Err(AuthError::InvalidSession);
            }
            None => return Err(AuthError::InvalidSession),
        };

        state
            .accounts
            .get(&uid)
            .map(|a| a.identity.clone())
            .ok_or(AuthError::InvalidSession)
    }

    async fn revoke_token(&self, token: &str) -> Result<(), AuthError> {
        self.check_online()?;
        let mut state = self.state.write().map_err(|_| poisoned("revoke_token"))?;
        state.tokens.remove(token);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn provider() -> MemoryIdentityProvider {
        MemoryIdentityProvider::new().with_fast_hashing()
    }

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_sign_in() {
        let idp = provider();
        let created = idp
            .create_user(&email("ann@shop.io"), "hunter22")
            .await
            .unwrap();

        let signed_in = idp.sign_in(&email("ANN@shop.io"), "hunter22").await.unwrap();
        assert_eq!(created.uid, signed_in.uid);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let idp = provider();
        idp.create_user(&email("ann@shop.io"), "hunter22")
            .await
            .unwrap();
        let err = idp
            .create_user(&email("ann@shop.io"), "other-pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_weak_password_rejected() {
        let err = provider()
            .create_user(&email("ann@shop.io"), "12345")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword(_)));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_look_the_same() {
        let idp = provider();
        idp.create_user(&email("ann@shop.io"), "hunter22")
            .await
            .unwrap();

        let wrong = idp.sign_in(&email("ann@shop.io"), "hunter23").await;
        let unknown = idp.sign_in(&email("bob@shop.io"), "hunter22").await;
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_token_lifecycle() {
        let idp = provider();
        let identity = idp
            .create_user(&email("ann@shop.io"), "hunter22")
            .await
            .unwrap();
        let issued = idp.issue_token(&identity.uid).await.unwrap();

        assert_eq!(idp.verify_token(&issued.token).await.unwrap(), identity);

        idp.revoke_token(&issued.token).await.unwrap();
        assert!(matches!(
            idp.verify_token(&issued.token).await,
            Err(AuthError::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let idp = provider().with_token_ttl(TimeDelta::zero());
        let identity = idp
            .create_user(&email("ann@shop.io"), "hunter22")
            .await
            .unwrap();
        let issued = idp.issue_token(&identity.uid).await.unwrap();

        assert!(matches!(
            idp.verify_token(&issued.token).await,
            Err(AuthError::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn test_update_profile_sets_display_name() {
        let idp = provider();
        let identity = idp
            .create_user(&email("ann@shop.io"), "hunter22")
            .await
            .unwrap();
        let updated = idp.update_profile(&identity.uid, "Ann").await.unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Ann"));

        let missing = idp.update_profile(&UserId::new("nobody"), "X").await;
        assert!(matches!(missing, Err(AuthError::UserNotFound)));
    }
}
