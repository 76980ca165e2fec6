//! Authentication gateway.
//!
//! Wraps the identity provider and the user records: registration creates an
//! identity, sets its display name, writes the user record and issues a
//! bearer token. Every login, logout and token refresh is broadcast to
//! identity listeners.

mod error;

pub use error::AuthError;

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use digital_mart_core::Email;

use crate::backend::{DocumentStore, Identity, IdentityProvider, collections, to_fields};
use crate::models::{AuthSession, SessionUser, UserRecord};

/// Authentication gateway.
///
/// Each gateway keeps its own "current identity" channel: listeners only
/// see sign-ins and sign-outs performed through this gateway.
pub struct AuthGateway {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    current: watch::Sender<Option<SessionUser>>,
}

impl AuthGateway {
    /// Create a gateway over an identity provider and the user record store.
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn DocumentStore>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            identity,
            store,
            current,
        }
    }

    /// Register a new account and sign it in.
    ///
    /// The steps are not transactional. If anything fails after the identity
    /// was created, the identity stays without a user record; the cart store
    /// creates the record lazily on first access.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::WeakPassword` or
    /// `AuthError::UserAlreadyExists` from registration, or
    /// `AuthError::Backend` if a later step fails.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthSession, AuthError> {
        let email = Email::parse(email)?;
        let identity = self.identity.create_user(&email, password).await?;

        match self.finish_sign_up(identity.clone(), name.trim()).await {
            Ok(session) => {
                info!(uid = %session.user.uid, "Account created");
                self.current.send_replace(Some(session.user.clone()));
                Ok(session)
            }
            Err(e) => {
                warn!(
                    uid = %identity.uid,
                    error = %e,
                    "Sign-up failed after the identity was created; it has no user record"
                );
                Err(e)
            }
        }
    }

    async fn finish_sign_up(
        &self,
        identity: Identity,
        name: &str,
    ) -> Result<AuthSession, AuthError> {
        let identity = self.identity.update_profile(&identity.uid, name).await?;

        let record = UserRecord::new_account(identity.email.clone(), name.to_owned(), Utc::now());
        self.store
            .set(collections::USERS, identity.uid.as_str(), to_fields(&record)?)
            .await?;

        self.open_session(identity).await
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for a wrong password or an
    /// unknown email, `AuthError::InvalidEmail` for a malformed email.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = Email::parse(email)?;
        let identity = self.identity.sign_in(&email, password).await?;
        let session = self.open_session(identity).await?;

        info!(uid = %session.user.uid, "Signed in");
        self.current.send_replace(Some(session.user.clone()));
        Ok(session)
    }

    /// Revoke a session token and notify listeners of the sign-out.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Backend` if the provider cannot be reached.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        self.identity.revoke_token(token).await?;
        self.current.send_replace(None);
        Ok(())
    }

    /// Resolve a bearer token to the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidSession` if the token is unknown, revoked or
    /// expired.
    pub async fn current_user(&self, token: &str) -> Result<SessionUser, AuthError> {
        self.identity
            .verify_token(token)
            .await
            .map(SessionUser::from)
    }

    /// Exchange a live token for a fresh one.
    ///
    /// The old token is revoked. Listeners receive the (unchanged) user again.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidSession` if `token` is no longer valid.
    #[instrument(skip_all)]
    pub async fn refresh_token(&self, token: &str) -> Result<AuthSession, AuthError> {
        let identity = self.identity.verify_token(token).await?;
        let session = self.open_session(identity).await?;
        self.identity.revoke_token(token).await?;

        self.current.send_replace(Some(session.user.clone()));
        Ok(session)
    }

    /// Subscribe to identity changes.
    ///
    /// Dropping the subscription unsubscribes.
    #[must_use]
    pub fn on_identity_change(&self) -> IdentitySubscription {
        IdentitySubscription {
            receiver: self.current.subscribe(),
        }
    }

    async fn open_session(&self, identity: Identity) -> Result<AuthSession, AuthError> {
        let issued = self.identity.issue_token(&identity.uid).await?;
        Ok(AuthSession {
            user: identity.into(),
            token: issued.token,
            expires_at: issued.expires_at,
        })
    }
}

/// Handle on the identity-change stream of an [`AuthGateway`].
#[derive(Debug)]
pub struct IdentitySubscription {
    receiver: watch::Receiver<Option<SessionUser>>,
}

impl IdentitySubscription {
    /// The latest identity, without waiting.
    #[must_use]
    pub fn current(&self) -> Option<SessionUser> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next login, logout or refresh.
    ///
    /// Returns `None` once the gateway has been dropped.
    pub async fn changed(&mut self) -> Option<Option<SessionUser>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::memory::{MemoryDocumentStore, MemoryIdentityProvider};

    fn gateway() -> (AuthGateway, MemoryDocumentStore) {
        let store = MemoryDocumentStore::new();
        let gateway = AuthGateway::new(
            Arc::new(MemoryIdentityProvider::new().with_fast_hashing()),
            Arc::new(store.clone()),
        );
        (gateway, store)
    }

    #[tokio::test]
    async fn test_sign_up_creates_user_record() {
        let (auth, store) = gateway();
        let session = auth.sign_up("Ann@Shop.io", "hunter22", "Ann").await.unwrap();

        assert_eq!(session.user.email.as_str(), "ann@shop.io");
        assert_eq!(session.user.display_name.as_deref(), Some("Ann"));

        let doc = store
            .get(collections::USERS, session.user.uid.as_str())
            .await
            .unwrap()
            .unwrap();
        let record: UserRecord = doc.decode().unwrap();
        assert_eq!(record.name.as_deref(), Some("Ann"));
        assert!(record.cart.is_empty());
        assert!(record.wishlist.is_empty());
        assert!(record.created_at.is_some());
    }

    #[tokio::test]
    async fn test_sign_up_rejects_duplicate_email() {
        let (auth, _) = gateway();
        auth.sign_up("ann@shop.io", "hunter22", "Ann").await.unwrap();
        let err = auth
            .sign_up("ann@shop.io", "hunter22", "Ann")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_sign_up_rejects_bad_input() {
        let (auth, store) = gateway();
        let weak = auth.sign_up("ann@shop.io", "123", "Ann").await;
        let invalid = auth.sign_up("not-an-email", "hunter22", "Ann").await;

        assert!(matches!(weak, Err(AuthError::WeakPassword(_))));
        assert!(matches!(invalid, Err(AuthError::InvalidEmail(_))));
        assert!(store.is_empty(collections::USERS));
    }

    #[tokio::test]
    async fn test_sign_up_gap_leaves_identity_without_record() {
        let (auth, store) = gateway();
        store.set_offline(true);
        let err = auth
            .sign_up("ann@shop.io", "hunter22", "Ann")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Backend(_)));

        store.set_offline(false);
        let session = auth.sign_in("ann@shop.io", "hunter22").await.unwrap();
        assert!(
            store
                .get(collections::USERS, session.user.uid.as_str())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_sign_in_with_wrong_password() {
        let (auth, _) = gateway();
        auth.sign_up("ann@shop.io", "hunter22", "Ann").await.unwrap();
        let err = auth.sign_in("ann@shop.io", "hunter23").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_sign_out_revokes_token() {
        let (auth, _) = gateway();
        let session = auth.sign_up("ann@shop.io", "hunter22", "Ann").await.unwrap();
        assert_eq!(
            auth.current_user(&session.token).await.unwrap(),
            session.user
        );

        auth.sign_out(&session.token).await.unwrap();
        assert!(matches!(
            auth.current_user(&session.token).await,
            Err(AuthError::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn test_refresh_rotates_token() {
        let (auth, _) = gateway();
        let session = auth.sign_up("ann@shop.io", "hunter22", "Ann").await.unwrap();
        let refreshed = auth.refresh_token(&session.token).await.unwrap();

        assert_ne!(refreshed.token, session.token);
        assert_eq!(refreshed.user, session.user);
        assert!(auth.current_user(&session.token).await.is_err());
        assert!(auth.current_user(&refreshed.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_identity_changes_are_broadcast() {
        let (auth, _) = gateway();
        let mut sub = auth.on_identity_change();
        assert_eq!(sub.current(), None);

        let session = auth.sign_up("ann@shop.io", "hunter22", "Ann").await.unwrap();
        assert_eq!(sub.changed().await, Some(Some(session.user.clone())));

        let refreshed = auth.refresh_token(&session.token).await.unwrap();
        assert_eq!(sub.changed().await, Some(Some(refreshed.user)));

        auth.sign_out(&refreshed.token).await.unwrap();
        assert_eq!(sub.changed().await, Some(None));
    }

    #[tokio::test]
    async fn test_subscription_ends_with_gateway() {
        let (auth, _) = gateway();
        let mut sub = auth.on_identity_change();
        drop(auth);
        assert_eq!(sub.changed().await, None);
    }

    #[tokio::test]
    async fn test_dropped_subscription_does_not_block_sign_in() {
        let (auth, _) = gateway();
        drop(auth.on_identity_change());
        auth.sign_up("ann@shop.io", "hunter22", "Ann").await.unwrap();
        auth.sign_in("ann@shop.io", "hunter22").await.unwrap();
    }
}
