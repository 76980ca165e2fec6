//! Session-related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use digital_mart_core::{Email, UserId};

use crate::backend::Identity;

/// The signed-in user as the view layer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    /// Identity id (also the key of the user record).
    pub uid: UserId,
    /// Email the user signs in with.
    pub email: Email,
    /// Display name, if one was set at sign-up.
    pub display_name: Option<String>,
}

impl SessionUser {
    /// Name to greet the user with: display name, else the email.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.email.as_str())
    }
}

impl From<Identity> for SessionUser {
    fn from(identity: Identity) -> Self {
        Self {
            uid: identity.uid,
            email: identity.email,
            display_name: identity.display_name,
        }
    }
}

/// Result of a successful sign-up or sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    /// The signed-in user.
    pub user: SessionUser,
    /// Bearer token for subsequent requests.
    pub token: String,
    /// When the token expires and must be refreshed.
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_label_falls_back_to_email() {
        let mut user = SessionUser {
            uid: UserId::new("u1"),
            email: Email::parse("ann@shop.io").unwrap(),
            display_name: Some("Ann".to_string()),
        };
        assert_eq!(user.label(), "Ann");

        user.display_name = Some("  ".to_string());
        assert_eq!(user.label(), "ann@shop.io");

        user.display_name = None;
        assert_eq!(user.label(), "ann@shop.io");
    }
}
