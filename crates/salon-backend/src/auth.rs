//! The auth collaborator's surface.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use salon_shared::{AuthError, UserId};

use crate::observer::{Observer, Subscription};

/// An identity as reported by the auth collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    /// Opaque stable identifier, unique per identity.
    pub id: UserId,
    /// Email address, absent for anonymous identities.
    pub email: Option<String>,
    /// Whether this identity was created by anonymous sign-in.
    pub is_anonymous: bool,
}

/// Operations consumed from the external auth provider.
///
/// All mutations resolve asynchronously and report collaborator-defined
/// [`AuthError`] codes.  Identity changes are observed through
/// [`subscribe_identity`](AuthService::subscribe_identity), which delivers
/// the current identity immediately on registration and again after every
/// sign-in / sign-out.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create a new credentialed identity and sign it in.
    async fn register(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;

    /// Sign in an existing credentialed identity.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;

    /// Create (or resume) an anonymous identity.
    async fn sign_in_anonymously(&self) -> Result<AuthUser, AuthError>;

    /// Sign in with a pre-provisioned token.
    async fn sign_in_with_token(&self, token: &str) -> Result<AuthUser, AuthError>;

    /// End the current session.  A no-op when nobody is signed in.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// The identity currently signed in, if any.
    fn current_user(&self) -> Option<AuthUser>;

    /// Register for identity-change events.
    fn subscribe_identity(&self, observer: Arc<dyn Observer<Option<AuthUser>>>) -> Subscription;
}
