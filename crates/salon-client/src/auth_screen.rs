//! Login screen state: email/password capture and submission.

use std::sync::Arc;

use salon_backend::AuthService;
use salon_shared::AuthError;

/// What submitting the form should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthIntent {
    SignIn,
    Register,
}

/// Friendlier rewrite for the provider's "password sign-in disabled" code.
const PASSWORD_DISABLED_MESSAGE: &str =
    "Email sign-in is currently unavailable. You can still continue as a guest.";

/// State behind the login screen.
///
/// Submission never navigates: on success the session manager's identity
/// subscription observes the new identity and drives the view transition.
pub struct LoginForm {
    auth: Arc<dyn AuthService>,
    pub email: String,
    pub password: String,
    intent: AuthIntent,
    error: Option<String>,
}

impl LoginForm {
    pub fn new(auth: Arc<dyn AuthService>) -> Self {
        Self {
            auth,
            email: String::new(),
            password: String::new(),
            intent: AuthIntent::SignIn,
            error: None,
        }
    }

    pub fn intent(&self) -> AuthIntent {
        self.intent
    }

    /// Flip between "login" and "register"; clears any stale error.
    pub fn toggle_intent(&mut self) {
        self.intent = match self.intent {
            AuthIntent::SignIn => AuthIntent::Register,
            AuthIntent::Register => AuthIntent::SignIn,
        };
        self.error = None;
    }

    /// The error message to display, if the last submit failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Submit the form with the current intent.
    pub async fn submit(&mut self) {
        let result = match self.intent {
            AuthIntent::SignIn => self.auth.sign_in(&self.email, &self.password).await,
            AuthIntent::Register => self.auth.register(&self.email, &self.password).await,
        };

        match result {
            Ok(user) => {
                tracing::info!(user = %user.id, "credential sign-in succeeded");
                self.error = None;
            }
            Err(AuthError::PasswordSignInDisabled) => {
                self.error = Some(PASSWORD_DISABLED_MESSAGE.to_string());
            }
            Err(error) => {
                self.error = Some(error.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salon_backend::MemoryBackend;

    fn form(backend: &MemoryBackend) -> LoginForm {
        LoginForm::new(Arc::new(backend.clone()))
    }

    #[tokio::test]
    async fn register_then_sign_in_clears_error() {
        let backend = MemoryBackend::new();
        let mut form = form(&backend);
        form.toggle_intent();
        assert_eq!(form.intent(), AuthIntent::Register);

        form.email = "ada@example.com".into();
        form.password = "pw".into();
        form.submit().await;
        assert!(form.error().is_none());
        assert!(backend.current_user().is_some());
    }

    #[tokio::test]
    async fn wrong_password_surfaces_collaborator_message() {
        let backend = MemoryBackend::new();
        backend.register("ada@example.com", "pw").await.unwrap();
        backend.sign_out().await.unwrap();

        let mut form = form(&backend);
        form.email = "ada@example.com".into();
        form.password = "nope".into();
        form.submit().await;
        assert_eq!(form.error(), Some("Invalid email or password"));
    }

    #[tokio::test]
    async fn disabled_password_sign_in_gets_friendlier_message() {
        let backend = MemoryBackend::new();
        backend.set_password_sign_in_enabled(false);

        let mut form = form(&backend);
        form.email = "ada@example.com".into();
        form.password = "pw".into();
        form.submit().await;
        assert_eq!(form.error(), Some(PASSWORD_DISABLED_MESSAGE));
    }

    #[tokio::test]
    async fn toggling_intent_clears_error() {
        let backend = MemoryBackend::new();
        let mut form = form(&backend);
        form.submit().await;
        assert!(form.error().is_some());
        form.toggle_intent();
        assert!(form.error().is_none());
    }
}
