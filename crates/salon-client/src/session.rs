//! Session lifecycle: the authenticated-identity state machine.
//!
//! [`SessionManager`] registers one identity observer with the auth
//! collaborator, forwards every event over an unbounded channel into a
//! single spawned task, and fans the resulting [`SessionSnapshot`] out over
//! a watch channel.  All identity side effects live in that task: the
//! one-shot profile bootstrap, the token sign-in attempt, and the anonymous
//! fallback.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use salon_backend::{AuthService, AuthUser, DataService, NewProfile, Observer, Subscription};
use salon_shared::constants::GUEST_LABEL_PREFIX;
use salon_shared::{BackendError, UserId};

use crate::config::ClientConfig;

/// The signed-in identity as the client sees it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Identity {
    pub id: UserId,
    /// Email local-part, or a derived guest label for anonymous identities.
    pub label: String,
}

/// Full-replacement snapshot of the session state.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub identity: Option<Identity>,
    /// True until the first identity event has been processed.
    pub loading: bool,
}

/// Derive the display label the profile bootstrap writes.
fn derive_label(user: &AuthUser) -> String {
    match &user.email {
        Some(email) => email
            .split('@')
            .next()
            .filter(|local| !local.is_empty())
            .unwrap_or(email.as_str())
            .to_string(),
        None => format!("{GUEST_LABEL_PREFIX}{}", user.id.short()),
    }
}

/// Forwards identity events from the collaborator callback into the
/// session task's channel.
struct IdentityForwarder {
    tx: mpsc::UnboundedSender<Option<AuthUser>>,
}

impl Observer<Option<AuthUser>> for IdentityForwarder {
    fn on_update(&self, snapshot: Option<AuthUser>) {
        let _ = self.tx.send(snapshot);
    }

    fn on_error(&self, error: BackendError) {
        tracing::error!(%error, "identity subscription error");
    }
}

/// Owns the identity lifecycle and the collaborator handles.
pub struct SessionManager {
    auth: Arc<dyn AuthService>,
    data: Arc<dyn DataService>,
    namespace: String,
    sign_in_token: Option<String>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    subscription: Mutex<Option<Subscription>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    pub fn new(
        auth: Arc<dyn AuthService>,
        data: Arc<dyn DataService>,
        config: &ClientConfig,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(SessionSnapshot {
            identity: None,
            loading: true,
        });
        Self {
            auth,
            data,
            namespace: config.namespace.clone(),
            sign_in_token: config.sign_in_token.clone(),
            snapshot_tx,
            subscription: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    /// Register for identity events and spawn the session task.
    ///
    /// Idempotent: a second call is a no-op.
    pub fn start(&self) {
        let mut subscription = self
            .subscription
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if subscription.is_some() {
            return;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *subscription = Some(
            self.auth
                .subscribe_identity(Arc::new(IdentityForwarder { tx })),
        );

        let worker = SessionWorker {
            auth: self.auth.clone(),
            data: self.data.clone(),
            namespace: self.namespace.clone(),
            sign_in_token: self.sign_in_token.clone(),
            snapshot_tx: self.snapshot_tx.clone(),
        };
        let handle = tokio::spawn(worker.run(rx));
        *self.task.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);

        info!("session manager started");
    }

    /// Release the identity subscription and stop the session task.
    pub fn stop(&self) {
        self.subscription
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = self.task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }

    /// Watch receiver for session snapshots.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.snapshot_tx.borrow().identity.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.snapshot_tx.borrow().loading
    }

    // Pass-through handles for child components.

    pub fn auth(&self) -> Arc<dyn AuthService> {
        self.auth.clone()
    }

    pub fn data(&self) -> Arc<dyn DataService> {
        self.data.clone()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The single logical task processing identity events in order.
struct SessionWorker {
    auth: Arc<dyn AuthService>,
    data: Arc<dyn DataService>,
    namespace: String,
    sign_in_token: Option<String>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl SessionWorker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<Option<AuthUser>>) {
        while let Some(event) = rx.recv().await {
            self.handle_event(event).await;
        }
        debug!("session task finished");
    }

    async fn handle_event(&self, event: Option<AuthUser>) {
        match event {
            Some(user) => {
                let identity = Identity {
                    id: user.id.clone(),
                    label: derive_label(&user),
                };
                debug!(user = %identity.id, anonymous = user.is_anonymous, "identity present");
                self.bootstrap_profile(&identity).await;
                self.snapshot_tx.send_replace(SessionSnapshot {
                    identity: Some(identity),
                    loading: false,
                });
            }
            None => {
                debug!("identity absent");
                self.snapshot_tx.send_replace(SessionSnapshot {
                    identity: None,
                    loading: false,
                });
                self.establish_identity().await;
            }
        }
    }

    /// Read-then-write profile bootstrap; at most one write per new
    /// identity.  Not transactional: concurrent first sign-ins could race,
    /// accepted for single-client-per-identity use.
    async fn bootstrap_profile(&self, identity: &Identity) {
        match self.data.profile(&self.namespace, &identity.id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                let profile = NewProfile {
                    id: identity.id.clone(),
                    label: identity.label.clone(),
                };
                match self.data.create_profile(&self.namespace, profile).await {
                    Ok(_) => info!(user = %identity.id, "profile bootstrapped"),
                    Err(error) => {
                        warn!(%error, user = %identity.id, "profile bootstrap write failed");
                    }
                }
            }
            Err(error) => warn!(%error, user = %identity.id, "profile lookup failed"),
        }
    }

    /// Nobody is signed in: try the pre-provisioned token, then fall back
    /// to anonymous sign-in.  Failure leaves no identity (the user stays on
    /// the login screen).
    async fn establish_identity(&self) {
        if let Some(token) = &self.sign_in_token {
            match self.auth.sign_in_with_token(token).await {
                Ok(_) => return,
                Err(error) => {
                    warn!(%error, "token sign-in failed, falling back to anonymous");
                }
            }
        }
        if let Err(error) = self.auth.sign_in_anonymously().await {
            warn!(%error, "anonymous sign-in failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salon_backend::MemoryBackend;
    use std::time::{Duration, Instant};

    async fn wait_until(mut f: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if f() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        f()
    }

    fn manager(backend: &MemoryBackend, config: &ClientConfig) -> SessionManager {
        SessionManager::new(
            Arc::new(backend.clone()),
            Arc::new(backend.clone()),
            config,
        )
    }

    #[test]
    fn label_from_email_local_part() {
        let user = AuthUser {
            id: UserId::from("abc"),
            email: Some("ada@example.com".into()),
            is_anonymous: false,
        };
        assert_eq!(derive_label(&user), "ada");
    }

    #[test]
    fn label_for_anonymous_uses_short_id() {
        let user = AuthUser {
            id: UserId::from("0123456789abcdef"),
            email: None,
            is_anonymous: true,
        };
        assert_eq!(derive_label(&user), "guest-01234567");
    }

    #[test]
    fn label_for_mailbox_without_at_sign_keeps_whole_string() {
        let user = AuthUser {
            id: UserId::from("abc"),
            email: Some("not-an-email".into()),
            is_anonymous: false,
        };
        assert_eq!(derive_label(&user), "not-an-email");
    }

    #[tokio::test]
    async fn anonymous_sign_in_and_bootstrap() {
        let backend = MemoryBackend::new();
        let config = ClientConfig::default();
        let session = manager(&backend, &config);
        session.start();

        assert!(wait_until(|| session.identity().is_some()).await);
        let identity = session.identity().unwrap();
        assert!(identity.label.starts_with(GUEST_LABEL_PREFIX));
        assert!(!session.is_loading());

        let profile = backend
            .profile(&config.namespace, &identity.id)
            .await
            .unwrap()
            .expect("bootstrap should have written a profile");
        assert_eq!(profile.label, identity.label);
    }

    #[tokio::test]
    async fn bootstrap_does_not_overwrite_existing_profile() {
        let backend = MemoryBackend::new();
        let user = backend.provision_token("tok-1");
        let config = ClientConfig {
            sign_in_token: Some("tok-1".into()),
            ..ClientConfig::default()
        };

        // Profile already provisioned with a custom label.
        backend
            .create_profile(
                &config.namespace,
                NewProfile {
                    id: user.id.clone(),
                    label: "custom".into(),
                },
            )
            .await
            .unwrap();

        let session = manager(&backend, &config);
        session.start();
        assert!(wait_until(|| session.identity().is_some()).await);
        assert_eq!(session.identity().unwrap().id, user.id);

        // Re-trigger the presence event for the same identity.
        backend.sign_in_with_token("tok-1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let profile = backend
            .profile(&config.namespace, &user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.label, "custom");
    }

    #[tokio::test]
    async fn bad_token_falls_back_to_anonymous() {
        let backend = MemoryBackend::new();
        let config = ClientConfig {
            sign_in_token: Some("never-provisioned".into()),
            ..ClientConfig::default()
        };
        let session = manager(&backend, &config);
        session.start();

        assert!(wait_until(|| session.identity().is_some()).await);
        assert!(session.identity().unwrap().label.starts_with(GUEST_LABEL_PREFIX));
    }

    #[tokio::test]
    async fn anonymous_failure_leaves_no_identity() {
        let backend = MemoryBackend::new();
        backend.set_anonymous_sign_in_enabled(false);
        let session = manager(&backend, &ClientConfig::default());
        session.start();

        assert!(wait_until(|| !session.is_loading()).await);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(session.identity().is_none());
    }

    #[tokio::test]
    async fn subscription_error_keeps_the_identity() {
        let backend = MemoryBackend::new();
        let session = manager(&backend, &ClientConfig::default());
        session.start();
        assert!(wait_until(|| session.identity().is_some()).await);
        let before = session.identity().unwrap();

        backend.fail_subscriptions("backend offline");
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(session.identity(), Some(before));
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn credentialed_sign_in_labels_by_local_part() {
        let backend = MemoryBackend::new();
        backend.set_anonymous_sign_in_enabled(false);
        let config = ClientConfig::default();
        let session = manager(&backend, &config);
        session.start();

        assert!(wait_until(|| !session.is_loading()).await);
        backend.register("grace@example.com", "pw").await.unwrap();

        assert!(wait_until(|| session.identity().is_some()).await);
        let identity = session.identity().unwrap();
        assert_eq!(identity.label, "grace");

        let profile = backend
            .profile(&config.namespace, &identity.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.label, "grace");
    }
}
