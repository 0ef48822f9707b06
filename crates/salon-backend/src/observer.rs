//! The reactive contract between the collaborators and the client.
//!
//! Every live read is an [`Observer`] registered against a collection; the
//! collaborator pushes full-snapshot updates (no incremental merge) until
//! the paired [`Subscription`] is released.

use salon_shared::BackendError;

/// Receives push updates for one subscribed collection.
///
/// `on_update` replaces the whole local snapshot.  `on_error` reports a
/// subscription failure; the collaborator keeps the subscription alive and
/// the observer's last snapshot stays whatever it was.
pub trait Observer<T>: Send + Sync {
    fn on_update(&self, snapshot: T);
    fn on_error(&self, error: BackendError);
}

/// Handle to one live subscription.
///
/// Releasing detaches the observer; no further updates are delivered.
/// Dropping the handle releases it too, so a subscription can never outlive
/// the component that opened it.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Build a subscription whose release runs the given closure once.
    pub fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Explicitly release the subscription.  Idempotent.
    pub fn release(&mut self) {
        if let Some(f) = self.release.take() {
            f();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("released", &self.release.is_none())
            .finish()
    }
}
