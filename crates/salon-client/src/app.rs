//! Application-scoped context: owns the collaborator handles and drives the
//! component lifecycle off session snapshots.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use salon_backend::{AuthService, DataService, Message, Room};
use salon_shared::RoomId;

use crate::config::ClientConfig;
use crate::rooms::RoomDirectory;
use crate::router::{View, ViewRouter};
use crate::session::{Identity, SessionManager, SessionSnapshot};
use crate::transcript::RoomTranscript;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

struct AppInner {
    config: ClientConfig,
    data: Arc<dyn DataService>,
    session: SessionManager,
    router: Mutex<ViewRouter>,
    directory: Mutex<Option<Arc<RoomDirectory>>>,
    transcript: Mutex<Option<Arc<RoomTranscript>>>,
}

impl AppInner {
    /// React to one session snapshot: manage the directory/transcript
    /// lifecycle, then let the router transition.
    fn apply_session(&self, snapshot: &SessionSnapshot) {
        if !snapshot.loading {
            match &snapshot.identity {
                Some(identity) => {
                    let stale = {
                        let mut directory = lock(&self.directory);
                        let stale = directory
                            .as_ref()
                            .map(|d| d.user() != &identity.id)
                            .unwrap_or(true);
                        if stale {
                            // New identity: any transcript belongs to the old one.
                            lock(&self.transcript).take();
                            *directory = Some(Arc::new(RoomDirectory::open(
                                self.data.clone(),
                                &self.config.namespace,
                                identity.id.clone(),
                            )));
                        }
                        stale
                    };
                    if stale {
                        // Leave any transcript view the old identity had open.
                        lock(&self.router).back();
                        debug!(user = %identity.id, "room directory opened");
                    }
                }
                None => {
                    // Dropping the components releases their subscriptions.
                    lock(&self.transcript).take();
                    lock(&self.directory).take();
                }
            }
        }
        lock(&self.router).apply_session(snapshot);
    }
}

/// The client application.
///
/// Construct once with the collaborator handles, [`start`](Self::start) it,
/// and drive it with user actions; the rendered state is whatever
/// [`view`](Self::view), [`rooms`](Self::rooms) and
/// [`messages`](Self::messages) report.
pub struct App {
    inner: Arc<AppInner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl App {
    pub fn new(
        auth: Arc<dyn AuthService>,
        data: Arc<dyn DataService>,
        config: ClientConfig,
    ) -> Self {
        let session = SessionManager::new(auth, data.clone(), &config);
        Self {
            inner: Arc::new(AppInner {
                config,
                data,
                session,
                router: Mutex::new(ViewRouter::new()),
                directory: Mutex::new(None),
                transcript: Mutex::new(None),
            }),
            task: Mutex::new(None),
        }
    }

    /// Boot the session and spawn the snapshot loop.  Idempotent.
    pub fn start(&self) {
        let mut task = lock(&self.task);
        if task.is_some() {
            return;
        }

        if self.inner.config.connection.is_some() {
            debug!("backend connection blob present");
        }
        info!(namespace = %self.inner.config.namespace, "starting client");

        self.inner.session.start();

        let inner = self.inner.clone();
        let mut rx = inner.session.subscribe();
        *task = Some(tokio::spawn(async move {
            loop {
                let snapshot = rx.borrow_and_update().clone();
                inner.apply_session(&snapshot);
                if rx.changed().await.is_err() {
                    break;
                }
            }
        }));
    }

    /// Tear everything down, releasing every live subscription.
    pub fn shutdown(&self) {
        if let Some(handle) = lock(&self.task).take() {
            handle.abort();
        }
        self.inner.session.stop();
        lock(&self.inner.transcript).take();
        lock(&self.inner.directory).take();
    }

    // ------------------------------------------------------------------
    // Rendered state
    // ------------------------------------------------------------------

    pub fn view(&self) -> View {
        lock(&self.inner.router).view().clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner.session.identity()
    }

    /// Whether the room directory's subscription is live.
    pub fn has_room_directory(&self) -> bool {
        lock(&self.inner.directory).is_some()
    }

    /// Visible rooms; empty while no directory is active.
    pub fn rooms(&self) -> Vec<Room> {
        lock(&self.inner.directory)
            .as_ref()
            .map(|d| d.rooms())
            .unwrap_or_default()
    }

    /// Messages of the selected room; empty while no transcript is active.
    pub fn messages(&self) -> Vec<Message> {
        lock(&self.inner.transcript)
            .as_ref()
            .map(|t| t.messages())
            .unwrap_or_default()
    }

    pub fn transcript(&self) -> Option<Arc<RoomTranscript>> {
        lock(&self.inner.transcript).clone()
    }

    pub fn auth(&self) -> Arc<dyn AuthService> {
        self.inner.session.auth()
    }

    // ------------------------------------------------------------------
    // User actions
    // ------------------------------------------------------------------

    /// Create a room owned by the current identity.
    pub async fn create_room(&self, name: &str) -> Option<RoomId> {
        let directory = lock(&self.inner.directory).clone();
        match directory {
            Some(directory) => directory.create_room(name).await,
            None => {
                warn!("create room ignored: no identity");
                None
            }
        }
    }

    /// Select a room: route to its transcript and open the subscription.
    pub fn select_room(&self, room_id: RoomId, room_name: &str) {
        let identity = match self.inner.session.identity() {
            Some(identity) => identity,
            None => return,
        };

        let mut router = lock(&self.inner.router);
        router.open_room(room_id, room_name.to_string());
        if matches!(router.view(), View::RoomTranscript { .. }) {
            *lock(&self.inner.transcript) = Some(Arc::new(RoomTranscript::open(
                self.inner.data.clone(),
                &self.inner.config.namespace,
                room_id,
                room_name,
                identity,
            )));
        }
    }

    /// Back out of the transcript, releasing its subscription.
    pub fn leave_room(&self) {
        lock(&self.inner.router).back();
        lock(&self.inner.transcript).take();
    }

    /// Send a message in the selected room.  No-op outside a transcript.
    pub async fn send_message(&self, text: &str) {
        let transcript = lock(&self.inner.transcript).clone();
        match transcript {
            Some(transcript) => transcript.send_message(text).await,
            None => warn!("send message ignored: no room selected"),
        }
    }

    /// Ask the collaborator to end the session; the identity subscription
    /// observes the result and routes back to login.
    pub async fn sign_out(&self) {
        if let Err(error) = self.inner.session.auth().sign_out().await {
            warn!(%error, "sign-out failed");
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown();
    }
}
