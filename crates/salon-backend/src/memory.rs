//! In-process reference implementation of both collaborators.
//!
//! [`MemoryBackend`] keeps everything in one mutex-guarded state table and
//! pushes full snapshots to registered observers after every write.  It is
//! the backend every test runs against and doubles as a local-development
//! stand-in when no hosted provider is configured.
//!
//! Observers are always notified *after* the state lock is dropped, so an
//! observer may call back into the backend without deadlocking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use salon_shared::{AuthError, BackendError, MessageId, RoomId, StoreError, UserId};

use crate::auth::{AuthService, AuthUser};
use crate::observer::{Observer, Subscription};
use crate::records::{Message, NewMessage, NewProfile, NewRoom, Profile, Room};
use crate::store::DataService;

type IdentityObserver = Arc<dyn Observer<Option<AuthUser>>>;
type RoomsObserver = Arc<dyn Observer<Vec<Room>>>;
type MessagesObserver = Arc<dyn Observer<Vec<Message>>>;

struct Credential {
    password: String,
    user: AuthUser,
}

#[derive(Default)]
struct Namespace {
    profiles: HashMap<UserId, Profile>,
    rooms: HashMap<RoomId, Room>,
    messages: HashMap<RoomId, Vec<Message>>,
    room_subs: HashMap<u64, RoomsObserver>,
    message_subs: HashMap<RoomId, HashMap<u64, MessagesObserver>>,
}

struct State {
    next_sub: u64,
    password_sign_in_enabled: bool,
    anonymous_sign_in_enabled: bool,
    credentials: HashMap<String, Credential>,
    tokens: HashMap<String, AuthUser>,
    current: Option<AuthUser>,
    identity_subs: HashMap<u64, IdentityObserver>,
    namespaces: HashMap<String, Namespace>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            next_sub: 0,
            password_sign_in_enabled: true,
            anonymous_sign_in_enabled: true,
            credentials: HashMap::new(),
            tokens: HashMap::new(),
            current: None,
            identity_subs: HashMap::new(),
            namespaces: HashMap::new(),
        }
    }
}

/// In-memory auth + document-store collaborator.
///
/// Clone-cheap: clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means an observer panicked; the state itself
        // is still coherent (every mutation completes before notification).
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ------------------------------------------------------------------
    // Fake-control surface (tests, local development)
    // ------------------------------------------------------------------

    /// Pre-provision a sign-in token; returns the identity it resolves to.
    pub fn provision_token(&self, token: &str) -> AuthUser {
        let user = AuthUser {
            id: UserId::generate(),
            email: None,
            is_anonymous: false,
        };
        self.lock().tokens.insert(token.to_string(), user.clone());
        user
    }

    /// Toggle the provider-side "password sign-in disabled" switch.
    pub fn set_password_sign_in_enabled(&self, enabled: bool) {
        self.lock().password_sign_in_enabled = enabled;
    }

    /// Toggle whether anonymous sign-in succeeds.
    pub fn set_anonymous_sign_in_enabled(&self, enabled: bool) {
        self.lock().anonymous_sign_in_enabled = enabled;
    }

    /// Deliver a subscription failure to every registered observer.
    ///
    /// Stored data is untouched; observers are expected to log and keep
    /// their last snapshot.
    pub fn fail_subscriptions(&self, reason: &str) {
        let error = BackendError::Store(StoreError::Unavailable(reason.to_string()));
        let (identity, rooms, messages) = {
            let state = self.lock();
            let identity: Vec<IdentityObserver> = state.identity_subs.values().cloned().collect();
            let mut rooms: Vec<RoomsObserver> = Vec::new();
            let mut messages: Vec<MessagesObserver> = Vec::new();
            for ns in state.namespaces.values() {
                rooms.extend(ns.room_subs.values().cloned());
                for subs in ns.message_subs.values() {
                    messages.extend(subs.values().cloned());
                }
            }
            (identity, rooms, messages)
        };
        for obs in identity {
            obs.on_error(error.clone());
        }
        for obs in rooms {
            obs.on_error(error.clone());
        }
        for obs in messages {
            obs.on_error(error.clone());
        }
    }

    /// Number of live subscriptions on the namespace's room collection.
    pub fn room_subscriber_count(&self, ns: &str) -> usize {
        self.lock()
            .namespaces
            .get(ns)
            .map(|n| n.room_subs.len())
            .unwrap_or(0)
    }

    /// Number of live subscriptions on one room's message sub-collection.
    pub fn message_subscriber_count(&self, ns: &str, room: &RoomId) -> usize {
        self.lock()
            .namespaces
            .get(ns)
            .and_then(|n| n.message_subs.get(room))
            .map(|subs| subs.len())
            .unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // Snapshots & notification
    // ------------------------------------------------------------------

    fn rooms_snapshot(ns: &Namespace) -> Vec<Room> {
        let mut rooms: Vec<Room> = ns.rooms.values().cloned().collect();
        // Newest first; id breaks timestamp ties for a stable order.
        rooms.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rooms
    }

    fn messages_snapshot(ns: &Namespace, room: &RoomId) -> Vec<Message> {
        let mut messages = ns.messages.get(room).cloned().unwrap_or_default();
        // Creation-timestamp ascending, the transcript's display order.
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        messages
    }

    /// Replace the current identity and fan the change out.
    fn swap_current(&self, user: Option<AuthUser>) {
        match &user {
            Some(u) => info!(user = %u.id, anonymous = u.is_anonymous, "identity signed in"),
            None => info!("identity signed out"),
        }
        let (snapshot, observers) = {
            let mut state = self.lock();
            state.current = user;
            let observers: Vec<IdentityObserver> =
                state.identity_subs.values().cloned().collect();
            (state.current.clone(), observers)
        };
        for obs in observers {
            obs.on_update(snapshot.clone());
        }
    }

    fn notify_rooms(&self, ns_name: &str) {
        let (snapshot, observers) = {
            let state = self.lock();
            match state.namespaces.get(ns_name) {
                Some(ns) => (
                    Self::rooms_snapshot(ns),
                    ns.room_subs.values().cloned().collect::<Vec<_>>(),
                ),
                None => return,
            }
        };
        debug!(ns = ns_name, rooms = snapshot.len(), "notifying room observers");
        for obs in observers {
            obs.on_update(snapshot.clone());
        }
    }

    fn notify_messages(&self, ns_name: &str, room: &RoomId) {
        let (snapshot, observers) = {
            let state = self.lock();
            match state.namespaces.get(ns_name) {
                Some(ns) => (
                    Self::messages_snapshot(ns, room),
                    ns.message_subs
                        .get(room)
                        .map(|subs| subs.values().cloned().collect::<Vec<_>>())
                        .unwrap_or_default(),
                ),
                None => return,
            }
        };
        for obs in observers {
            obs.on_update(snapshot.clone());
        }
    }
}

#[async_trait]
impl AuthService for MemoryBackend {
    async fn register(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let user = {
            let mut state = self.lock();
            if !state.password_sign_in_enabled {
                return Err(AuthError::PasswordSignInDisabled);
            }
            if state.credentials.contains_key(email) {
                return Err(AuthError::EmailAlreadyRegistered);
            }
            let user = AuthUser {
                id: UserId::generate(),
                email: Some(email.to_string()),
                is_anonymous: false,
            };
            state.credentials.insert(
                email.to_string(),
                Credential {
                    password: password.to_string(),
                    user: user.clone(),
                },
            );
            user
        };
        self.swap_current(Some(user.clone()));
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let user = {
            let state = self.lock();
            if !state.password_sign_in_enabled {
                return Err(AuthError::PasswordSignInDisabled);
            }
            match state.credentials.get(email) {
                Some(cred) if cred.password == password => cred.user.clone(),
                _ => return Err(AuthError::InvalidCredentials),
            }
        };
        self.swap_current(Some(user.clone()));
        Ok(user)
    }

    async fn sign_in_anonymously(&self) -> Result<AuthUser, AuthError> {
        {
            let state = self.lock();
            if !state.anonymous_sign_in_enabled {
                return Err(AuthError::Unavailable("anonymous sign-in disabled".into()));
            }
        }
        let user = AuthUser {
            id: UserId::generate(),
            email: None,
            is_anonymous: true,
        };
        self.swap_current(Some(user.clone()));
        Ok(user)
    }

    async fn sign_in_with_token(&self, token: &str) -> Result<AuthUser, AuthError> {
        let user = {
            let state = self.lock();
            match state.tokens.get(token) {
                Some(user) => user.clone(),
                None => return Err(AuthError::InvalidToken),
            }
        };
        self.swap_current(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.lock().current.is_none() {
            return Ok(());
        }
        self.swap_current(None);
        Ok(())
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.lock().current.clone()
    }

    fn subscribe_identity(&self, observer: Arc<dyn Observer<Option<AuthUser>>>) -> Subscription {
        let (id, snapshot) = {
            let mut state = self.lock();
            let id = state.next_sub;
            state.next_sub += 1;
            state.identity_subs.insert(id, observer.clone());
            (id, state.current.clone())
        };
        observer.on_update(snapshot);

        let state = self.state.clone();
        Subscription::new(move || {
            let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
            guard.identity_subs.remove(&id);
        })
    }
}

#[async_trait]
impl DataService for MemoryBackend {
    async fn profile(&self, ns: &str, user: &UserId) -> Result<Option<Profile>, StoreError> {
        Ok(self
            .lock()
            .namespaces
            .get(ns)
            .and_then(|n| n.profiles.get(user))
            .cloned())
    }

    async fn create_profile(&self, ns: &str, profile: NewProfile) -> Result<Profile, StoreError> {
        let stored = Profile {
            id: profile.id.clone(),
            label: profile.label,
            created_at: Utc::now(),
        };
        self.lock()
            .namespaces
            .entry(ns.to_string())
            .or_default()
            .profiles
            .insert(profile.id, stored.clone());
        Ok(stored)
    }

    fn subscribe_rooms(&self, ns: &str, observer: Arc<dyn Observer<Vec<Room>>>) -> Subscription {
        let ns_name = ns.to_string();
        let (id, snapshot) = {
            let mut state = self.lock();
            let id = state.next_sub;
            state.next_sub += 1;
            let namespace = state.namespaces.entry(ns_name.clone()).or_default();
            namespace.room_subs.insert(id, observer.clone());
            (id, Self::rooms_snapshot(namespace))
        };
        observer.on_update(snapshot);

        let state = self.state.clone();
        Subscription::new(move || {
            let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(namespace) = guard.namespaces.get_mut(&ns_name) {
                namespace.room_subs.remove(&id);
            }
        })
    }

    async fn create_room(&self, ns: &str, room: NewRoom) -> Result<Room, StoreError> {
        let stored = Room {
            id: RoomId::new(),
            name: room.name,
            participants: room.participants,
            last_message: None,
            last_message_at: None,
            created_at: Utc::now(),
        };
        self.lock()
            .namespaces
            .entry(ns.to_string())
            .or_default()
            .rooms
            .insert(stored.id, stored.clone());
        self.notify_rooms(ns);
        Ok(stored)
    }

    async fn update_room_summary(
        &self,
        ns: &str,
        room: &RoomId,
        last_message: String,
        last_message_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        {
            let mut state = self.lock();
            let stored = state
                .namespaces
                .get_mut(ns)
                .and_then(|n| n.rooms.get_mut(room))
                .ok_or(StoreError::NotFound)?;
            stored.last_message = Some(last_message);
            stored.last_message_at = Some(last_message_at);
        }
        self.notify_rooms(ns);
        Ok(())
    }

    fn subscribe_messages(
        &self,
        ns: &str,
        room: &RoomId,
        observer: Arc<dyn Observer<Vec<Message>>>,
    ) -> Subscription {
        let ns_name = ns.to_string();
        let room = *room;
        let (id, snapshot) = {
            let mut state = self.lock();
            let id = state.next_sub;
            state.next_sub += 1;
            let namespace = state.namespaces.entry(ns_name.clone()).or_default();
            namespace
                .message_subs
                .entry(room)
                .or_default()
                .insert(id, observer.clone());
            (id, Self::messages_snapshot(namespace, &room))
        };
        observer.on_update(snapshot);

        let state = self.state.clone();
        Subscription::new(move || {
            let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(namespace) = guard.namespaces.get_mut(&ns_name) {
                if let Some(subs) = namespace.message_subs.get_mut(&room) {
                    subs.remove(&id);
                }
            }
        })
    }

    async fn create_message(
        &self,
        ns: &str,
        room: &RoomId,
        message: NewMessage,
    ) -> Result<Message, StoreError> {
        let stored = Message {
            id: MessageId::new(),
            room_id: *room,
            sender_id: message.sender_id,
            sender_label: message.sender_label,
            text: message.text,
            created_at: Utc::now(),
        };
        {
            let mut state = self.lock();
            let namespace = state
                .namespaces
                .get_mut(ns)
                .filter(|n| n.rooms.contains_key(room))
                .ok_or(StoreError::NotFound)?;
            namespace
                .messages
                .entry(*room)
                .or_default()
                .push(stored.clone());
        }
        self.notify_messages(ns, room);
        Ok(stored)
    }
}
