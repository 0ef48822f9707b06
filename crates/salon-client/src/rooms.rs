//! Room directory: the live, participant-filtered room list.

use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};

use salon_backend::{DataService, NewRoom, Observer, Room, Subscription};
use salon_shared::{BackendError, RoomId, UserId};

/// Applies each room-collection snapshot: keeps only rooms the current
/// identity participates in.  On error the last filtered snapshot stands.
struct RoomsWatcher {
    user: UserId,
    visible: Arc<Mutex<Vec<Room>>>,
}

impl Observer<Vec<Room>> for RoomsWatcher {
    fn on_update(&self, snapshot: Vec<Room>) {
        let filtered: Vec<Room> = snapshot
            .into_iter()
            .filter(|room| room.has_participant(&self.user))
            .collect();
        *self.visible.lock().unwrap_or_else(|e| e.into_inner()) = filtered;
    }

    fn on_error(&self, error: BackendError) {
        error!(%error, "room subscription error");
    }
}

/// Live view over the rooms visible to one identity.
///
/// Holds the room-collection subscription for as long as it lives; dropping
/// the directory releases it.
pub struct RoomDirectory {
    data: Arc<dyn DataService>,
    namespace: String,
    user: UserId,
    visible: Arc<Mutex<Vec<Room>>>,
    _subscription: Subscription,
}

impl RoomDirectory {
    /// Subscribe to the namespace's room collection on behalf of `user`.
    pub fn open(data: Arc<dyn DataService>, namespace: &str, user: UserId) -> Self {
        let visible = Arc::new(Mutex::new(Vec::new()));
        let watcher = Arc::new(RoomsWatcher {
            user: user.clone(),
            visible: visible.clone(),
        });
        let subscription = data.subscribe_rooms(namespace, watcher);
        Self {
            data,
            namespace: namespace.to_string(),
            user,
            visible,
            _subscription: subscription,
        }
    }

    /// The identity this directory filters for.
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// Current visible snapshot, in collaborator order.
    pub fn rooms(&self) -> Vec<Room> {
        self.visible.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Create a room with the current identity as sole participant.
    ///
    /// A blank name is a no-op; a failed write is logged and has no local
    /// effect.  The room appears in [`rooms`](Self::rooms) once the
    /// subscription re-fires.
    pub async fn create_room(&self, name: &str) -> Option<RoomId> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let room = NewRoom {
            name: name.to_string(),
            participants: vec![self.user.clone()],
        };
        match self.data.create_room(&self.namespace, room).await {
            Ok(created) => {
                info!(room = %created.id, name = %created.name, "room created");
                Some(created.id)
            }
            Err(error) => {
                warn!(%error, name, "create room failed");
                None
            }
        }
    }
}
