//! The document-store collaborator's surface.
//!
//! Documents live under a three-level path convention: an application
//! namespace scopes everything; profiles hang directly off the namespace,
//! rooms form a shared collection, and each room owns a message
//! sub-collection.  Each operation therefore takes the namespace (and,
//! for messages, the room id) explicitly.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use salon_shared::{RoomId, StoreError, UserId};

use crate::observer::{Observer, Subscription};
use crate::records::{Message, NewMessage, NewProfile, NewRoom, Profile, Room};

/// Operations consumed from the external document database.
///
/// Subscriptions deliver the current snapshot immediately on registration
/// and a fresh full snapshot after every relevant write.  Creates return
/// the stored record with its collaborator-assigned id and timestamp.
#[async_trait]
pub trait DataService: Send + Sync {
    /// Read a single profile document, if present.
    async fn profile(&self, ns: &str, user: &UserId) -> Result<Option<Profile>, StoreError>;

    /// Create a profile document keyed by the identity id.
    async fn create_profile(&self, ns: &str, profile: NewProfile) -> Result<Profile, StoreError>;

    /// Observe the namespace's full room collection.
    fn subscribe_rooms(&self, ns: &str, observer: Arc<dyn Observer<Vec<Room>>>) -> Subscription;

    /// Create a room with a collaborator-assigned id and creation timestamp.
    async fn create_room(&self, ns: &str, room: NewRoom) -> Result<Room, StoreError>;

    /// Partial update of a room's advisory summary fields, last-write-wins.
    async fn update_room_summary(
        &self,
        ns: &str,
        room: &RoomId,
        last_message: String,
        last_message_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Observe one room's message sub-collection, ordered by creation
    /// timestamp ascending (collaborator-side sort).
    fn subscribe_messages(
        &self,
        ns: &str,
        room: &RoomId,
        observer: Arc<dyn Observer<Vec<Message>>>,
    ) -> Subscription;

    /// Append a message with a collaborator-assigned id and timestamp.
    async fn create_message(
        &self,
        ns: &str,
        room: &RoomId,
        message: NewMessage,
    ) -> Result<Message, StoreError>;
}
