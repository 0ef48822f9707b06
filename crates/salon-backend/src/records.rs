//! Record types stored by the document collaborator.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can cross the
//! collaborator boundary unchanged.  The `New*` forms are the write shapes:
//! they omit ids and timestamps, which the collaborator assigns at write
//! time (the server-timestamp sentinel of the document API).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use salon_shared::{MessageId, RoomId, UserId};

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// The bootstrap record written once per identity, keyed by the identity id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: UserId,
    /// Display label: email local-part, or a derived guest label.
    pub label: String,
    pub created_at: DateTime<Utc>,
}

/// Write form for [`Profile`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewProfile {
    pub id: UserId,
    pub label: String,
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// A named, participant-scoped conversation container.
///
/// The summary fields (`last_message`, `last_message_at`) are advisory UI
/// data, updated last-write-wins when a message is sent.  Rooms are never
/// deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    /// Identity ids allowed to see this room.
    pub participants: Vec<UserId>,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// Exact membership test used for room-list visibility.
    pub fn has_participant(&self, user: &UserId) -> bool {
        self.participants.iter().any(|p| p == user)
    }
}

/// Write form for [`Room`].  The creator is the sole initial participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewRoom {
    pub name: String,
    pub participants: Vec<UserId>,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// An immutable text record scoped to one room and one sender.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    /// The sender's display label, snapshotted at send time.
    pub sender_label: String,
    pub text: String,
    /// Assigned by the collaborator at write time.
    pub created_at: DateTime<Utc>,
}

/// Write form for [`Message`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewMessage {
    pub sender_id: UserId,
    pub sender_label: String,
    pub text: String,
}
