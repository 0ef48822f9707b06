//! Room transcript: the live message list for one selected room.

use std::sync::{Arc, Mutex};

use tracing::{debug, error, warn};

use salon_backend::{DataService, Message, NewMessage, Observer, Subscription};
use salon_shared::{BackendError, MessageId, RoomId};

use crate::session::Identity;

/// Stores each message snapshot as delivered (collaborator-side sort, never
/// re-sorted here) and moves the scroll anchor to the newest entry.
struct TranscriptWatcher {
    messages: Arc<Mutex<Vec<Message>>>,
    anchor: Arc<Mutex<Option<MessageId>>>,
}

impl Observer<Vec<Message>> for TranscriptWatcher {
    fn on_update(&self, snapshot: Vec<Message>) {
        let newest = snapshot.last().map(|m| m.id);
        *self.messages.lock().unwrap_or_else(|e| e.into_inner()) = snapshot;
        *self.anchor.lock().unwrap_or_else(|e| e.into_inner()) = newest;
    }

    fn on_error(&self, error: BackendError) {
        error!(%error, "message subscription error");
    }
}

/// Live view over one room's messages, plus the send path.
///
/// Holds the message subscription for as long as it lives; dropping the
/// transcript (on back-navigation, logout, or room switch) releases it.
pub struct RoomTranscript {
    data: Arc<dyn DataService>,
    namespace: String,
    room_id: RoomId,
    room_name: String,
    sender: Identity,
    messages: Arc<Mutex<Vec<Message>>>,
    anchor: Arc<Mutex<Option<MessageId>>>,
    _subscription: Subscription,
}

impl RoomTranscript {
    /// Subscribe to `room`'s message sub-collection.
    pub fn open(
        data: Arc<dyn DataService>,
        namespace: &str,
        room_id: RoomId,
        room_name: &str,
        sender: Identity,
    ) -> Self {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let anchor = Arc::new(Mutex::new(None));
        let watcher = Arc::new(TranscriptWatcher {
            messages: messages.clone(),
            anchor: anchor.clone(),
        });
        let subscription = data.subscribe_messages(namespace, &room_id, watcher);
        debug!(room = %room_id, name = room_name, "transcript opened");
        Self {
            data,
            namespace: namespace.to_string(),
            room_id,
            room_name: room_name.to_string(),
            sender,
            messages,
            anchor,
            _subscription: subscription,
        }
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    /// Current snapshot in collaborator order (creation time ascending).
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// The entry the view should be scrolled to: the newest message.
    pub fn scroll_anchor(&self) -> Option<MessageId> {
        *self.anchor.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Send a message and refresh the room's advisory summary.
    ///
    /// Blank text is a no-op.  The two writes are independent and not
    /// atomic: a summary failure after a successful message write leaves
    /// the summary stale, which is acceptable.  Failures are logged only.
    pub async fn send_message(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let message = NewMessage {
            sender_id: self.sender.id.clone(),
            sender_label: self.sender.label.clone(),
            text: text.to_string(),
        };
        let stored = match self
            .data
            .create_message(&self.namespace, &self.room_id, message)
            .await
        {
            Ok(stored) => stored,
            Err(error) => {
                warn!(%error, room = %self.room_id, "send message failed");
                return;
            }
        };

        if let Err(error) = self
            .data
            .update_room_summary(
                &self.namespace,
                &self.room_id,
                stored.text.clone(),
                stored.created_at,
            )
            .await
        {
            warn!(%error, room = %self.room_id, "room summary update failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salon_backend::{MemoryBackend, NewRoom, Room};
    use salon_shared::UserId;
    use std::time::{Duration, Instant};

    const NS: &str = "test-ns";

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

    fn u1() -> Identity {
        Identity {
            id: UserId::from("u1"),
            label: "u1".into(),
        }
    }

    async fn room(backend: &MemoryBackend) -> Room {
        backend
            .create_room(
                NS,
                NewRoom {
                    name: "general".into(),
                    participants: vec![UserId::from("u1")],
                },
            )
            .await
            .unwrap()
    }

    fn transcript(backend: &MemoryBackend, room: &Room) -> RoomTranscript {
        RoomTranscript::open(
            Arc::new(backend.clone()),
            NS,
            room.id,
            &room.name,
            u1(),
        )
    }

    #[tokio::test]
    async fn messages_display_in_send_order() {
        let backend = MemoryBackend::new();
        let room = room(&backend).await;
        let transcript = transcript(&backend, &room);

        transcript.send_message("first").await;
        transcript.send_message("second").await;

        assert!(wait_until(|| transcript.messages().len() == 2).await);
        let texts: Vec<String> = transcript.messages().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn send_snapshots_sender_and_updates_summary() {
        let backend = MemoryBackend::new();
        let room = room(&backend).await;
        let transcript = transcript(&backend, &room);

        transcript.send_message("  hello  ").await;
        assert!(wait_until(|| transcript.messages().len() == 1).await);

        let message = &transcript.messages()[0];
        assert_eq!(message.text, "hello");
        assert_eq!(message.sender_id, UserId::from("u1"));
        assert_eq!(message.sender_label, "u1");

        // Advisory summary was refreshed by the second write.
        let dir = crate::rooms::RoomDirectory::open(
            Arc::new(backend.clone()),
            NS,
            UserId::from("u1"),
        );
        assert!(wait_until(|| {
            dir.rooms()
                .first()
                .map(|r| r.last_message.as_deref() == Some("hello"))
                .unwrap_or(false)
        })
        .await);
        assert!(dir.rooms()[0].last_message_at.is_some());
    }

    #[tokio::test]
    async fn blank_text_writes_nothing() {
        let backend = MemoryBackend::new();
        let room = room(&backend).await;
        let transcript = transcript(&backend, &room);

        transcript.send_message("").await;
        transcript.send_message("   \n ").await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(transcript.messages().is_empty());

        let dir = crate::rooms::RoomDirectory::open(
            Arc::new(backend.clone()),
            NS,
            UserId::from("u1"),
        );
        assert!(wait_until(|| dir.rooms().len() == 1).await);
        assert!(dir.rooms()[0].last_message.is_none());
    }

    #[tokio::test]
    async fn anchor_follows_the_newest_message() {
        let backend = MemoryBackend::new();
        let room = room(&backend).await;
        let transcript = transcript(&backend, &room);
        assert!(transcript.scroll_anchor().is_none());

        transcript.send_message("one").await;
        transcript.send_message("two").await;
        assert!(wait_until(|| transcript.messages().len() == 2).await);

        let newest = transcript.messages().last().unwrap().id;
        assert_eq!(transcript.scroll_anchor(), Some(newest));
    }

    #[tokio::test]
    async fn subscription_error_keeps_the_last_snapshot() {
        let backend = MemoryBackend::new();
        let room = room(&backend).await;
        let transcript = transcript(&backend, &room);
        transcript.send_message("hello").await;
        assert!(wait_until(|| transcript.messages().len() == 1).await);
        let anchor = transcript.scroll_anchor();

        backend.fail_subscriptions("backend offline");
        assert_eq!(transcript.messages().len(), 1);
        assert_eq!(transcript.messages()[0].text, "hello");
        assert_eq!(transcript.scroll_anchor(), anchor);
    }

    #[tokio::test]
    async fn dropping_the_transcript_releases_the_subscription() {
        let backend = MemoryBackend::new();
        let room = room(&backend).await;
        let transcript = transcript(&backend, &room);
        assert_eq!(backend.message_subscriber_count(NS, &room.id), 1);
        drop(transcript);
        assert_eq!(backend.message_subscriber_count(NS, &room.id), 0);
    }
}
