//! View routing: which screen is presented.

use serde::Serialize;

use salon_shared::RoomId;

use crate::session::SessionSnapshot;

/// The presented screen, as a tagged union.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub enum View {
    Login,
    RoomList,
    RoomTranscript { room_id: RoomId, room_name: String },
}

/// State machine over [`View`].
///
/// Session-driven transitions: identity absence forces `Login` from any
/// state (a sign-out inside a transcript jumps straight there); identity
/// presence promotes `Login` to `RoomList`.  Navigation transitions:
/// [`open_room`](Self::open_room) and [`back`](Self::back).  Nothing fires
/// while the session is still loading, so the initial `RoomList` is
/// corrected to `Login` only once loading completes without an identity.
#[derive(Debug)]
pub struct ViewRouter {
    view: View,
}

impl ViewRouter {
    pub fn new() -> Self {
        Self {
            view: View::RoomList,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    /// Apply a session snapshot.
    pub fn apply_session(&mut self, snapshot: &SessionSnapshot) {
        if snapshot.loading {
            return;
        }
        match (&self.view, &snapshot.identity) {
            (_, None) => self.view = View::Login,
            (View::Login, Some(_)) => self.view = View::RoomList,
            _ => {}
        }
    }

    /// Explicit room selection; only valid from the room list.
    pub fn open_room(&mut self, room_id: RoomId, room_name: String) {
        if self.view == View::RoomList {
            self.view = View::RoomTranscript { room_id, room_name };
        }
    }

    /// Explicit back action from a transcript, clearing the selection.
    pub fn back(&mut self) {
        if matches!(self.view, View::RoomTranscript { .. }) {
            self.view = View::RoomList;
        }
    }
}

impl Default for ViewRouter {
    fn default() -> Self {
        Self::new()
    }
}
