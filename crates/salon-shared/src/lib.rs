//! # salon-shared
//!
//! Identifier newtypes, error taxonomy, and constants shared by every
//! Salon crate.  This crate has no knowledge of the backend collaborators
//! or the client state machine; it only defines the vocabulary they speak.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{AuthError, BackendError, StoreError};
pub use types::{MessageId, RoomId, UserId};
