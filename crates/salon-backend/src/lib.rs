//! # salon-backend
//!
//! The external-collaborator surface of Salon: the [`AuthService`] and
//! [`DataService`] traits the client programs against, the
//! [`Observer`]/[`Subscription`] reactive contract, the record types that
//! cross that boundary, and [`MemoryBackend`], an in-process reference
//! implementation of both services used by tests and local development.
//!
//! Durability, ordering, fan-out, and consistency all live behind these
//! traits; nothing in this workspace re-implements them.

pub mod auth;
pub mod memory;
pub mod observer;
pub mod records;
pub mod store;

pub use auth::{AuthService, AuthUser};
pub use memory::MemoryBackend;
pub use observer::{Observer, Subscription};
pub use records::{Message, NewMessage, NewProfile, NewRoom, Profile, Room};
pub use store::DataService;
