//! # salon-client
//!
//! The Salon client core: session lifecycle, room directory, room
//! transcript, and view routing, all driven by live subscriptions against
//! the external auth and document-store collaborators.  Presentation is a
//! consumer of this crate, not part of it.

pub mod app;
pub mod auth_screen;
pub mod config;
pub mod rooms;
pub mod router;
pub mod session;
pub mod transcript;

pub use app::App;
pub use auth_screen::{AuthIntent, LoginForm};
pub use config::ClientConfig;
pub use rooms::RoomDirectory;
pub use router::{View, ViewRouter};
pub use session::{Identity, SessionManager, SessionSnapshot};
pub use transcript::RoomTranscript;

use tracing_subscriber::{fmt, EnvFilter};

/// Initialise structured logging for the client process.
///
/// Honors `RUST_LOG`; defaults to debug for the salon crates and warn for
/// everything else.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("salon_client=debug,salon_backend=debug,warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
