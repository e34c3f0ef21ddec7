//! Source server: accepts one Icecast-style source connection at a time and
//! turns its Ogg/Vorbis stream into connection and track notifications.
//!
//! ```text
//! NotRunning --start()--> Starting --(listen ok)--> Running
//! Running --stop()--> Stopping --(close ok)--> NotRunning
//! Starting/Stopping --(error)--> Failed   (start() may be retried)
//! ```

pub mod events;
pub mod handshake;
pub mod manager;
mod session;

pub use events::{EventReceiver, EventSender, Notifier, ServerEvent};
pub use handshake::SourceRequest;
pub use manager::{ServerConfig, ServerState, SessionManager};
