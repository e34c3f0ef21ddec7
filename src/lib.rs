//! deckfeed - now-playing metadata from DJ software broadcasts.
//!
//! DJ software can broadcast its mix to an Icecast server as an Ogg/Vorbis
//! stream, announcing every new track in a Vorbis comment header. deckfeed
//! plays the part of that server: it accepts one source connection, answers
//! the SOURCE handshake, demultiplexes the Ogg stream and publishes the
//! title/artist of each track as it starts.
//!
//! ```no_run
//! use deckfeed::server::{events, ServerEvent, SessionManager};
//!
//! # async fn run() -> deckfeed::Result<()> {
//! let (tx, mut rx) = events::channel();
//! let manager = SessionManager::new(tx);
//! manager.start("127.0.0.1", 8000).await?;
//!
//! while let Some(event) = rx.recv().await {
//!     if let ServerEvent::SongUpdate(track) = event {
//!         println!("now playing: {}", track);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod file;
pub mod ogg;
pub mod pipeline;
pub mod server;
pub mod track;
pub mod utils;
pub mod vorbis;

pub use error::{Error, Result};
pub use file::OggVorbisFile;
pub use pipeline::MetadataPipeline;
pub use server::{ServerConfig, ServerEvent, ServerState, SessionManager};
pub use track::Track;
