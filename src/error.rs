//! Error types for deckfeed

/// Result type alias for deckfeed operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the decoders and the session manager
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Page does not start with the "OggS" capture pattern
    #[error("Invalid Ogg page: bad capture pattern {0:02x?}")]
    BadMagic([u8; 4]),

    /// Page stream structure version other than 0
    #[error("Unsupported Ogg page version: {0}")]
    UnsupportedVersion(u8),

    /// Header type byte carries bits outside continuation/BOS/EOS
    #[error("Unknown Ogg page flags: {0:#04x}")]
    UnknownFlags(u8),

    /// Not enough bytes for a whole page
    #[error("Truncated Ogg page: need {needed} bytes, have {available}")]
    TruncatedPage { needed: usize, available: usize },

    /// Page continuation flag disagrees with the carried packet
    #[error("Invalid payload: page continuation={continuation}, carried packet={carried}")]
    ContinuationMismatch { continuation: bool, carried: bool },

    /// Continuation page belongs to another logical stream than the carried packet
    #[error("Continuation page for stream {found:#010x} while holding a packet of stream {expected:#010x}")]
    SerialMismatch { expected: u32, found: u32 },

    /// Chunk did not end exactly on a page boundary
    #[error("Malformed chunk: {0} trailing bytes after last page")]
    TrailingBytes(usize),

    /// Packet is not a usable Vorbis header
    #[error("Invalid Vorbis packet: {0}")]
    InvalidHeader(String),

    /// Source did not open with an Icecast SOURCE request
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// start() while a server is running
    #[error("Server already running")]
    AlreadyRunning,

    /// start() while a connection from a previous server is still tracked
    #[error("Open connection detected")]
    OpenConnection,

    /// stop() without a running server
    #[error("Server not running")]
    NotRunning,

    /// start()/stop() while another transition is pending
    #[error("Server {0} already in progress")]
    TransitionInProgress(&'static str),

    /// Listening socket could not be opened
    #[error("Failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Listener shutdown did not complete cleanly
    #[error("Failed to close server: {0}")]
    Close(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid header error
    pub fn invalid_header(msg: impl Into<String>) -> Self {
        Self::InvalidHeader(msg.into())
    }

    /// Create a handshake error
    pub fn handshake(msg: impl Into<String>) -> Self {
        Self::Handshake(msg.into())
    }

    /// Errors that end the current connection without touching the listener.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::BadMagic(_)
                | Self::UnsupportedVersion(_)
                | Self::UnknownFlags(_)
                | Self::TruncatedPage { .. }
                | Self::ContinuationMismatch { .. }
                | Self::SerialMismatch { .. }
                | Self::TrailingBytes(_)
                | Self::Handshake(_)
        )
    }

    /// Errors that only invalidate a single packet.
    pub fn is_malformed_header(&self) -> bool {
        matches!(self, Self::InvalidHeader(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_error_categories() {
        assert!(Error::BadMagic(*b"RIFF").is_protocol_violation());
        assert!(Error::handshake("GET").is_protocol_violation());
        assert!(!Error::invalid_header("framing").is_protocol_violation());
        assert!(Error::invalid_header("framing").is_malformed_header());
        assert!(!Error::AlreadyRunning.is_protocol_violation());
    }

    #[test]
    fn messages_match_control_surface_wording() {
        assert_eq!(Error::AlreadyRunning.to_string(), "Server already running");
        assert_eq!(Error::NotRunning.to_string(), "Server not running");
        assert_eq!(Error::OpenConnection.to_string(), "Open connection detected");
    }
}
