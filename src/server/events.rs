// Notifications published to the application layer

use serde::Serialize;
use tokio::sync::mpsc;

use crate::track::Track;

/// Fire-and-forget notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// A source finished its handshake (`true`) or went away (`false`)
    ConnectionUpdate(bool),
    /// The source announced a new track
    SongUpdate(Track),
}

pub type EventSender = mpsc::UnboundedSender<ServerEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ServerEvent>;

/// Create the channel the session manager publishes on
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Publishing side handed to sessions
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: EventSender,
}

impl Notifier {
    pub fn new(tx: EventSender) -> Self {
        Notifier { tx }
    }

    pub fn connection(&self, connected: bool) {
        self.publish(ServerEvent::ConnectionUpdate(connected));
    }

    pub fn song(&self, track: Track) {
        self.publish(ServerEvent::SongUpdate(track));
    }

    fn publish(&self, event: ServerEvent) {
        // Nobody listening is not an error for the stream.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_names() {
        let json = serde_json::to_string(&ServerEvent::ConnectionUpdate(true)).unwrap();
        assert_eq!(json, r#"{"event":"connectionUpdate","data":true}"#);

        let track = Track {
            title: Some("A".to_string()),
            artist: Some("B".to_string()),
            album: None,
        };
        let json = serde_json::to_string(&ServerEvent::SongUpdate(track)).unwrap();
        assert_eq!(json, r#"{"event":"songUpdate","data":{"title":"A","artist":"B"}}"#);
    }

    #[test]
    fn publishing_without_receiver_is_silent() {
        let (tx, rx) = channel();
        drop(rx);
        Notifier::new(tx).connection(false);
    }
}
