//! Chat message payload. Messages are relayed once and never stored.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::session::ConnectionId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `<unix-millis>-<connection id>`; unique per sender per millisecond.
    pub id: String,
    pub sender: String,
    pub body: String,
    /// RFC 3339, UTC, millisecond precision.
    pub timestamp: String,
}

impl ChatMessage {
    /// `body` is expected to be trimmed and non-empty already.
    pub fn compose(
        connection_id: ConnectionId,
        sender: &str,
        body: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("{}-{}", at.timestamp_millis(), connection_id),
            sender: sender.to_string(),
            body: body.to_string(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_compose_formats_id_and_timestamp() {
        let id = ConnectionId::new();
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();

        let message = ChatMessage::compose(id, "alice", "hi", at);
        assert_eq!(message.id, format!("1709993107000-{}", id));
        assert_eq!(message.timestamp, "2024-03-09T14:05:07.000Z");
        assert_eq!(message.sender, "alice");
        assert_eq!(message.body, "hi");
    }

    #[test]
    fn test_ids_differ_across_senders() {
        let at = Utc::now();
        let a = ChatMessage::compose(ConnectionId::new(), "alice", "hi", at);
        let b = ChatMessage::compose(ConnectionId::new(), "bob", "hi", at);
        assert_ne!(a.id, b.id);
    }
}
