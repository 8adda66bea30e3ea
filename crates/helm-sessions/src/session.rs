//! Session type — a durable, identified conversation transcript.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use helm_core::messages::Message;

/// A conversation transcript plus bookkeeping.
///
/// The message sequence is append-only: entries are never removed or edited,
/// and insertion order is the conversation order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Opaque session ID.
    pub id: String,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// RFC 3339 time of the last persisted mutation.
    pub updated_at: String,
    /// Ordered transcript.
    pub messages: Vec<Message>,
    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Session {
    /// Create an empty session stamped now.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: id.into(),
            created_at: now.clone(),
            updated_at: now,
            messages: Vec::new(),
            metadata: Map::new(),
        }
    }

    /// Append a message to the transcript.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// The trailing `n` messages of the transcript, in order.
    #[must_use]
    pub fn recent_messages(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Number of messages in the transcript.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
