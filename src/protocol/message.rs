//! Message envelopes with conversation correlation for agent communication.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message payload: free-form mapping from string key to structured value.
pub type Content = Map<String, Value>;

/// Build message content from a `serde_json::json!` object literal.
///
/// Non-object values are wrapped under a `"value"` key so callers cannot
/// produce an envelope without a content map.
pub fn content(value: Value) -> Content {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

/// Speech-act tag indicating the sender's intent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Performative {
    Request,
    Inform,
    Propose,
    Agree,
    Failure,
}

/// Immutable message envelope passed between agents.
///
/// Messages are standalone values; the router moves them by value and no
/// entity owns another message. The payload shape is not validated here --
/// interpretation is left to the handler selected by `content_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub performative: Performative,
    /// Sender agent id.
    pub sender: String,
    /// Receiver agent id.
    pub receiver: String,
    /// Opaque token correlating a request with its replies across hops.
    pub conversation_id: String,
    /// String tag selecting payload interpretation and handler.
    pub content_type: String,
    pub content: Content,
    /// Creation instant.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new message. A fresh conversation id is generated when the
    /// caller supplies none; it is never derived from the content.
    pub fn create(
        performative: Performative,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        conversation_id: Option<String>,
        content_type: impl Into<String>,
        content: Content,
    ) -> Self {
        Self {
            performative,
            sender: sender.into(),
            receiver: receiver.into(),
            conversation_id: conversation_id.unwrap_or_else(new_conversation_id),
            content_type: content_type.into(),
            content,
            timestamp: Utc::now(),
        }
    }

    /// Build the correlated response to this message.
    ///
    /// The reply keeps `conversation_id`, swaps sender and receiver (the
    /// sender can be overridden), and takes all other fields fresh.
    pub fn reply(
        &self,
        performative: Performative,
        content_type: impl Into<String>,
        content: Content,
        sender: Option<&str>,
    ) -> Self {
        Message::create(
            performative,
            sender.unwrap_or(&self.receiver),
            self.sender.clone(),
            Some(self.conversation_id.clone()),
            content_type,
            content,
        )
    }

    /// Convenience accessor for a string content field.
    pub fn content_str(&self, key: &str) -> Option<&str> {
        self.content.get(key).and_then(Value::as_str)
    }
}

/// Generate a fresh, globally unique conversation token.
pub fn new_conversation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
