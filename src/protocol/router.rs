//! Process-wide message router.
//!
//! The router is a directory from agent id to inbox. Delivery is best-effort
//! and at-most-once: an unknown receiver or a closed inbox drops the message
//! and the failure is reported to the caller only as `false`. Messages from
//! one sender to one receiver arrive in send order because each inbox is a
//! single queue drained by one consumer; no ordering holds across senders.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;

use super::message::Message;

/// Sending half of an agent inbox.
pub type InboxSender = mpsc::UnboundedSender<Message>;
/// Receiving half of an agent inbox, owned by exactly one dispatch loop.
pub type InboxReceiver = mpsc::UnboundedReceiver<Message>;

/// Shared directory mapping agent ids to inboxes.
///
/// Cloning is cheap; all clones observe the same registrations. Register,
/// unregister, and lookup are individually atomic with respect to each
/// other; no transaction spans more than one call.
#[derive(Clone, Default)]
pub struct Router {
    agents: Arc<RwLock<HashMap<String, InboxSender>>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the inbox registered under `name`.
    ///
    /// Re-registering an existing id silently replaces the previous mapping
    /// (last writer wins).
    pub fn register(&self, name: &str, inbox: InboxSender) {
        self.agents
            .write()
            .unwrap()
            .insert(name.to_string(), inbox);
        tracing::info!(agent = name, "Registered agent");
    }

    /// Remove the mapping for `name` if present; no-op otherwise.
    pub fn unregister(&self, name: &str) {
        if self.agents.write().unwrap().remove(name).is_some() {
            tracing::info!(agent = name, "Unregistered agent");
        }
    }

    /// Deliver a message to the inbox registered under `message.receiver`.
    ///
    /// Returns false when the receiver is unknown or its inbox is closed;
    /// the message is dropped, not queued, not retried.
    pub fn route(&self, message: Message) -> bool {
        let inbox = {
            let agents = self.agents.read().unwrap();
            match agents.get(&message.receiver) {
                Some(inbox) => inbox.clone(),
                None => {
                    tracing::warn!(
                        receiver = %message.receiver,
                        "Agent not found for message routing"
                    );
                    return false;
                }
            }
        };

        let sender = message.sender.clone();
        let receiver = message.receiver.clone();
        let content_type = message.content_type.clone();

        match inbox.send(message) {
            Ok(()) => {
                tracing::debug!(
                    from = %sender,
                    to = %receiver,
                    %content_type,
                    "Routed message"
                );
                true
            }
            Err(_) => {
                tracing::error!(
                    receiver = %receiver,
                    "Inbox closed, message dropped"
                );
                false
            }
        }
    }

    /// Ids of all currently registered agents.
    pub fn agent_names(&self) -> Vec<String> {
        self.agents.read().unwrap().keys().cloned().collect()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.agents.read().unwrap().contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::{content, Message, Performative};
    use serde_json::json;

    fn test_message(sender: &str, receiver: &str, body: &str) -> Message {
        Message::create(
            Performative::Request,
            sender,
            receiver,
            None,
            "ping",
            content(json!({"message": body})),
        )
    }

    #[tokio::test]
    async fn test_route_to_unknown_receiver_returns_false() {
        let router = Router::new();
        assert!(!router.route(test_message("a", "nobody", "hello")));
    }

    #[tokio::test]
    async fn test_route_delivers_exactly_once() {
        let router = Router::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        router.register("b", tx);

        assert!(router.route(test_message("a", "b", "hello")));

        let delivered = rx.recv().await.unwrap();
        assert_eq!(delivered.content_str("message"), Some("hello"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_route_after_unregister_returns_false() {
        let router = Router::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        router.register("b", tx);
        router.unregister("b");

        assert!(!router.route(test_message("a", "b", "hello")));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_route_to_closed_inbox_returns_false() {
        let router = Router::new();
        let (tx, rx) = mpsc::unbounded_channel();
        router.register("b", tx);
        drop(rx);

        assert!(!router.route(test_message("a", "b", "hello")));
    }

    #[tokio::test]
    async fn test_per_inbox_fifo() {
        let router = Router::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        router.register("b", tx);

        assert!(router.route(test_message("a", "b", "first")));
        assert!(router.route(test_message("a", "b", "second")));

        assert_eq!(rx.recv().await.unwrap().content_str("message"), Some("first"));
        assert_eq!(rx.recv().await.unwrap().content_str("message"), Some("second"));
    }

    #[tokio::test]
    async fn test_reregister_replaces_mapping() {
        let router = Router::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        router.register("b", tx1);
        router.register("b", tx2);

        assert!(router.route(test_message("a", "b", "hello")));
        assert!(rx1.try_recv().is_err());
        assert!(rx2.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_introspection() {
        let router = Router::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        router.register("chat", tx);

        assert!(router.is_registered("chat"));
        assert!(!router.is_registered("resolver"));
        assert_eq!(router.agent_names(), vec!["chat".to_string()]);
    }
}
