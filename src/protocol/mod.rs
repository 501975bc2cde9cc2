//! Agent communication protocol: message envelopes and the shared router.

pub mod message;
pub mod router;

pub use message::{content, Content, Message, Performative};
pub use router::{InboxReceiver, InboxSender, Router};
