//! The bundled agents: chat front end, workflow resolver, catalog lookup,
//! and the ping/pong demo pair.

pub mod catalog;
pub mod chat;
pub mod ping_pong;
pub mod resolver;

pub use catalog::catalog_agent;
pub use chat::chat_agent;
pub use ping_pong::{pinger_agent, ponger_agent};
pub use resolver::resolver_agent;
