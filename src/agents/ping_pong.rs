//! Ping/pong agent pair for demos and bus smoke tests.

use serde_json::json;
use tokio::sync::mpsc;

use crate::agent::{Agent, AgentContext};
use crate::protocol::{content, Message, Performative, Router};

pub const PINGER_AGENT: &str = "pinger";
pub const PONGER_AGENT: &str = "ponger";

/// Pinger: forwards every received pong to `notify` so a caller can await
/// the round trip.
pub fn pinger_agent(router: &Router, notify: mpsc::UnboundedSender<Message>) -> Agent {
    let mut agent = Agent::new(PINGER_AGENT, router);
    agent.on("pong", move |_ctx, msg| {
        let notify = notify.clone();
        async move {
            tracing::info!(from = %msg.sender, "Received pong");
            let _ = notify.send(msg);
            Ok(())
        }
    });
    agent
}

/// Ponger: answers every ping with an INFORM pong carrying the original
/// timestamp.
pub fn ponger_agent(router: &Router) -> Agent {
    let mut agent = Agent::new(PONGER_AGENT, router);
    agent.on("ping", move |ctx, msg| async move {
        tracing::info!(from = %msg.sender, "Received ping");
        ctx.reply(
            &msg,
            Performative::Inform,
            "pong",
            content(json!({
                "message": "pong",
                "original_timestamp": msg.content.get("timestamp"),
                "reply_timestamp": chrono::Utc::now(),
            })),
        );
        Ok(())
    });
    agent
}

/// Send one ping from the pinger.
pub fn send_ping(pinger: &AgentContext, conversation_id: Option<String>) -> bool {
    pinger.send(
        PONGER_AGENT,
        Performative::Request,
        "ping",
        content(json!({
            "message": "ping",
            "timestamp": chrono::Utc::now(),
        })),
        conversation_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_ping_pong_round_trip() {
        let router = Router::new();
        let (notify_tx, mut notify_rx) = mpsc::unbounded_channel();

        let pinger = pinger_agent(&router, notify_tx);
        let pinger_ctx = pinger.context();
        let pinger = pinger.spawn();
        let ponger = ponger_agent(&router).spawn();

        assert!(send_ping(&pinger_ctx, Some("conv-ping".to_string())));

        let pong = tokio::time::timeout(Duration::from_secs(2), notify_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pong.sender, PONGER_AGENT);
        assert_eq!(pong.conversation_id, "conv-ping");
        assert_eq!(pong.content_str("message"), Some("pong"));
        assert!(pong.content.get("original_timestamp").is_some());

        pinger.shutdown().await;
        ponger.shutdown().await;
    }
}
