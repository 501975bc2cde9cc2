//! End-to-end bus tests: full agent wiring, from user text to plan.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;

use enerplan::agents::chat::CHAT_AGENT;
use enerplan::agents::ping_pong::send_ping;
use enerplan::agents::{catalog_agent, chat_agent, pinger_agent, ponger_agent, resolver_agent};
use enerplan::catalog::CapabilityProvider;
use enerplan::config::ChatSettings;
use enerplan::protocol::content;
use enerplan::{MemoryCatalog, Message, Performative, Plan, Router};

struct Bus {
    router: Router,
    handles: Vec<enerplan::AgentHandle>,
}

impl Bus {
    async fn start() -> Bus {
        let router = Router::new();
        let provider: Arc<dyn CapabilityProvider> = Arc::new(MemoryCatalog::seeded());
        provider.initialize().await.unwrap();

        let handles = vec![
            chat_agent(&router, &ChatSettings::default()).spawn(),
            resolver_agent(&router, provider.clone()).spawn(),
            catalog_agent(&router, provider).spawn(),
        ];

        Bus { router, handles }
    }

    fn front_end(&self) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.router.register("front", tx);
        rx
    }

    fn ask(&self, conversation_id: &str, question: &str) {
        self.router.route(Message::create(
            Performative::Request,
            "front",
            CHAT_AGENT,
            Some(conversation_id.to_string()),
            "query",
            content(json!({"question": question})),
        ));
    }

    async fn stop(self) {
        for handle in self.handles {
            handle.shutdown().await;
        }
    }
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<Message>) -> Message {
    tokio::time::timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("timed out waiting for bus reply")
        .expect("front-end inbox closed")
}

#[tokio::test]
async fn query_with_complete_inputs_yields_plan() {
    let bus = Bus::start().await;
    let mut front = bus.front_end();

    bus.ask(
        "conv-complete",
        "Estimate cooling demand for the district using buildings.geojson and vienna.epw, hourly",
    );

    let reply = recv(&mut front).await;
    assert_eq!(reply.conversation_id, "conv-complete");
    assert_eq!(reply.performative, Performative::Inform);
    assert_eq!(reply.content_type, "plan");
    assert_eq!(
        reply.content.get("workflow_id").unwrap(),
        "workflow-cooling-demand-001"
    );

    let plan = Plan::from_value(reply.content.get("plan").unwrap()).unwrap();
    assert!(!plan.is_failure());
    assert_eq!(plan.steps.len(), 2);
    assert_eq!(plan.steps[0].script_id, "demand-calc-001");
    assert_eq!(plan.steps[0].args.get("buildings").unwrap(), "buildings.geojson");
    assert_eq!(plan.steps[0].args.get("weather_file").unwrap(), "vienna.epw");
    assert_eq!(plan.steps[0].args.get("timestep").unwrap(), "hourly");

    bus.stop().await;
}

#[tokio::test]
async fn query_missing_inputs_yields_failure_plan() {
    let bus = Bus::start().await;
    let mut front = bus.front_end();

    bus.ask("conv-missing", "Estimate cooling demand for the district");

    let reply = recv(&mut front).await;
    assert_eq!(reply.performative, Performative::Failure);
    assert_eq!(reply.content_type, "plan");

    let missing = reply.content.get("missing").unwrap().as_array().unwrap();
    assert!(missing.iter().any(|m| m == "weather_epw"));
    assert!(missing.iter().any(|m| m == "geometry"));

    bus.stop().await;
}

#[tokio::test]
async fn unknown_intent_yields_error() {
    let bus = Bus::start().await;
    let mut front = bus.front_end();

    bus.ask("conv-unknown", "please bake a sourdough loaf");

    let reply = recv(&mut front).await;
    assert_eq!(reply.performative, Performative::Failure);
    assert_eq!(reply.content_type, "error");
    let error = reply.content.get("error").unwrap().as_str().unwrap();
    assert!(error.contains("No workflow found for intent"));

    bus.stop().await;
}

#[tokio::test]
async fn concurrent_conversations_stay_correlated() {
    let bus = Bus::start().await;
    let mut front = bus.front_end();

    bus.ask(
        "conv-a",
        "Estimate cooling demand for the district using buildings.geojson and vienna.epw",
    );
    bus.ask(
        "conv-b",
        "Evaluate ghg emissions of the existing district system using buildings.geojson and vienna.epw",
    );

    let first = recv(&mut front).await;
    let second = recv(&mut front).await;

    let mut ids = vec![first.conversation_id.clone(), second.conversation_id.clone()];
    ids.sort();
    assert_eq!(ids, vec!["conv-a".to_string(), "conv-b".to_string()]);

    for reply in [first, second] {
        assert_eq!(reply.content_type, "plan");
        if reply.conversation_id == "conv-a" {
            assert_eq!(
                reply.content.get("workflow_id").unwrap(),
                "workflow-cooling-demand-001"
            );
        }
    }

    bus.stop().await;
}

#[tokio::test]
async fn catalog_search_round_trip() {
    let bus = Bus::start().await;
    let mut front = bus.front_end();

    // The catalog agent replies to whoever asked; route a search directly
    // and read the structured results.
    bus.router.route(Message::create(
        Performative::Request,
        "front",
        "catalog",
        Some("conv-search".to_string()),
        "workflow_search",
        content(json!({"query": "validation"})),
    ));

    let reply = recv(&mut front).await;
    assert_eq!(reply.content_type, "workflow_results");
    assert_eq!(reply.content.get("count").unwrap(), 1);

    bus.stop().await;
}

#[tokio::test]
async fn ping_pong_round_trip() {
    let router = Router::new();
    let (notify_tx, mut notify_rx) = mpsc::unbounded_channel();

    let pinger = pinger_agent(&router, notify_tx);
    let ctx = pinger.context();
    let pinger = pinger.spawn();
    let ponger = ponger_agent(&router).spawn();

    assert!(send_ping(&ctx, Some("conv-ping".to_string())));

    let pong = tokio::time::timeout(Duration::from_secs(3), notify_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pong.conversation_id, "conv-ping");
    assert_eq!(pong.content.get("message").unwrap(), "pong");

    pinger.shutdown().await;
    ponger.shutdown().await;
}
