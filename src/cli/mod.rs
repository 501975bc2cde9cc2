//! CLI commands for enerplan using clap.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use crate::agents::{catalog_agent, chat_agent, pinger_agent, ponger_agent, resolver_agent};
use crate::agents::chat::CHAT_AGENT;
use crate::agents::ping_pong::send_ping;
use crate::catalog::{CapabilityProvider, MemoryCatalog};
use crate::config::Settings;
use crate::protocol::{content, Message, Performative, Router};
use crate::task::Plan;

/// enerplan - Multi-agent planning assistant for urban energy workflows.
#[derive(Parser)]
#[command(name = "enerplan")]
#[command(version = "0.1.0")]
#[command(about = "Maps urban energy requests to executable workflow plans", long_about = None)]
pub struct Commands {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Ask the assistant for a workflow plan
    Ask {
        /// The request, e.g. "Estimate cooling demand for the district using buildings.geojson"
        text: String,
    },

    /// Run a ping/pong round trip over the bus
    Demo,

    /// Inspect the capability catalog
    Catalog {
        #[command(subcommand)]
        what: CatalogCommand,
    },
}

#[derive(Subcommand)]
pub enum CatalogCommand {
    /// List registered workflows
    Workflows,

    /// List registered scripts
    Scripts,
}

impl Commands {
    pub async fn run(self, settings: Settings) -> Result<()> {
        match self.command {
            Command::Ask { text } => ask(&text, &settings).await,
            Command::Demo => demo().await,
            Command::Catalog { what } => catalog(what).await,
        }
    }
}

/// Wire up the full agent set, submit one query, and print the reply.
async fn ask(text: &str, settings: &Settings) -> Result<()> {
    let router = Router::new();
    let provider: Arc<dyn CapabilityProvider> = Arc::new(MemoryCatalog::seeded());
    provider.initialize().await?;

    let chat = chat_agent(&router, &settings.chat).spawn();
    let resolver = resolver_agent(&router, provider.clone()).spawn();
    let catalog = catalog_agent(&router, provider).spawn();

    // A temporary inbox stands in for an interactive front end.
    let (tx, mut rx) = mpsc::unbounded_channel();
    router.register("cli", tx);

    router.route(Message::create(
        Performative::Request,
        "cli",
        CHAT_AGENT,
        None,
        "query",
        content(serde_json::json!({"question": text})),
    ));

    let timeout = Duration::from_secs(settings.ask_timeout_seconds);
    let reply = tokio::time::timeout(timeout, rx.recv()).await;

    router.unregister("cli");
    chat.shutdown().await;
    resolver.shutdown().await;
    catalog.shutdown().await;

    match reply {
        Ok(Some(message)) => print_reply(&message),
        Ok(None) => anyhow::bail!("Bus closed before a reply arrived"),
        Err(_) => anyhow::bail!(
            "No reply within {} seconds",
            settings.ask_timeout_seconds
        ),
    }
    Ok(())
}

fn print_reply(message: &Message) {
    match (message.performative, message.content_type.as_str()) {
        (Performative::Inform, "plan") => {
            let name = message.content_str("workflow_name").unwrap_or("?");
            println!("Workflow: {name}");
            if let Some(plan) = message
                .content
                .get("plan")
                .and_then(|v| Plan::from_value(v).ok())
            {
                println!("\n{}\n", plan.explain);
                println!("Steps:");
                for (i, step) in plan.steps.iter().enumerate() {
                    println!("  {}. {}", i + 1, step.script_id);
                    for (arg, value) in &step.args {
                        println!("     {arg} = {value}");
                    }
                }
                if !plan.assumptions.is_empty() {
                    println!("\nAssumptions:");
                    for assumption in &plan.assumptions {
                        println!("  - {assumption}");
                    }
                }
            }
        }
        (Performative::Failure, "plan") => {
            let reason = message.content_str("reason").unwrap_or("Planning failed");
            println!("Cannot build a plan: {reason}");
            if let Some(missing) = message.content.get("missing").and_then(|v| v.as_array()) {
                println!("Provide these inputs and try again:");
                for item in missing {
                    if let Some(name) = item.as_str() {
                        println!("  - {name}");
                    }
                }
            }
        }
        (_, "response") => {
            println!("{}", message.content_str("answer").unwrap_or("No response"));
        }
        _ => {
            let error = message.content_str("error").unwrap_or("Unknown error");
            println!("Error: {error}");
        }
    }
}

/// Ping/pong round trip, timing the bus.
async fn demo() -> Result<()> {
    let router = Router::new();
    let (notify_tx, mut notify_rx) = mpsc::unbounded_channel();

    let pinger = pinger_agent(&router, notify_tx);
    let pinger_ctx = pinger.context();
    let pinger = pinger.spawn();
    let ponger = ponger_agent(&router).spawn();

    let started = std::time::Instant::now();
    if !send_ping(&pinger_ctx, None) {
        anyhow::bail!("Failed to route ping");
    }

    let pong = tokio::time::timeout(Duration::from_secs(5), notify_rx.recv())
        .await
        .map_err(|_| anyhow::anyhow!("No pong within 5 seconds"))?
        .ok_or_else(|| anyhow::anyhow!("Pinger inbox closed"))?;

    println!(
        "pong from {} in {:?} (conversation {})",
        pong.sender,
        started.elapsed(),
        pong.conversation_id
    );

    pinger.shutdown().await;
    ponger.shutdown().await;
    Ok(())
}

async fn catalog(what: CatalogCommand) -> Result<()> {
    let provider = MemoryCatalog::seeded();
    provider.initialize().await?;

    match what {
        CatalogCommand::Workflows => {
            for workflow in provider.get_all_workflows().await? {
                println!("{} ({})", workflow.name, workflow.id);
                println!("  {}", workflow.description);
                for step in &workflow.steps {
                    println!("  {}. {} -> {}", step.step, step.action, step.script_name);
                }
                println!("  tags: {}", workflow.tags.join(", "));
                println!();
            }
        }
        CatalogCommand::Scripts => {
            for script in provider.search_scripts(None, None, &[]).await? {
                if let Some(help) = provider.script_help(&script.id).await? {
                    println!("{help}");
                }
            }
        }
    }
    Ok(())
}
