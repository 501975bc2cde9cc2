//! Agent runtime: per-agent dispatch loop, handler table, and lifecycle.
//!
//! Each agent owns an inbox and a content-type-keyed handler table. The
//! dispatch loop selects over the inbox and a cooperative stop signal; a
//! handler error is caught at the loop boundary and converted into a
//! protocol-visible FAILURE reply so the conversation does not stall.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::protocol::{content, Content, Message, Performative, Router};

/// Boxed future returned by a message handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

type BoxHandler = Box<dyn Fn(AgentContext, Message) -> HandlerFuture + Send + Sync>;

/// Lifecycle state of an agent.
///
/// Created -> Running -> Stopping -> Stopped. Stopped is terminal; a handle
/// must not be reused after `shutdown()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Created,
    Running,
    Stopping,
    Stopped,
}

/// Handle passed to message handlers for sending correlated traffic.
#[derive(Clone)]
pub struct AgentContext {
    name: String,
    router: Router,
}

impl AgentContext {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build and route a message to `receiver`. A fresh conversation id is
    /// generated when none is supplied. Returns the routing outcome.
    pub fn send(
        &self,
        receiver: &str,
        performative: Performative,
        content_type: &str,
        content: Content,
        conversation_id: Option<String>,
    ) -> bool {
        let message = Message::create(
            performative,
            self.name.clone(),
            receiver,
            conversation_id,
            content_type,
            content,
        );
        self.router.route(message)
    }

    /// Build and route the correlated reply to `original`.
    pub fn reply(
        &self,
        original: &Message,
        performative: Performative,
        content_type: &str,
        content: Content,
    ) -> bool {
        let message = original.reply(performative, content_type, content, Some(&self.name));
        self.router.route(message)
    }
}

/// An agent before its dispatch loop starts.
///
/// Construction registers the inbox with the router immediately; messages
/// routed to the agent before `spawn()` queue up and are consumed once the
/// loop runs.
pub struct Agent {
    ctx: AgentContext,
    inbox: mpsc::UnboundedReceiver<Message>,
    handlers: HashMap<String, BoxHandler>,
}

impl Agent {
    pub fn new(name: &str, router: &Router) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        router.register(name, tx);

        Self {
            ctx: AgentContext {
                name: name.to_string(),
                router: router.clone(),
            },
            inbox: rx,
            handlers: HashMap::new(),
        }
    }

    /// Attach a handler for a content type. The last registration for a
    /// given content type wins; handlers do not compose.
    pub fn on<F, Fut>(&mut self, content_type: &str, handler: F)
    where
        F: Fn(AgentContext, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        tracing::debug!(
            agent = %self.ctx.name,
            %content_type,
            "Registered handler"
        );
        self.handlers.insert(
            content_type.to_string(),
            Box::new(move |ctx, msg| Box::pin(handler(ctx, msg))),
        );
    }

    /// Context for sending messages on behalf of this agent outside the
    /// dispatch loop (e.g. a pinger initiating a conversation).
    pub fn context(&self) -> AgentContext {
        self.ctx.clone()
    }

    /// Start the dispatch loop on its own task.
    pub fn spawn(self) -> AgentHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(AgentState::Created);
        let name = self.ctx.name.clone();
        let router = self.ctx.router.clone();
        let join = tokio::spawn(self.run(stop_rx, state_tx));

        AgentHandle {
            name,
            router,
            stop_tx,
            state_rx,
            join,
        }
    }

    async fn run(
        self,
        mut stop_rx: watch::Receiver<bool>,
        state_tx: watch::Sender<AgentState>,
    ) {
        let Agent {
            ctx,
            mut inbox,
            handlers,
        } = self;

        let _ = state_tx.send(AgentState::Running);
        tracing::info!(agent = %ctx.name, "Agent started");

        loop {
            tokio::select! {
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        let _ = state_tx.send(AgentState::Stopping);
                        break;
                    }
                }
                maybe = inbox.recv() => match maybe {
                    Some(message) => dispatch(&ctx, &handlers, message).await,
                    // All senders dropped; nothing further can arrive.
                    None => {
                        let _ = state_tx.send(AgentState::Stopping);
                        break;
                    }
                }
            }
        }

        let _ = state_tx.send(AgentState::Stopped);
        tracing::info!(agent = %ctx.name, "Agent stopped");
    }
}

/// Resolve a handler by content type and invoke it.
///
/// This is the only automatic error-recovery path in the system: a handler
/// error becomes a FAILURE reply to the original sender carrying the error
/// description and the content type that failed. The agent keeps running.
async fn dispatch(
    ctx: &AgentContext,
    handlers: &HashMap<String, BoxHandler>,
    message: Message,
) {
    let Some(handler) = handlers.get(&message.content_type) else {
        tracing::warn!(
            agent = %ctx.name,
            content_type = %message.content_type,
            "No handler for content type, dropping message"
        );
        return;
    };

    if let Err(e) = handler(ctx.clone(), message.clone()).await {
        tracing::error!(
            agent = %ctx.name,
            content_type = %message.content_type,
            error = %e,
            "Handler failed"
        );
        ctx.reply(
            &message,
            Performative::Failure,
            "error",
            content(json!({
                "error": e.to_string(),
                "original_content_type": message.content_type,
            })),
        );
    }
}

/// Handle to a running agent.
pub struct AgentHandle {
    name: String,
    router: Router,
    stop_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<AgentState>,
    join: JoinHandle<()>,
}

impl AgentHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> AgentState {
        *self.state_rx.borrow()
    }

    /// Request a cooperative stop. An in-flight handler invocation is not
    /// interrupted; the loop exits after its current cycle.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Stop the loop, wait for it to exit, then unregister from the router.
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.join.await {
            tracing::error!(agent = %self.name, error = %e, "Agent task failed");
        }
        self.router.unregister(&self.name);
    }
}
