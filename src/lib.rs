//! enerplan library root.

pub mod agent;
pub mod agents;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod task;

pub use agent::{Agent, AgentContext, AgentHandle, AgentState};
pub use catalog::{CapabilityProvider, MemoryCatalog};
pub use cli::Commands;
pub use config::{load_settings, Settings};
pub use error::{Error, Result};
pub use protocol::{Message, Performative, Router};
pub use task::{Plan, PlanStep, Scope, Task};
