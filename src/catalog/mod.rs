//! Capability catalog: the read-only registry of scripts and workflows the
//! resolver and catalog agents consult.

pub mod memory;
pub mod models;

use async_trait::async_trait;

use crate::error::Result;

pub use memory::MemoryCatalog;
pub use models::{Script, ScriptInput, ScriptOutput, Workflow, WorkflowStep};

/// Read-only access to registered scripts and workflows.
///
/// Implementations must return workflows in a stable order; resolver
/// tie-breaking depends on it.
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    /// Prepare the provider for queries (open connections, load fixtures).
    async fn initialize(&self) -> Result<()>;

    async fn get_all_workflows(&self) -> Result<Vec<Workflow>>;

    async fn get_workflow_by_id(&self, id: &str) -> Result<Option<Workflow>>;

    async fn get_script_by_id(&self, id: &str) -> Result<Option<Script>>;

    /// Case-insensitive search over script name, doc, and tags. All supplied
    /// filters must match.
    async fn search_scripts(
        &self,
        query: Option<&str>,
        category: Option<&str>,
        tags: &[String],
    ) -> Result<Vec<Script>>;

    /// Usage text for a script: doc plus declared inputs and outputs.
    async fn script_help(&self, id: &str) -> Result<Option<String>>;
}
