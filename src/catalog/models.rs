//! Catalog records: scripts and workflows.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared input of a script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptInput {
    pub name: String,
    #[serde(rename = "type")]
    pub input_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

fn default_required() -> bool {
    true
}

/// Declared output of a script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptOutput {
    pub name: String,
    #[serde(rename = "type")]
    pub output_type: String,
    #[serde(default)]
    pub description: String,
}

/// An executable analysis script registered in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub id: String,
    pub name: String,
    pub path: String,
    /// Short docstring shown by script help.
    #[serde(default)]
    pub doc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub inputs: Vec<ScriptInput>,
    #[serde(default)]
    pub outputs: Vec<ScriptOutput>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Script {
    /// Look up a declared input by name.
    pub fn input(&self, name: &str) -> Option<&ScriptInput> {
        self.inputs.iter().find(|i| i.name == name)
    }
}

/// One ordered step of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub step: u32,
    pub script_id: String,
    pub script_name: String,
    pub action: String,
    #[serde(default)]
    pub description: String,
}

/// A named multi-step analysis recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<WorkflowStep>,
    #[serde(default)]
    pub tags: Vec<String>,
}
