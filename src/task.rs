//! Structured task and plan types exchanged between the chat and resolver
//! agents.
//!
//! A `Task` is what the chat agent extracts from free text; a `Plan` is what
//! the resolver produces from a task. Both travel inside message content as
//! JSON objects, so every field serializes with serde. Input and constraint
//! maps are `BTreeMap` so serialized form and iteration order are stable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::protocol::Content;

/// Spatial scope of an analysis request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Building,
    District,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Building => "building",
            Scope::District => "district",
        }
    }
}

/// Structured analysis request.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Task {
    /// Short intent phrase, e.g. "cooling demand".
    pub intent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    /// Named inputs the requester already has, keyed by kind
    /// (geometry, weather, schedule, data, config).
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,
    /// Extracted constraints (algorithm, timestep, temperature).
    #[serde(default)]
    pub constraints: BTreeMap<String, String>,
    /// The original request text, kept for explanations and logging.
    #[serde(default)]
    pub raw_text: String,
}

impl Task {
    pub fn new(intent: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            ..Self::default()
        }
    }

    /// Parse a task out of message content.
    pub fn from_content(content: &Content) -> Result<Self> {
        serde_json::from_value(Value::Object(content.clone())).map_err(Error::from)
    }

    /// Serialize into message content.
    pub fn to_content(&self) -> Content {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Content::new(),
        }
    }
}

/// One executable step of a plan: a script plus its bound arguments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanStep {
    pub script_id: String,
    #[serde(default)]
    pub args: BTreeMap<String, String>,
}

/// Resolved workflow plan.
///
/// `missing` is the authoritative failure signal: a plan with a non-empty
/// missing list must not be executed.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
    /// Human-readable account of why this workflow was selected.
    pub explain: String,
    #[serde(default)]
    pub assumptions: Vec<String>,
    /// Required inputs the requester did not provide.
    #[serde(default)]
    pub missing: Vec<String>,
}

impl Plan {
    pub fn is_failure(&self) -> bool {
        !self.missing.is_empty()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(Error::from)
    }
}
