//! Resolver agent: turns a structured `Task` into an executable `Plan`.
//!
//! Resolution is rule-based and deterministic for a fixed catalog snapshot:
//! tag extraction, candidate filtering by tag overlap, additive scoring, and
//! a fixed input-to-argument mapping. Ties go to the earliest workflow in
//! provider order.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::json;

use crate::agent::Agent;
use crate::catalog::{CapabilityProvider, Script, Workflow};
use crate::error::{Error, Result};
use crate::protocol::{content, Performative, Router};
use crate::task::{Plan, PlanStep, Task};

pub const RESOLVER_AGENT: &str = "resolver";

/// Build the resolver agent with its `task` handler attached.
pub fn resolver_agent(router: &Router, catalog: Arc<dyn CapabilityProvider>) -> Agent {
    let mut agent = Agent::new(RESOLVER_AGENT, router);

    agent.on("task", move |ctx, msg| {
        let catalog = catalog.clone();
        async move {
            let task = Task::from_content(&msg.content)?;
            tracing::info!(intent = %task.intent, "Resolving task");

            let Some(workflow) = find_best_workflow(catalog.as_ref(), &task).await? else {
                ctx.reply(
                    &msg,
                    Performative::Failure,
                    "error",
                    content(json!({
                        "error": Error::NoWorkflow(task.intent.clone()).to_string(),
                    })),
                );
                return Ok(());
            };

            let plan = compute_plan(catalog.as_ref(), &task, &workflow).await?;

            if plan.is_failure() {
                ctx.reply(
                    &msg,
                    Performative::Failure,
                    "plan",
                    content(json!({
                        "reason": format!(
                            "Missing required inputs: {}",
                            plan.missing.join(", ")
                        ),
                        "missing": plan.missing,
                        "plan": plan.to_value(),
                    })),
                );
            } else {
                ctx.reply(
                    &msg,
                    Performative::Inform,
                    "plan",
                    content(json!({
                        "plan": plan.to_value(),
                        "workflow_id": workflow.id,
                        "workflow_name": workflow.name,
                    })),
                );
            }
            Ok(())
        }
    });

    agent
}

/// Tags describing a task: intent words, scope, recognized input kinds,
/// kinds inferred from file extensions, and recognized constraint kinds.
pub fn task_tags(task: &Task) -> BTreeSet<String> {
    let mut tags = BTreeSet::new();

    // Word characters include underscores, so an intent like
    // "general_analysis" stays a single token.
    for word in task
        .intent
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
    {
        if !word.is_empty() {
            tags.insert(word.to_string());
        }
    }

    if let Some(scope) = task.scope {
        tags.insert(scope.as_str().to_string());
    }

    for key in task.inputs.keys() {
        if matches!(key.as_str(), "geometry" | "weather" | "schedule" | "data" | "config") {
            tags.insert(key.clone());
        }
    }

    for file in task.inputs.values() {
        if file.ends_with(".geojson") {
            tags.insert("geometry".to_string());
        } else if file.ends_with(".epw") {
            tags.insert("weather".to_string());
        } else if file.ends_with(".csv") {
            tags.insert("data".to_string());
        } else if file.ends_with(".xlsx") {
            tags.insert("schedule".to_string());
        }
    }

    for key in task.constraints.keys() {
        if matches!(key.as_str(), "algorithm" | "timestep" | "temperature") {
            tags.insert(key.clone());
        }
    }

    tags
}

/// Score a workflow against a task: tag overlap count, plus 5 when the
/// workflow name mentions the intent (whole phrase or any word), plus 2 when
/// the workflow carries the task's scope tag.
pub fn score_workflow(task: &Task, workflow: &Workflow) -> u32 {
    let tags = task_tags(task);
    let workflow_tags: BTreeSet<&str> = workflow.tags.iter().map(String::as_str).collect();

    let overlap = tags
        .iter()
        .filter(|t| workflow_tags.contains(t.as_str()))
        .count() as u32;

    let intent_bonus = if workflow.name.contains(&task.intent)
        || task
            .intent
            .split_whitespace()
            .any(|word| workflow.name.contains(word))
    {
        5
    } else {
        0
    };

    let scope_bonus = match task.scope {
        Some(scope) if workflow_tags.contains(scope.as_str()) => 2,
        _ => 0,
    };

    overlap + intent_bonus + scope_bonus
}

/// Pick the highest-scoring workflow with non-empty tag overlap, or `None`
/// when no workflow shares a tag with the task. Strict comparison keeps the
/// first candidate on equal scores.
pub async fn find_best_workflow(
    catalog: &dyn CapabilityProvider,
    task: &Task,
) -> Result<Option<Workflow>> {
    let tags = task_tags(task);
    tracing::debug!(?tags, "Task tags");

    let mut best: Option<Workflow> = None;
    let mut best_score = 0u32;

    for workflow in catalog.get_all_workflows().await? {
        let overlap = workflow
            .tags
            .iter()
            .any(|t| tags.contains(t.as_str()));
        if !overlap {
            continue;
        }

        let score = score_workflow(task, &workflow);
        tracing::debug!(workflow = %workflow.name, score, "Scored candidate");
        if score > best_score {
            best_score = score;
            best = Some(workflow);
        }
    }

    if let Some(w) = &best {
        tracing::info!(workflow = %w.name, score = best_score, "Selected workflow");
    }
    Ok(best)
}

/// Build the plan for a selected workflow: bind arguments per step, check the
/// required-input heuristics, and attach the explanation and assumptions.
pub async fn compute_plan(
    catalog: &dyn CapabilityProvider,
    task: &Task,
    workflow: &Workflow,
) -> Result<Plan> {
    let mut scripts: BTreeMap<String, Script> = BTreeMap::new();
    for step in &workflow.steps {
        if let Some(script) = catalog.get_script_by_id(&step.script_id).await? {
            scripts.insert(step.script_id.clone(), script);
        }
    }

    let mut required_inputs: BTreeMap<String, String> = BTreeMap::new();
    for script in scripts.values() {
        for input in &script.inputs {
            if input.required {
                required_inputs.insert(input.name.clone(), input.input_type.clone());
            }
        }
    }

    // Only weather, geometry, and scenario config are checked; other required
    // inputs are assumed fillable downstream.
    let mut available: BTreeSet<&'static str> = BTreeSet::new();
    let mut missing: Vec<String> = Vec::new();

    let needs_weather = required_inputs.contains_key("weather_file")
        || required_inputs.keys().any(|k| k.to_lowercase().contains("weather"));
    if needs_weather {
        if task.inputs.values().any(|f| f.ends_with(".epw"))
            || task.inputs.contains_key("weather")
        {
            available.insert("weather_epw");
        } else {
            missing.push("weather_epw".to_string());
        }
    }

    let needs_geometry = required_inputs.contains_key("buildings")
        || required_inputs.keys().any(|k| k.to_lowercase().contains("geometry"));
    if needs_geometry {
        if task.inputs.values().any(|f| f.ends_with(".geojson"))
            || task.inputs.contains_key("geometry")
        {
            available.insert("geometry");
        } else {
            missing.push("geometry".to_string());
        }
    }

    if required_inputs.contains_key("scenario_config") {
        // A scenario file can be generated once any concrete input exists.
        if !available.is_empty() {
            available.insert("scenario_config");
        } else {
            missing.push("scenario_config".to_string());
        }
    }

    let mut steps = Vec::new();
    for step in &workflow.steps {
        if let Some(script) = scripts.get(&step.script_id) {
            steps.push(PlanStep {
                script_id: step.script_id.clone(),
                args: map_script_args(task, script),
            });
        }
    }

    let explain = generate_explanation(task, workflow, &available, &missing);
    let assumptions = generate_assumptions(task, workflow);

    Ok(Plan {
        steps,
        explain,
        assumptions,
        missing,
    })
}

/// Bind task inputs and constraints to one script's argument names.
pub fn map_script_args(task: &Task, script: &Script) -> BTreeMap<String, String> {
    let mut args = BTreeMap::new();

    for (key, value) in &task.inputs {
        if key == "geometry" || value.ends_with(".geojson") {
            args.insert("buildings".to_string(), value.clone());
        } else if key == "weather" || value.ends_with(".epw") {
            args.insert("weather_file".to_string(), value.clone());
        } else if key == "schedule" || value.ends_with(".xlsx") {
            args.insert("occupancy_schedules".to_string(), value.clone());
        } else if key == "data" || value.ends_with(".csv") {
            args.insert("energy_demands".to_string(), value.clone());
        }
    }

    for (key, value) in &task.constraints {
        if key == "algorithm" {
            args.insert("algorithm".to_string(), value.clone());
        } else if key == "timestep" {
            args.insert("timestep".to_string(), value.clone());
        }
    }

    if script.input("scenario_config").is_some() {
        args.insert("scenario_config".to_string(), "scenario.yml".to_string());
    }

    args
}

fn generate_explanation(
    task: &Task,
    workflow: &Workflow,
    available: &BTreeSet<&'static str>,
    missing: &[String],
) -> String {
    let mut explanation = format!(
        "Selected workflow '{}' because it matches your intent to {}.",
        workflow.name, task.intent
    );

    if let Some(scope) = task.scope {
        explanation.push_str(&format!(
            " This workflow is suitable for {}-level analysis.",
            scope.as_str()
        ));
    }

    let descriptions: Vec<&str> = workflow.steps.iter().map(|s| s.description.as_str()).collect();
    explanation.push_str(&format!(
        " The workflow consists of {} steps: {}.",
        workflow.steps.len(),
        descriptions.join(", ")
    ));

    if !available.is_empty() {
        let names: Vec<&str> = available.iter().copied().collect();
        explanation.push_str(&format!(" Available inputs: {}.", names.join(", ")));
    }

    if !missing.is_empty() {
        explanation.push_str(&format!(
            " Missing required inputs: {}.",
            missing.join(", ")
        ));
    }

    explanation
}

fn generate_assumptions(task: &Task, workflow: &Workflow) -> Vec<String> {
    let mut assumptions = vec![
        "Using default building schedules if not provided".to_string(),
        "Standard thermal model parameters unless specified".to_string(),
    ];

    match task.scope {
        Some(crate::task::Scope::District) => assumptions.push(
            "All buildings in district have similar characteristics".to_string(),
        ),
        Some(crate::task::Scope::Building) => assumptions.push(
            "Single building analysis with typical occupancy patterns".to_string(),
        ),
        None => {}
    }

    if task.intent.contains("cooling") {
        assumptions.push("Focusing on cooling loads and systems".to_string());
    }

    if workflow.steps.iter().any(|s| s.action.contains("optimization")) {
        assumptions.push("Using default optimization objectives unless specified".to_string());
    }

    assumptions
}
