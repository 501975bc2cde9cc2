//! Chat agent: the conversational front end.
//!
//! Turns free-form user text into a structured `Task` with rule-based
//! extraction, answers FAQ-style questions from an optional glossary, and
//! shuttles replies from the resolver and catalog agents back to the
//! original requester. Correlation is tracked in a pending-query table keyed
//! by conversation id.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use crate::agent::{Agent, AgentContext};
use crate::config::ChatSettings;
use crate::error::{Error, Result};
use crate::protocol::{content, Content, Message, Performative, Router};
use crate::task::{Scope, Task};

pub const CHAT_AGENT: &str = "chat";

use super::resolver::RESOLVER_AGENT;

/// FAQ glossary: question/answer pairs loaded from a JSON file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Glossary {
    #[serde(default)]
    pub faq: Vec<FaqItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
}

impl Glossary {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(Error::from)
    }
}

type PendingQueries = Arc<Mutex<HashMap<String, Message>>>;

/// Build the chat agent with all its handlers attached.
pub fn chat_agent(router: &Router, settings: &ChatSettings) -> Agent {
    let glossary = match settings.glossary_path.as_ref() {
        Some(path) => match Glossary::load(path) {
            Ok(g) => g,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load glossary, FAQ lookup disabled");
                Glossary::default()
            }
        },
        None => Glossary::default(),
    };
    let glossary = Arc::new(glossary);
    let pending: PendingQueries = Arc::new(Mutex::new(HashMap::new()));

    let mut agent = Agent::new(CHAT_AGENT, router);

    // query / user_text both normalize into the same task pipeline; they
    // differ only in the content field carrying the text.
    for (content_type, field) in [("query", "question"), ("user_text", "text")] {
        let glossary = glossary.clone();
        let pending = pending.clone();
        agent.on(content_type, move |ctx, msg| {
            let glossary = glossary.clone();
            let pending = pending.clone();
            async move {
                let Some(text) = msg
                    .content_str(field)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                else {
                    ctx.reply(
                        &msg,
                        Performative::Failure,
                        "error",
                        content(json!({"error": format!("No {field} provided")})),
                    );
                    return Ok(());
                };

                pending
                    .lock()
                    .unwrap()
                    .insert(msg.conversation_id.clone(), msg.clone());

                if let Some(answer) = lookup_faq(&glossary, &text) {
                    pending.lock().unwrap().remove(&msg.conversation_id);
                    ctx.reply(
                        &msg,
                        Performative::Inform,
                        "response",
                        content(json!({"answer": answer})),
                    );
                    return Ok(());
                }

                let task = parse_task(&text);
                tracing::info!(intent = %task.intent, "Parsed task from user text");
                ctx.send(
                    RESOLVER_AGENT,
                    Performative::Request,
                    "task",
                    task.to_content(),
                    Some(msg.conversation_id.clone()),
                );
                Ok(())
            }
        });
    }

    // Plan replies are forwarded verbatim: same performative, same content,
    // so a resolution FAILURE stays visible to the requester.
    {
        let pending = pending.clone();
        agent.on("plan", move |ctx, msg| {
            let pending = pending.clone();
            async move {
                forward_to_origin(&ctx, &pending, &msg, msg.performative, &msg.content_type, msg.content.clone());
                Ok(())
            }
        });
    }

    {
        let pending = pending.clone();
        agent.on("response", move |ctx, msg| {
            let pending = pending.clone();
            async move {
                let answer = msg.content_str("answer").unwrap_or("No response").to_string();
                forward_to_origin(
                    &ctx,
                    &pending,
                    &msg,
                    Performative::Inform,
                    "response",
                    content(json!({"answer": answer})),
                );
                Ok(())
            }
        });
    }

    {
        let pending = pending.clone();
        agent.on("script_results", move |ctx, msg| {
            let pending = pending.clone();
            async move {
                let mut answer = String::new();
                if let Some(scripts) = msg.content.get("scripts").and_then(|v| v.as_array()) {
                    if !scripts.is_empty() {
                        answer.push_str("Found these scripts for your query:\n");
                        for script in scripts {
                            let name = script.get("name").and_then(|v| v.as_str()).unwrap_or("?");
                            let doc = script.get("doc").and_then(|v| v.as_str()).unwrap_or("");
                            answer.push_str(&format!("- {name}: {doc}\n"));
                        }
                    }
                }
                if answer.is_empty() {
                    answer = "No scripts found matching your query.".to_string();
                }
                forward_to_origin(
                    &ctx,
                    &pending,
                    &msg,
                    Performative::Inform,
                    "response",
                    content(json!({"answer": answer})),
                );
                Ok(())
            }
        });
    }

    {
        let pending = pending.clone();
        agent.on("workflow_results", move |ctx, msg| {
            let pending = pending.clone();
            async move {
                let mut answer = String::new();
                if let Some(workflows) = msg.content.get("workflows").and_then(|v| v.as_array()) {
                    if !workflows.is_empty() {
                        answer.push_str("Found these workflows:\n");
                        for workflow in workflows {
                            let name = workflow.get("name").and_then(|v| v.as_str()).unwrap_or("?");
                            let desc = workflow
                                .get("description")
                                .and_then(|v| v.as_str())
                                .unwrap_or("");
                            answer.push_str(&format!("- {name}: {desc}\n"));
                        }
                    }
                }
                if answer.is_empty() {
                    answer = "No workflows found matching your query.".to_string();
                }
                forward_to_origin(
                    &ctx,
                    &pending,
                    &msg,
                    Performative::Inform,
                    "response",
                    content(json!({"answer": answer})),
                );
                Ok(())
            }
        });
    }

    agent
}

/// Reply to the tracked original message for this conversation, then drop
/// the pending entry. Logs and drops when no query is pending.
fn forward_to_origin(
    ctx: &AgentContext,
    pending: &PendingQueries,
    msg: &Message,
    performative: Performative,
    content_type: &str,
    body: Content,
) {
    let original = pending.lock().unwrap().remove(&msg.conversation_id);
    match original {
        Some(original) => {
            ctx.reply(&original, performative, content_type, body);
        }
        None => {
            tracing::warn!(
                conversation_id = %msg.conversation_id,
                "No pending query for conversation"
            );
        }
    }
}

/// Match a question against the glossary.
///
/// Only question-shaped text is considered; a FAQ entry matches when it
/// shares at least one domain word with the question after stop-word
/// filtering.
pub fn lookup_faq(glossary: &Glossary, user_text: &str) -> Option<String> {
    let user_lower = user_text.to_lowercase();

    let indicators = ["what is", "how do", "what are", "how to", "what file", "what format"];
    if !indicators.iter().any(|i| user_lower.contains(i)) {
        return None;
    }

    let stop_words = ["the", "a", "an", "are", "to", "of", "for", "with", "in", "on", "at"];
    let domain_words = [
        "cea", "cooling", "demand", "file", "formats", "support", "network",
        "optimization", "calculate", "analyze",
    ];

    let user_words: Vec<String> = words(&user_lower)
        .into_iter()
        .filter(|w| !stop_words.contains(&w.as_str()))
        .collect();

    for item in &glossary.faq {
        let question_words: Vec<String> = words(&item.question.to_lowercase())
            .into_iter()
            .filter(|w| !stop_words.contains(&w.as_str()))
            .collect();

        let common: Vec<&String> = question_words
            .iter()
            .filter(|w| user_words.contains(w))
            .collect();

        if !common.is_empty() && common.iter().any(|w| domain_words.contains(&w.as_str())) {
            return Some(item.answer.clone());
        }
    }

    None
}

fn words(text: &str) -> Vec<String> {
    // Underscores count as word characters.
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Rule-based extraction of a structured task from free text.
pub fn parse_task(user_text: &str) -> Task {
    Task {
        intent: detect_intent(user_text),
        scope: detect_scope(user_text),
        inputs: extract_file_inputs(user_text),
        constraints: extract_constraints(user_text),
        raw_text: user_text.to_string(),
    }
}

/// Keyword-scored intent detection; falls back to `general_analysis`.
pub fn detect_intent(text: &str) -> String {
    let intent_keywords: [(&str, &[&str]); 6] = [
        ("cooling demand", &["cooling", "demand", "cool", "estimate"]),
        ("network", &["network", "pipe", "distribution", "optimize"]),
        ("tech selection", &["technology", "system", "selection", "choose"]),
        ("kpis", &["kpi", "performance", "indicator", "metric"]),
        ("cost", &["cost", "economic", "financial", "price"]),
        ("ghg", &["emission", "carbon", "ghg", "co2", "greenhouse"]),
    ];

    let text_lower = text.to_lowercase();
    let text_words = words(&text_lower);

    let mut best = "general_analysis";
    let mut best_score = 0u32;

    for (intent, keywords) in intent_keywords {
        let mut score = 0;
        for keyword in keywords {
            if text_lower.contains(keyword) {
                score += 1;
            }
            if text_words.iter().any(|w| w == keyword) {
                score += 1;
            }
        }
        if score > best_score {
            best_score = score;
            best = intent;
        }
    }

    best.to_string()
}

/// District wins on more district words than building words; building wins
/// on any building word otherwise.
pub fn detect_scope(text: &str) -> Option<Scope> {
    let text_lower = text.to_lowercase();

    let district_words = ["district", "neighbourhood", "neighborhood", "area", "zone", "region"];
    let building_words = ["building", "house", "structure", "facility"];

    let district_score = district_words.iter().filter(|w| text_lower.contains(*w)).count();
    let building_score = building_words.iter().filter(|w| text_lower.contains(*w)).count();

    if district_score > building_score {
        Some(Scope::District)
    } else if building_score > 0 {
        Some(Scope::Building)
    } else {
        None
    }
}

/// Pull file names out of the text by extension, plus bare-word hints for
/// inputs mentioned without a file name.
pub fn extract_file_inputs(text: &str) -> BTreeMap<String, String> {
    let mut inputs = BTreeMap::new();

    let file_patterns = [
        (r"(?i)(\w+\.geojson)", "geometry"),
        (r"(?i)(\w+\.epw)", "weather"),
        (r"(?i)(\w+\.csv)", "data"),
        (r"(?i)(\w+\.xlsx?)", "schedule"),
        (r"(?i)(\w+\.json)", "config"),
    ];

    for (pattern, input_type) in file_patterns {
        let Ok(re) = Regex::new(pattern) else { continue };
        for caps in re.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                let key = if inputs.contains_key(input_type) {
                    format!("{}_{}", input_type, inputs.len())
                } else {
                    input_type.to_string()
                };
                inputs.insert(key, m.as_str().to_string());
            }
        }
    }

    let text_lower = text.to_lowercase();
    if text_lower.contains("schedule") {
        inputs
            .entry("schedules".to_string())
            .or_insert_with(|| "occupancy_schedules".to_string());
    }
    if text_lower.contains("weather") && !inputs.contains_key("weather") {
        inputs.insert("weather".to_string(), "weather_data".to_string());
    }
    if text_lower.contains("geometry") && !inputs.contains_key("geometry") {
        inputs.insert("geometry".to_string(), "building_geometry".to_string());
    }

    inputs
}

/// Extract timestep, temperature, and algorithm constraints.
pub fn extract_constraints(text: &str) -> BTreeMap<String, String> {
    let mut constraints = BTreeMap::new();
    let text_lower = text.to_lowercase();

    if let Ok(re) = Regex::new(r"(?i)(hourly|daily|monthly|annual|yearly)") {
        if let Some(caps) = re.captures(text) {
            constraints.insert("timestep".to_string(), caps[1].to_lowercase());
        }
    }

    if let Ok(re) = Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:°C|celsius|degrees)") {
        if let Some(caps) = re.captures(text) {
            constraints.insert("temperature".to_string(), format!("{}°C", &caps[1]));
        }
    }

    for algorithm in ["genetic", "steiner", "mst"] {
        if text_lower.contains(algorithm) {
            constraints.insert("algorithm".to_string(), algorithm.to_string());
            break;
        }
    }

    constraints
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::resolver::resolver_agent;
    use crate::catalog::{CapabilityProvider, MemoryCatalog};
    use std::io::Write;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[test]
    fn test_detect_intent_cooling() {
        assert_eq!(
            detect_intent("Estimate the cooling demand for my district"),
            "cooling demand"
        );
        assert_eq!(detect_intent("Optimize the pipe network"), "network");
        assert_eq!(detect_intent("hello there"), "general_analysis");
    }

    #[test]
    fn test_detect_scope() {
        assert_eq!(
            detect_scope("analyze the whole district"),
            Some(Scope::District)
        );
        assert_eq!(detect_scope("just this building"), Some(Scope::Building));
        // Tie between one district word and one building word goes to building.
        assert_eq!(
            detect_scope("the building in this area"),
            Some(Scope::Building)
        );
        assert_eq!(detect_scope("tell me something"), None);
    }

    #[test]
    fn test_extract_file_inputs() {
        let inputs =
            extract_file_inputs("use buildings.geojson and vienna.epw with hourly data");
        assert_eq!(inputs.get("geometry").unwrap(), "buildings.geojson");
        assert_eq!(inputs.get("weather").unwrap(), "vienna.epw");
    }

    #[test]
    fn test_extract_bare_word_hints() {
        let inputs = extract_file_inputs("use the weather and geometry I uploaded");
        assert_eq!(inputs.get("weather").unwrap(), "weather_data");
        assert_eq!(inputs.get("geometry").unwrap(), "building_geometry");
    }

    #[test]
    fn test_extract_constraints() {
        let constraints =
            extract_constraints("run hourly with the steiner algorithm at 21.5 °C");
        assert_eq!(constraints.get("timestep").unwrap(), "hourly");
        assert_eq!(constraints.get("algorithm").unwrap(), "steiner");
        assert_eq!(constraints.get("temperature").unwrap(), "21.5°C");
    }

    #[test]
    fn test_parse_task_end_to_end() {
        let task = parse_task("Estimate cooling demand for the district using buildings.geojson");
        assert_eq!(task.intent, "cooling demand");
        // "buildings.geojson" contains the word "building", tying the scope
        // counts; ties resolve to building scope.
        assert_eq!(task.scope, Some(Scope::Building));
        assert_eq!(task.inputs.get("geometry").unwrap(), "buildings.geojson");

        let task = parse_task("Estimate cooling demand for the district");
        assert_eq!(task.scope, Some(Scope::District));
    }

    #[test]
    fn test_faq_requires_question_shape() {
        let glossary = Glossary {
            faq: vec![FaqItem {
                question: "What is cooling demand?".to_string(),
                answer: "The energy needed to cool a space.".to_string(),
            }],
        };

        assert_eq!(
            lookup_faq(&glossary, "What is cooling demand?"),
            Some("The energy needed to cool a space.".to_string())
        );
        // Not question-shaped: parsed as a task instead.
        assert_eq!(lookup_faq(&glossary, "estimate cooling demand"), None);
        // Question-shaped but no domain-word overlap.
        assert_eq!(lookup_faq(&glossary, "what is the meaning of life"), None);
    }

    #[test]
    fn test_glossary_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glossary.json");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"{{"faq": [{{"question": "What file formats are supported?", "answer": "geojson, epw, csv, xlsx"}}]}}"#
        )
        .unwrap();

        let glossary = Glossary::load(&path).unwrap();
        assert_eq!(glossary.faq.len(), 1);
        assert!(lookup_faq(&glossary, "what file formats do you support").is_some());
    }

    #[tokio::test]
    async fn test_query_flows_through_resolver_and_back() {
        let router = Router::new();
        let catalog: Arc<dyn CapabilityProvider> = Arc::new(MemoryCatalog::seeded());
        let chat = chat_agent(&router, &ChatSettings::default()).spawn();
        let resolver = resolver_agent(&router, catalog).spawn();

        let (tx, mut rx) = mpsc::unbounded_channel();
        router.register("cli", tx);

        router.route(Message::create(
            Performative::Request,
            "cli",
            CHAT_AGENT,
            Some("conv-ask".to_string()),
            "query",
            content(json!({
                "question": "Estimate cooling demand for the district using buildings.geojson and vienna.epw"
            })),
        ));

        let reply = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.conversation_id, "conv-ask");
        assert_eq!(reply.sender, CHAT_AGENT);
        assert_eq!(reply.performative, Performative::Inform);
        assert_eq!(reply.content_type, "plan");
        assert_eq!(
            reply.content_str("workflow_id"),
            Some("workflow-cooling-demand-001")
        );

        chat.shutdown().await;
        resolver.shutdown().await;
    }

    #[tokio::test]
    async fn test_failure_plan_is_forwarded_verbatim() {
        let router = Router::new();
        let catalog: Arc<dyn CapabilityProvider> = Arc::new(MemoryCatalog::seeded());
        let chat = chat_agent(&router, &ChatSettings::default()).spawn();
        let resolver = resolver_agent(&router, catalog).spawn();

        let (tx, mut rx) = mpsc::unbounded_channel();
        router.register("cli", tx);

        // No files mentioned: required inputs will be missing.
        router.route(Message::create(
            Performative::Request,
            "cli",
            CHAT_AGENT,
            None,
            "query",
            content(json!({"question": "Estimate cooling demand for the district"})),
        ));

        let reply = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.performative, Performative::Failure);
        assert_eq!(reply.content_type, "plan");
        assert!(reply.content.get("missing").is_some());

        chat.shutdown().await;
        resolver.shutdown().await;
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let router = Router::new();
        let chat = chat_agent(&router, &ChatSettings::default()).spawn();

        let (tx, mut rx) = mpsc::unbounded_channel();
        router.register("cli", tx);

        router.route(Message::create(
            Performative::Request,
            "cli",
            CHAT_AGENT,
            None,
            "query",
            content(json!({})),
        ));

        let reply = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.performative, Performative::Failure);
        assert_eq!(reply.content_type, "error");

        chat.shutdown().await;
    }
}
